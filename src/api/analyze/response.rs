// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analyze response types

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::pipeline::{AnalysisReport, PipelineStage};
use crate::vision::{DetectedObject, Tag};

/// JSON result of one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    /// Key the image is stored under
    pub blob_name: String,
    /// False when a blob with the same name already existed
    pub uploaded: bool,
    pub objects: Vec<DetectedObject>,
    pub tags: Vec<Tag>,
    /// Tag names joined with ", "
    pub tag_line: String,
    /// Annotated image, base64 PNG
    pub annotated_image: String,
    pub width: u32,
    pub height: u32,
    /// Stages the run passed through, in order
    pub stages: Vec<String>,
    pub processing_time_ms: u64,
}

impl From<AnalysisReport> for AnalyzeResponse {
    fn from(report: AnalysisReport) -> Self {
        Self {
            blob_name: report.blob_name,
            uploaded: report.uploaded,
            annotated_image: STANDARD.encode(&report.annotated_png),
            objects: report.objects,
            tags: report.tags,
            tag_line: report.tag_line,
            width: report.width,
            height: report.height,
            stages: report
                .stages
                .iter()
                .map(PipelineStage::to_string)
                .collect(),
            processing_time_ms: report.processing_time_ms,
        }
    }
}
