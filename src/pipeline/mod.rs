// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod analysis;
pub mod stage;

pub use analysis::{
    download_file_name, AnalysisPipeline, AnalysisReport, ImageAsset, PipelineError,
    PipelineSettings, StageFailure, DOWNLOAD_FILE_STEM,
};
pub use stage::{PipelineStage, StageTracker};
