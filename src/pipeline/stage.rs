// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Steps of one analysis run, in the only order they can happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Token issued and container ensured; nothing uploaded yet
    Idle,
    /// Upload received and validated
    AwaitingUpload,
    /// Blob written; skipped when it already existed
    Uploading,
    Downloading,
    Detecting,
    Annotating,
    Tagging,
    Displayed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::AwaitingUpload => "awaiting_upload",
            PipelineStage::Uploading => "uploading",
            PipelineStage::Downloading => "downloading",
            PipelineStage::Detecting => "detecting",
            PipelineStage::Annotating => "annotating",
            PipelineStage::Tagging => "tagging",
            PipelineStage::Displayed => "displayed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Forward-only record of the stages a run has entered
#[derive(Debug, Clone)]
pub struct StageTracker {
    current: PipelineStage,
    visited: Vec<PipelineStage>,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            current: PipelineStage::Idle,
            visited: vec![PipelineStage::Idle],
        }
    }

    pub fn current(&self) -> PipelineStage {
        self.current
    }

    pub fn visited(&self) -> &[PipelineStage] {
        &self.visited
    }

    /// Move to `next`. Returns false and stays put if `next` is not
    /// strictly after the current stage.
    pub fn enter(&mut self, next: PipelineStage) -> bool {
        if next <= self.current {
            return false;
        }
        debug!("Pipeline stage {} -> {}", self.current, next);
        self.current = next;
        self.visited.push(next);
        true
    }

    pub fn into_visited(self) -> Vec<PipelineStage> {
        self.visited
    }
}
