// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod render;
pub mod storage;
pub mod version;
pub mod vision;

// Re-export main types for convenience
pub use config::{AppConfig, SecretBundle, WriteMode};
pub use pipeline::{AnalysisPipeline, AnalysisReport, ImageAsset, PipelineError, PipelineStage};
pub use render::{annotate, CaptionFont, TrueTypeCaptionFont};
pub use storage::{AzureBlobStorage, BlobStorage, MemoryBlobStorage, SasToken, StorageError};
pub use vision::{ComputerVisionClient, DetectedObject, Rectangle, Tag, VisionError, VisionService};
