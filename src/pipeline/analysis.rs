// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! One analysis run: store the upload, fetch the canonical copy back,
//! detect, annotate and tag it.

use bytes::Bytes;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::stage::{PipelineStage, StageTracker};
use crate::config::{AppConfig, WriteMode};
use crate::render::{annotate, CaptionFont, TrueTypeCaptionFont};
use crate::storage::{
    AzureBlobConfig, AzureBlobStorage, BlobStorage, SasToken, StorageError, WriteOutcome,
};
use crate::vision::{
    decode_image_bytes, encode_png, format_to_extension, tag_line, validate_upload,
    ComputerVisionClient, DetectedObject, ImageError, Tag, VisionError, VisionService,
};

/// Name of the local copy fetched back from storage, before the extension
pub const DOWNLOAD_FILE_STEM: &str = "download_image";

/// Name of the temp copy written before upload, before the extension
const UPLOAD_FILE_STEM: &str = "upload_image";

#[derive(Debug, Error)]
pub enum StageFailure {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Vision(#[from] VisionError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A run aborted at `stage`. Nothing is rolled back.
#[derive(Debug, Error)]
#[error("Pipeline failed while {stage}: {source}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    #[source]
    pub source: StageFailure,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, source: impl Into<StageFailure>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }

    /// The upload itself was unacceptable
    pub fn is_invalid_upload(&self) -> bool {
        self.stage == PipelineStage::AwaitingUpload && matches!(self.source, StageFailure::Image(_))
    }

    /// A storage or vision service call failed
    pub fn is_remote(&self) -> bool {
        matches!(
            self.source,
            StageFailure::Storage(StorageError::NetworkError(_))
                | StageFailure::Storage(StorageError::NotFound(_))
                | StageFailure::Storage(StorageError::AuthError(_))
                | StageFailure::Storage(StorageError::ServerError(_))
                | StageFailure::Storage(StorageError::SerializationError(_))
                | StageFailure::Vision(_)
        )
    }
}

/// An uploaded image: the bytes and the file name used as its blob key
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub file_name: String,
    pub bytes: Bytes,
}

impl ImageAsset {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a local file, keeping only its file name for the blob key
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self::new(file_name, bytes))
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub blob_name: String,
    /// False when the blob already existed and the upload was skipped
    pub uploaded: bool,
    pub objects: Vec<DetectedObject>,
    pub tags: Vec<Tag>,
    pub tag_line: String,
    pub annotated_png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub stages: Vec<PipelineStage>,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub container: String,
    pub write_mode: WriteMode,
    /// Parent for per-run temporary directories; the system temp dir if unset
    pub work_dir: Option<PathBuf>,
}

impl PipelineSettings {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            write_mode: WriteMode::default(),
            work_dir: None,
        }
    }
}

impl From<&AppConfig> for PipelineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            container: config.container.clone(),
            write_mode: config.write_mode,
            work_dir: config.work_dir.clone(),
        }
    }
}

/// Runs uploads through storage, detection, annotation and tagging.
///
/// Holds no per-run state: every call to [`AnalysisPipeline::run`] issues its
/// own access token and works in its own temporary directory.
#[derive(Clone)]
pub struct AnalysisPipeline {
    storage: Arc<dyn BlobStorage>,
    vision: Arc<dyn VisionService>,
    font: Arc<dyn CaptionFont>,
    settings: PipelineSettings,
}

impl AnalysisPipeline {
    pub fn new(
        storage: Arc<dyn BlobStorage>,
        vision: Arc<dyn VisionService>,
        font: Arc<dyn CaptionFont>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            storage,
            vision,
            font,
            settings,
        }
    }

    /// Wire the Azure gateways and the caption font from configuration
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let storage = AzureBlobStorage::new(AzureBlobConfig::from_secrets(
            &config.secrets,
            config.request_timeout,
        )?)?;
        let vision = ComputerVisionClient::new(
            &config.secrets.vision_endpoint()?,
            &config.secrets.subscription_key,
            config.request_timeout,
        )?;
        let font = TrueTypeCaptionFont::load(&config.font_path)?;

        Ok(Self::new(
            Arc::new(storage),
            Arc::new(vision),
            Arc::new(font),
            PipelineSettings::from(config),
        ))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub async fn run(&self, asset: ImageAsset) -> Result<AnalysisReport, PipelineError> {
        let start = Instant::now();
        let mut tracker = StageTracker::new();

        // Idle: fresh token, container in place
        let token = self
            .storage
            .issue_access_token()
            .await
            .map_err(|e| PipelineError::new(PipelineStage::Idle, e))?;
        self.ensure_container(&token)
            .await
            .map_err(|e| PipelineError::new(PipelineStage::Idle, e))?;

        tracker.enter(PipelineStage::AwaitingUpload);
        let format = validate_upload(&asset.file_name, &asset.bytes)
            .and_then(|format| decode_image_bytes(&asset.bytes).map(|_| format))
            .map_err(|e| PipelineError::new(PipelineStage::AwaitingUpload, e))?;
        let run_dir = self
            .run_dir()
            .map_err(|e| PipelineError::new(PipelineStage::AwaitingUpload, e))?;
        // The client's name is only the blob key, never a local path
        let upload_path = run_dir
            .path()
            .join(format!("{}.{}", UPLOAD_FILE_STEM, format_to_extension(format)));
        tokio::fs::write(&upload_path, &asset.bytes)
            .await
            .map_err(|e| PipelineError::new(PipelineStage::AwaitingUpload, e))?;
        info!(
            "Received {} ({} bytes) for analysis",
            asset.file_name,
            asset.bytes.len()
        );

        let uploaded = self
            .ensure_blob(&token, &asset.file_name, &upload_path)
            .await
            .map_err(|e| PipelineError::new(PipelineStage::Uploading, e))?;
        if uploaded {
            tracker.enter(PipelineStage::Uploading);
        }
        tokio::fs::remove_file(&upload_path)
            .await
            .map_err(|e| PipelineError::new(PipelineStage::Uploading, e))?;

        tracker.enter(PipelineStage::Downloading);
        let download_path = run_dir.path().join(download_file_name(format));
        let image = self
            .download(&token, &asset.file_name, &download_path)
            .await
            .map_err(|e| PipelineError::new(PipelineStage::Downloading, e))?;

        tracker.enter(PipelineStage::Detecting);
        let objects = self
            .vision
            .detect_objects(image.clone())
            .await
            .map_err(|e| PipelineError::new(PipelineStage::Detecting, e))?;
        debug!("Detected {} objects in {}", objects.len(), asset.file_name);

        tracker.enter(PipelineStage::Annotating);
        let (annotated_png, width, height) = self
            .render(&image, &objects)
            .map_err(|e| PipelineError::new(PipelineStage::Annotating, e))?;

        tracker.enter(PipelineStage::Tagging);
        let tags = self
            .vision
            .extract_tags(image)
            .await
            .map_err(|e| PipelineError::new(PipelineStage::Tagging, e))?;

        tracker.enter(PipelineStage::Displayed);
        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Analyzed {}: {} objects, {} tags, uploaded={}, {}ms",
            asset.file_name,
            objects.len(),
            tags.len(),
            uploaded,
            processing_time_ms
        );

        Ok(AnalysisReport {
            blob_name: asset.file_name,
            uploaded,
            tag_line: tag_line(&tags),
            objects,
            tags,
            annotated_png,
            width,
            height,
            stages: tracker.into_visited(),
            processing_time_ms,
        })
    }

    /// Make sure the container exists. A failed create is logged and the run
    /// carries on; the next storage call reports the real problem.
    async fn ensure_container(&self, token: &SasToken) -> Result<(), StageFailure> {
        let container = self.settings.container.as_str();

        if self.settings.write_mode == WriteMode::CheckThenWrite
            && self.storage.container_exists(token, container).await?
        {
            return Ok(());
        }

        match self.storage.create_container(token, container).await {
            Ok(WriteOutcome::Created) => info!("Created container {}", container),
            Ok(WriteOutcome::AlreadyExists) => debug!("Container {} already exists", container),
            Err(e) => warn!("Could not create container {}: {}", container, e),
        }
        Ok(())
    }

    /// Upload the temp copy unless a blob with that name exists. Returns
    /// whether this run wrote it.
    async fn ensure_blob(
        &self,
        token: &SasToken,
        blob_name: &str,
        upload_path: &Path,
    ) -> Result<bool, StageFailure> {
        let container = self.settings.container.as_str();

        match self.settings.write_mode {
            WriteMode::Conditional => {
                let data = Bytes::from(tokio::fs::read(upload_path).await?);
                let outcome = self
                    .storage
                    .upload_blob_if_absent(token, container, blob_name, data)
                    .await?;
                Ok(outcome.created())
            }
            WriteMode::CheckThenWrite => {
                // Another run may write between the check and the upload
                if self.storage.blob_exists(token, container, blob_name).await? {
                    return Ok(false);
                }
                let data = Bytes::from(tokio::fs::read(upload_path).await?);
                self.storage
                    .upload_blob(token, container, blob_name, data)
                    .await?;
                Ok(true)
            }
        }
    }

    async fn download(
        &self,
        token: &SasToken,
        blob_name: &str,
        destination: &Path,
    ) -> Result<Bytes, StageFailure> {
        let written = self
            .storage
            .download_blob(token, &self.settings.container, blob_name, destination)
            .await?;
        debug!("Fetched canonical copy of {} ({} bytes)", blob_name, written);
        Ok(Bytes::from(tokio::fs::read(destination).await?))
    }

    fn render(
        &self,
        image: &[u8],
        objects: &[DetectedObject],
    ) -> Result<(Vec<u8>, u32, u32), ImageError> {
        let (decoded, info) = decode_image_bytes(image)?;
        debug!(
            "Annotating {:?} image {}x{}",
            info.format, info.width, info.height
        );
        let mut canvas = decoded.to_rgba8();
        annotate(&mut canvas, objects, self.font.as_ref());
        Ok((encode_png(&canvas)?, info.width, info.height))
    }

    fn run_dir(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("image-insight-");
        match &self.settings.work_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                builder.tempdir_in(dir)
            }
            None => builder.tempdir(),
        }
    }
}

pub fn download_file_name(format: ImageFormat) -> String {
    format!("{}.{}", DOWNLOAD_FILE_STEM, format_to_extension(format))
}
