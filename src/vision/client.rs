// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Azure Computer Vision client for object detection and tagging

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use super::types::{DetectedObject, Rectangle, Tag};
use crate::version::VISION_API_VERSION;

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Vision request failed: {0}")]
    Network(String),

    #[error("Vision service returned {status}: {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Unexpected vision response: {0}")]
    InvalidResponse(String),

    #[error("Invalid vision endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Object detection and tagging of a single image
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VisionService: Send + Sync {
    /// Objects in the order the service reports them
    async fn detect_objects(&self, image: Bytes) -> Result<Vec<DetectedObject>, VisionError>;

    async fn extract_tags(&self, image: Bytes) -> Result<Vec<Tag>, VisionError>;
}

// --- Computer Vision v3.2 response bodies ---

#[derive(Deserialize)]
struct DetectResponse {
    #[serde(default)]
    objects: Vec<DetectResponseObject>,
}

#[derive(Deserialize)]
struct DetectResponseObject {
    rectangle: Rectangle,
    object: String,
    #[serde(default)]
    confidence: f64,
}

#[derive(Deserialize)]
struct TagResponse {
    #[serde(default)]
    tags: Vec<TagResponseItem>,
}

#[derive(Deserialize)]
struct TagResponseItem {
    name: String,
    #[serde(default)]
    confidence: f64,
}

#[derive(Deserialize)]
struct ServiceErrorBody {
    error: ServiceErrorDetail,
}

#[derive(Deserialize)]
struct ServiceErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Client for the Computer Vision REST API
pub struct ComputerVisionClient {
    client: Client,
    endpoint: String,
    subscription_key: String,
}

impl std::fmt::Debug for ComputerVisionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputerVisionClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ComputerVisionClient {
    pub fn new(endpoint: &Url, subscription_key: &str, timeout: Duration) -> Result<Self, VisionError> {
        if subscription_key.trim().is_empty() {
            return Err(VisionError::InvalidEndpoint(
                "subscription key is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VisionError::Network(e.to_string()))?;

        let endpoint = endpoint.as_str().trim_end_matches('/').to_string();
        info!("Computer Vision client configured: endpoint={}", endpoint);

        Ok(Self {
            client,
            endpoint,
            subscription_key: subscription_key.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn operation_url(&self, operation: &str) -> String {
        format!("{}/vision/{}/{}", self.endpoint, VISION_API_VERSION, operation)
    }

    async fn analyze(&self, operation: &str, image: Bytes) -> Result<String, VisionError> {
        let start = std::time::Instant::now();
        let response = self
            .client
            .post(self.operation_url(operation))
            .header(SUBSCRIPTION_KEY_HEADER, &self.subscription_key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await
            .map_err(|e| VisionError::Network(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(service_error(status, &body));
        }

        debug!(
            "Computer Vision {} completed in {}ms",
            operation,
            start.elapsed().as_millis()
        );
        Ok(body)
    }
}

#[async_trait]
impl VisionService for ComputerVisionClient {
    async fn detect_objects(&self, image: Bytes) -> Result<Vec<DetectedObject>, VisionError> {
        let body = self.analyze("detect", image).await?;
        let parsed: DetectResponse = serde_json::from_str(&body)
            .map_err(|e| VisionError::InvalidResponse(e.to_string()))?;

        Ok(parsed
            .objects
            .into_iter()
            .map(|o| DetectedObject {
                rectangle: o.rectangle,
                caption: o.object,
                confidence: o.confidence,
            })
            .collect())
    }

    async fn extract_tags(&self, image: Bytes) -> Result<Vec<Tag>, VisionError> {
        let body = self.analyze("tag", image).await?;
        let parsed: TagResponse = serde_json::from_str(&body)
            .map_err(|e| VisionError::InvalidResponse(e.to_string()))?;

        Ok(parsed
            .tags
            .into_iter()
            .map(|t| Tag {
                name: t.name,
                confidence: t.confidence,
            })
            .collect())
    }
}

fn service_error(status: StatusCode, body: &str) -> VisionError {
    match serde_json::from_str::<ServiceErrorBody>(body) {
        Ok(parsed) => VisionError::Service {
            status: status.as_u16(),
            code: parsed.error.code,
            message: parsed.error.message,
        },
        Err(_) => VisionError::Service {
            status: status.as_u16(),
            code: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: body.trim().to_string(),
        },
    }
}
