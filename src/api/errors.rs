// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::pipeline::{PipelineError, PipelineStage};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    pub request_id: Option<String>,
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest(String),
    ValidationError {
        field: String,
        message: String,
    },
    /// Storage or vision service failed part-way through a run
    UpstreamFailure {
        stage: PipelineStage,
        message: String,
    },
    /// Local failure part-way through a run (disk, decoding a stored blob)
    StageFailed {
        stage: PipelineStage,
        message: String,
    },
}

impl ApiError {
    pub fn to_response(&self, request_id: Option<String>) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::NotFound(msg) => ("not_found", msg.clone(), None),
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            ApiError::ValidationError { field, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                ("validation_error", message.clone(), Some(details))
            }
            ApiError::UpstreamFailure { stage, message } => {
                ("upstream_error", message.clone(), Some(stage_details(*stage)))
            }
            ApiError::StageFailed { stage, message } => {
                ("pipeline_error", message.clone(), Some(stage_details(*stage)))
            }
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
            request_id,
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::InvalidRequest(_) | ApiError::ValidationError { .. } => 400,
            ApiError::UpstreamFailure { .. } => 502,
            ApiError::StageFailed { .. } => 500,
        }
    }
}

fn stage_details(stage: PipelineStage) -> HashMap<String, serde_json::Value> {
    let mut details = HashMap::new();
    details.insert(
        "stage".to_string(),
        serde_json::Value::String(stage.to_string()),
    );
    details
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        // Display adds the stage; keep it out of the message
        let message = err.source.to_string();
        if err.is_invalid_upload() {
            ApiError::ValidationError {
                field: "file".to_string(),
                message,
            }
        } else if err.is_remote() {
            ApiError::UpstreamFailure {
                stage: err.stage,
                message,
            }
        } else {
            ApiError::StageFailed {
                stage: err.stage,
                message,
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::UpstreamFailure { stage, message } => {
                write!(f, "Upstream service failed while {}: {}", stage, message)
            }
            ApiError::StageFailed { stage, message } => {
                write!(f, "Analysis failed while {}: {}", stage, message)
            }
        }
    }
}

impl std::error::Error for ApiError {}
