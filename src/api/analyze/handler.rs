// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analyze endpoint handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use axum_extra::extract::Multipart;
use tracing::{info, warn};

use super::response::AnalyzeResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::{ApiErrorResponse, AppState};
use crate::api::page;
use crate::pipeline::{AnalysisReport, ImageAsset};

/// Multipart field carrying the image
pub const UPLOAD_FIELD: &str = "file";

/// Pull the `file` field out of a multipart body
pub async fn read_upload(mut multipart: Multipart) -> Result<ImageAsset, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(|n| n.to_string())
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ApiError::ValidationError {
                field: UPLOAD_FIELD.to_string(),
                message: "upload has no file name".to_string(),
            })?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        return Ok(ImageAsset::new(file_name, bytes));
    }

    Err(ApiError::ValidationError {
        field: UPLOAD_FIELD.to_string(),
        message: "file is required".to_string(),
    })
}

async fn analyze(state: &AppState, multipart: Multipart) -> Result<AnalysisReport, ApiError> {
    let asset = read_upload(multipart).await?;
    info!("Analyze request for {}", asset.file_name);
    state.pipeline.run(asset).await.map_err(|e| {
        warn!("{}", e);
        ApiError::from(e)
    })
}

/// GET / - Upload form
pub async fn index_handler() -> Html<String> {
    Html(page::index_page())
}

/// POST /analyze - Run the pipeline on a browser upload and render the page
pub async fn analyze_page_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    match analyze(&state, multipart).await {
        Ok(report) => Html(page::result_page(&report)).into_response(),
        Err(e) => {
            let status = StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Html(page::error_page(&e.to_string()))).into_response()
        }
    }
}

/// POST /v1/analyze - Same pipeline, JSON response
pub async fn analyze_json_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ApiErrorResponse> {
    let report = analyze(&state, multipart).await.map_err(ApiErrorResponse)?;
    Ok(Json(AnalyzeResponse::from(report)))
}
