// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    http::{StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::analyze::{analyze_json_handler, analyze_page_handler, index_handler};
use super::ApiError;
use crate::pipeline::AnalysisPipeline;
use crate::version;
use crate::vision::MAX_IMAGE_SIZE;

/// Room for multipart boundaries and headers on top of the image itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
}

impl AppState {
    pub fn new(pipeline: AnalysisPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub container: String,
    pub build: serde_json::Value,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Upload form and browser flow
        .route("/", get(index_handler))
        .route("/analyze", post(analyze_page_handler))
        // JSON flow
        .route("/v1/analyze", post(analyze_json_handler))
        // Health check
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE + MULTIPART_OVERHEAD))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn start_server(addr: SocketAddr, pipeline: AnalysisPipeline) -> anyhow::Result<()> {
    let app = create_router(AppState::new(pipeline));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Image analysis server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: version::VERSION_NUMBER.to_string(),
        container: state.pipeline.settings().container.clone(),
        build: version::get_version_info(),
    })
}

async fn not_found_handler(uri: Uri) -> ApiErrorResponse {
    ApiErrorResponse(ApiError::NotFound(uri.path().to_string()))
}

// Error response wrapper
pub struct ApiErrorResponse(pub ApiError);

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let request_id = uuid::Uuid::new_v4().to_string();
        let error_response = self.0.to_response(Some(request_id));

        (status, Json(error_response)).into_response()
    }
}
