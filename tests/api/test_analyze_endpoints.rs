// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use image::{Rgba, RgbaImage};
use image_insight::api::{create_router, AnalyzeResponse, AppState, ErrorResponse};
use image_insight::pipeline::{AnalysisPipeline, PipelineSettings};
use image_insight::render::CaptionFont;
use image_insight::storage::{MemoryBlobStorage, StorageError};
use image_insight::vision::{
    encode_png, DetectedObject, Rectangle, Tag, VisionError, VisionService,
};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "----image-insight-test-boundary";
const BODY_LIMIT: usize = 16 * 1024 * 1024;

struct CannedVision;

#[async_trait]
impl VisionService for CannedVision {
    async fn detect_objects(&self, _image: Bytes) -> Result<Vec<DetectedObject>, VisionError> {
        Ok(vec![DetectedObject::new(Rectangle::new(2, 2, 20, 10), "cat")])
    }

    async fn extract_tags(&self, _image: Bytes) -> Result<Vec<Tag>, VisionError> {
        Ok(vec![Tag::new("cat"), Tag::new("indoor")])
    }
}

struct NullFont;

impl CaptionFont for NullFont {
    fn text_size(&self, _text: &str) -> (u32, u32) {
        (0, 0)
    }

    fn draw_text(&self, _image: &mut RgbaImage, _color: Rgba<u8>, _x: i32, _y: i32, _text: &str) {}
}

fn router(storage: &MemoryBlobStorage) -> Router {
    let pipeline = AnalysisPipeline::new(
        Arc::new(storage.clone()),
        Arc::new(CannedVision),
        Arc::new(NullFont),
        PipelineSettings::new("img"),
    );
    create_router(AppState::new(pipeline))
}

fn png(width: u32, height: u32) -> Vec<u8> {
    encode_png(&RgbaImage::from_pixel(width, height, Rgba([40, 40, 40, 255]))).unwrap()
}

fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            BOUNDARY, field, file_name, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), BODY_LIMIT).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_index_serves_upload_form() {
    let response = router(&MemoryBlobStorage::new())
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<title>Image Analysis</title>"));
    assert!(html.contains(r#"action="/analyze""#));
    assert!(html.contains(r#"name="file""#));
}

#[tokio::test]
async fn test_health() {
    let response = router(&MemoryBlobStorage::new())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["container"], "img");
}

#[tokio::test]
async fn test_json_analyze() {
    let storage = MemoryBlobStorage::new();
    let body = multipart_body("file", "cat.png", "image/png", &png(40, 30));

    let response = router(&storage)
        .oneshot(upload_request("/v1/analyze", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let result: AnalyzeResponse = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(result.blob_name, "cat.png");
    assert!(result.uploaded);
    assert_eq!(result.objects[0].caption, "cat");
    assert_eq!(result.tag_line, "cat, indoor");
    assert_eq!((result.width, result.height), (40, 30));
    assert_eq!(result.stages.first().map(String::as_str), Some("idle"));
    assert_eq!(result.stages.last().map(String::as_str), Some("displayed"));
    assert!(!result.annotated_image.is_empty());
    assert!(storage.blob("img", "cat.png").await.is_some());
}

#[tokio::test]
async fn test_page_analyze_renders_result() {
    let body = multipart_body("file", "cat.png", "image/png", &png(40, 30));

    let response = router(&MemoryBlobStorage::new())
        .oneshot(upload_request("/analyze", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("data:image/png;base64,"));
    assert!(html.contains("*** contents tag ***"));
    assert!(html.contains("<blockquote>"));
    assert!(html.contains("cat, indoor"));
}

#[tokio::test]
async fn test_unsupported_upload_is_validation_error() {
    let storage = MemoryBlobStorage::new();
    let body = multipart_body("file", "notes.txt", "text/plain", b"just some text");

    let response = router(&storage)
        .oneshot(upload_request("/v1/analyze", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(error.error_type, "validation_error");
    assert!(error.request_id.is_some());
    assert_eq!(storage.upload_count(), 0);
}

#[tokio::test]
async fn test_missing_file_field() {
    let body = multipart_body("attachment", "cat.png", "image/png", &png(4, 4));

    let response = router(&MemoryBlobStorage::new())
        .oneshot(upload_request("/v1/analyze", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(error.error_type, "validation_error");
    assert_eq!(error.message, "file is required");
}

#[tokio::test]
async fn test_storage_outage_is_bad_gateway() {
    let storage = MemoryBlobStorage::new();
    storage
        .inject_error(StorageError::NetworkError("connection refused".to_string()))
        .await;
    let body = multipart_body("file", "cat.png", "image/png", &png(4, 4));

    let response = router(&storage)
        .oneshot(upload_request("/analyze", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let html = body_text(response).await;
    assert!(html.contains(r#"class="error""#));
}

#[tokio::test]
async fn test_unknown_route() {
    let response = router(&MemoryBlobStorage::new())
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error: ErrorResponse = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(error.error_type, "not_found");
}
