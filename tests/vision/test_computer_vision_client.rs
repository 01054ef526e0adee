// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use image_insight::vision::{ComputerVisionClient, Rectangle, VisionError, VisionService};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

const KEY: &str = "test-subscription-key";

/// Bodies received by the fake endpoint
type Received = Arc<Mutex<Vec<Vec<u8>>>>;

fn check_headers(headers: &HeaderMap) -> Option<Response> {
    let key = headers
        .get("ocp-apim-subscription-key")
        .and_then(|v| v.to_str().ok());
    if key != Some(KEY) {
        return Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": {"code": "401", "message": "Access denied due to invalid subscription key."}})),
            )
                .into_response(),
        );
    }
    let content_type = headers.get("content-type").and_then(|v| v.to_str().ok());
    if content_type != Some("application/octet-stream") {
        return Some(
            (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                Json(json!({"error": {"code": "InvalidImageFormat", "message": "Unsupported media type"}})),
            )
                .into_response(),
        );
    }
    None
}

async fn detect(State(received): State<Received>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(rejection) = check_headers(&headers) {
        return rejection;
    }
    received.lock().unwrap().push(body.to_vec());
    Json(json!({
        "objects": [
            {
                "rectangle": {"x": 10, "y": 10, "w": 50, "h": 20},
                "object": "dog",
                "confidence": 0.91,
                "parent": {"object": "mammal", "confidence": 0.95}
            },
            {
                "rectangle": {"x": 60, "y": 5, "w": 30, "h": 40},
                "object": "ball",
                "confidence": 0.62
            }
        ],
        "requestId": "7d1f",
        "modelVersion": "2021-04-01",
        "metadata": {"height": 100, "width": 100, "format": "Png"}
    }))
    .into_response()
}

async fn tag(State(received): State<Received>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(rejection) = check_headers(&headers) {
        return rejection;
    }
    received.lock().unwrap().push(body.to_vec());
    Json(json!({
        "tags": [
            {"name": "dog", "confidence": 0.99},
            {"name": "grass", "confidence": 0.87},
            {"name": "outdoor", "confidence": 0.80}
        ],
        "requestId": "9a2c",
        "metadata": {"height": 100, "width": 100, "format": "Png"}
    }))
    .into_response()
}

async fn too_small() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": {"code": "InvalidImageSize", "message": "Image must be at least 50 pixels in width and height"}})),
    )
        .into_response()
}

async fn start(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/", addr)
}

async fn start_vision() -> (String, Received) {
    let received: Received = Arc::default();
    let router = Router::new()
        .route("/vision/v3.2/detect", post(detect))
        .route("/vision/v3.2/tag", post(tag))
        .with_state(received.clone());
    (start(router).await, received)
}

fn client(endpoint: &str, key: &str) -> ComputerVisionClient {
    ComputerVisionClient::new(&Url::parse(endpoint).unwrap(), key, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_detect_objects_in_service_order() {
    let (endpoint, received) = start_vision().await;
    let client = client(&endpoint, KEY);

    let objects = client
        .detect_objects(Bytes::from_static(b"image bytes"))
        .await
        .unwrap();

    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].caption, "dog");
    assert_eq!(objects[0].rectangle, Rectangle::new(10, 10, 50, 20));
    assert_eq!(objects[1].caption, "ball");
    assert!((objects[1].confidence - 0.62).abs() < f64::EPSILON);
    assert_eq!(received.lock().unwrap()[0], b"image bytes");
}

#[tokio::test]
async fn test_extract_tags() {
    let (endpoint, _received) = start_vision().await;
    let client = client(&endpoint, KEY);

    let tags = client
        .extract_tags(Bytes::from_static(b"image bytes"))
        .await
        .unwrap();

    let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["dog", "grass", "outdoor"]);
    assert_eq!(image_insight::vision::tag_line(&tags), "dog, grass, outdoor");
}

#[tokio::test]
async fn test_wrong_key_is_service_error() {
    let (endpoint, received) = start_vision().await;
    let client = client(&endpoint, "wrong-key");

    let result = client.detect_objects(Bytes::from_static(b"x")).await;

    match result {
        Err(VisionError::Service { status, code, .. }) => {
            assert_eq!(status, 401);
            assert_eq!(code, "401");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_service_error_body_is_parsed() {
    let router = Router::new().route("/vision/v3.2/tag", post(too_small));
    let endpoint = start(router).await;
    let client = client(&endpoint, KEY);

    match client.extract_tags(Bytes::from_static(b"x")).await {
        Err(VisionError::Service {
            status,
            code,
            message,
        }) => {
            assert_eq!(status, 400);
            assert_eq!(code, "InvalidImageSize");
            assert!(message.contains("50 pixels"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_non_json_success_is_invalid_response() {
    let router = Router::new().route("/vision/v3.2/detect", post(|| async { "not json" }));
    let endpoint = start(router).await;
    let client = client(&endpoint, KEY);

    let result = client.detect_objects(Bytes::from_static(b"x")).await;
    assert!(matches!(result, Err(VisionError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    let client = client("http://127.0.0.1:9/", KEY);

    let result = client.extract_tags(Bytes::from_static(b"x")).await;
    assert!(matches!(result, Err(VisionError::Network(_))));
}
