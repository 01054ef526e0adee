// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the image-insight service

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Azure Blob REST API version sent as `x-ms-version` and signed into SAS tokens
pub const STORAGE_API_VERSION: &str = "2021-08-06";

/// Azure Computer Vision REST API version used for detect and tag calls
pub const VISION_API_VERSION: &str = "v3.2";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "account-sas",
    "conditional-upload",
    "object-detection",
    "image-tagging",
    "annotated-preview",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!(
        "image-insight {} (storage {}, vision {})",
        VERSION_NUMBER, STORAGE_API_VERSION, VISION_API_VERSION
    )
}

/// Get full version info for API responses
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "storageApiVersion": STORAGE_API_VERSION,
        "visionApiVersion": VISION_API_VERSION,
        "features": FEATURES,
    })
}
