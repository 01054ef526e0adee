// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision gateway: object detection and tagging through Azure Computer Vision,
//! plus the image helpers shared by the pipeline and the HTTP layer.

pub mod client;
pub mod image_utils;
pub mod types;

pub use client::{ComputerVisionClient, VisionError, VisionService};
pub use image_utils::{
    decode_image_bytes, detect_format, encode_png, format_to_extension, png_data_url,
    validate_upload, ImageError, ImageInfo, MAX_IMAGE_SIZE,
};
pub use types::{tag_line, DetectedObject, Rectangle, Tag};

#[cfg(test)]
pub use client::MockVisionService;
