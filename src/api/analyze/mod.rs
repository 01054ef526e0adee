// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analyze endpoints
//!
//! Provides GET / (upload form), POST /analyze (HTML) and POST /v1/analyze (JSON).

pub mod handler;
pub mod response;

pub use handler::{
    analyze_json_handler, analyze_page_handler, index_handler, read_upload, UPLOAD_FIELD,
};
pub use response::AnalyzeResponse;
