// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod analyze;
pub mod errors;
pub mod http_server;
pub mod page;

pub use analyze::{analyze_json_handler, analyze_page_handler, AnalyzeResponse};
pub use errors::{ApiError, ErrorResponse};
pub use http_server::{create_router, start_server, ApiErrorResponse, AppState, HealthResponse};
