// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Startup configuration: the secret bundle plus service settings

pub mod secrets;
pub mod settings;

use std::path::PathBuf;
use thiserror::Error;

pub use secrets::SecretBundle;
pub use settings::{AppConfig, ServerArgs, ServiceArgs, WriteMode};

/// Fatal configuration problems; the process cannot start with any of these
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed secret bundle {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Secret bundle value {0} is empty")]
    MissingValue(&'static str),

    #[error("Invalid URL in {key}: {source}")]
    InvalidUrl {
        key: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported URL scheme '{scheme}' in {key}")]
    UnsupportedScheme { key: &'static str, scheme: String },

    #[error("ACCOUNT_KEY is not valid base64: {0}")]
    InvalidAccountKey(#[source] base64::DecodeError),

    #[error("Invalid container name '{name}': {reason}")]
    InvalidContainerName { name: String, reason: String },

    #[error("Invalid listen address '{0}'")]
    InvalidListenAddr(String),
}
