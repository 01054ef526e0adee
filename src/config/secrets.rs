// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Secret bundle loading
//!
//! The secret bundle is a flat JSON document holding the storage account and
//! Computer Vision credentials. It is read once at startup and handed to the
//! gateway constructors; nothing keeps it in a global.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

use super::ConfigError;

/// Credentials for Azure Blob Storage and Azure Computer Vision
#[derive(Clone, Deserialize)]
pub struct SecretBundle {
    #[serde(rename = "STORAGE_ACCOUNT_NAME")]
    pub storage_account_name: String,
    #[serde(rename = "STORAGE_ACCOUNT_URL")]
    pub storage_account_url: String,
    #[serde(rename = "ACCOUNT_KEY")]
    pub account_key: String,
    #[serde(rename = "CONNECTION_STRING")]
    pub connection_string: String,
    #[serde(rename = "SUBSCRIPTION_KEY")]
    pub subscription_key: String,
    #[serde(rename = "ENDPOINT")]
    pub endpoint: String,
}

impl fmt::Debug for SecretBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretBundle")
            .field("storage_account_name", &self.storage_account_name)
            .field("storage_account_url", &self.storage_account_url)
            .field("account_key", &"<redacted>")
            .field("connection_string", &"<redacted>")
            .field("subscription_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl SecretBundle {
    /// Read and validate the bundle at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let bundle = Self::parse(&text, path)?;
        debug!(
            "Loaded secret bundle from {} for account {}",
            path.display(),
            bundle.storage_account_name
        );
        Ok(bundle)
    }

    /// Parse and validate a bundle from a JSON string
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, Path::new("<inline>"))
    }

    fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let bundle: SecretBundle =
            serde_json::from_str(text).map_err(|source| ConfigError::Malformed {
                path: PathBuf::from(path),
                source,
            })?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Check that every value is present and well-formed
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("STORAGE_ACCOUNT_NAME", &self.storage_account_name),
            ("STORAGE_ACCOUNT_URL", &self.storage_account_url),
            ("ACCOUNT_KEY", &self.account_key),
            ("CONNECTION_STRING", &self.connection_string),
            ("SUBSCRIPTION_KEY", &self.subscription_key),
            ("ENDPOINT", &self.endpoint),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingValue(key));
            }
        }

        self.storage_account_url()?;
        self.vision_endpoint()?;
        self.account_key_bytes()?;

        if let Some(name) = self.connection_string_value("AccountName") {
            if name != self.storage_account_name {
                warn!(
                    "CONNECTION_STRING AccountName '{}' differs from STORAGE_ACCOUNT_NAME '{}'",
                    name, self.storage_account_name
                );
            }
        }

        Ok(())
    }

    /// Blob service endpoint, e.g. `https://account.blob.core.windows.net/`
    pub fn storage_account_url(&self) -> Result<Url, ConfigError> {
        parse_http_url("STORAGE_ACCOUNT_URL", &self.storage_account_url)
    }

    /// Computer Vision endpoint, e.g. `https://name.cognitiveservices.azure.com/`
    pub fn vision_endpoint(&self) -> Result<Url, ConfigError> {
        parse_http_url("ENDPOINT", &self.endpoint)
    }

    /// Decoded storage account key used to sign SAS tokens
    pub fn account_key_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        STANDARD
            .decode(self.account_key.trim())
            .map_err(ConfigError::InvalidAccountKey)
    }

    /// Look up one `Key=Value` pair of the storage connection string
    pub fn connection_string_value(&self, key: &str) -> Option<&str> {
        self.connection_string
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
            .map(|(_, v)| v.trim())
    }
}

fn parse_http_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim()).map_err(|source| ConfigError::InvalidUrl { key, source })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::UnsupportedScheme {
            key,
            scheme: other.to_string(),
        }),
    }
}
