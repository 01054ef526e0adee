// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use thiserror::Error;

use super::sas::SasToken;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Authentication error: {0}")]
    AuthError(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Server error: {0}")]
    ServerError(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a create-if-absent request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    AlreadyExists,
}

impl WriteOutcome {
    pub fn created(self) -> bool {
        self == WriteOutcome::Created
    }
}

/// Container and blob operations against a storage account.
///
/// Every call carries the token issued for the current pipeline run;
/// implementations never hold on to a token between calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Sign a fresh account SAS (read, write, list, create; five minutes)
    async fn issue_access_token(&self) -> Result<SasToken, StorageError>;

    /// Names of every container in the account
    async fn list_containers(&self, token: &SasToken) -> Result<Vec<String>, StorageError>;

    /// Names of every blob in `container`
    async fn list_blobs(&self, token: &SasToken, container: &str)
        -> Result<Vec<String>, StorageError>;

    /// Linear scan of the container listing for an exact name match
    async fn container_exists(&self, token: &SasToken, name: &str) -> Result<bool, StorageError> {
        let containers = self.list_containers(token).await?;
        Ok(containers.iter().any(|c| c == name))
    }

    /// Linear scan of the blob listing for an exact name match
    async fn blob_exists(
        &self,
        token: &SasToken,
        container: &str,
        name: &str,
    ) -> Result<bool, StorageError> {
        let blobs = self.list_blobs(token, container).await?;
        Ok(blobs.iter().any(|b| b == name))
    }

    /// Create `name`, reporting `AlreadyExists` instead of failing when it is there
    async fn create_container(
        &self,
        token: &SasToken,
        name: &str,
    ) -> Result<WriteOutcome, StorageError>;

    /// Unconditional write; overwrites any existing blob with the same name
    async fn upload_blob(
        &self,
        token: &SasToken,
        container: &str,
        name: &str,
        data: Bytes,
    ) -> Result<(), StorageError>;

    /// Write only if no blob with that name exists
    async fn upload_blob_if_absent(
        &self,
        token: &SasToken,
        container: &str,
        name: &str,
        data: Bytes,
    ) -> Result<WriteOutcome, StorageError>;

    /// Stream the blob into `destination`, creating or truncating it.
    /// Returns the number of bytes written.
    async fn download_blob(
        &self,
        token: &SasToken,
        container: &str,
        name: &str,
        destination: &Path,
    ) -> Result<u64, StorageError>;
}

/// Blob names are used verbatim as keys; reject the ones Azure refuses
pub fn validate_blob_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() {
        return Err(StorageError::InvalidName("blob name is empty".to_string()));
    }
    if name.len() > 1024 {
        return Err(StorageError::InvalidName(format!(
            "blob name exceeds 1024 characters: {}",
            name.len()
        )));
    }
    if name.ends_with('.') || name.ends_with('/') {
        return Err(StorageError::InvalidName(format!(
            "blob name cannot end with '.' or '/': {}",
            name
        )));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(StorageError::InvalidName(
            "blob name contains control characters".to_string(),
        ));
    }
    Ok(())
}
