// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-process storage backend for local runs and tests

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::blob_storage::{validate_blob_name, BlobStorage, StorageError, WriteOutcome};
use super::sas::{AccountSasSigner, SasToken};

// base64("memory-backend-key")
const MEMORY_ACCOUNT_KEY: &str = "bWVtb3J5LWJhY2tlbmQta2V5";

/// Containers and blobs kept in a shared map. Clones share the same data,
/// like handles onto one account.
#[derive(Debug, Clone)]
pub struct MemoryBlobStorage {
    containers: Arc<Mutex<HashMap<String, BTreeMap<String, Bytes>>>>,
    injected_error: Arc<Mutex<Option<StorageError>>>,
    signer: AccountSasSigner,
    uploads: Arc<AtomicUsize>,
    tokens_issued: Arc<AtomicUsize>,
}

impl Default for MemoryBlobStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBlobStorage {
    pub fn new() -> Self {
        let signer = match AccountSasSigner::new("memory", MEMORY_ACCOUNT_KEY) {
            Ok(signer) => signer,
            Err(e) => unreachable!("static memory account key is valid base64: {}", e),
        };
        Self {
            containers: Arc::new(Mutex::new(HashMap::new())),
            injected_error: Arc::new(Mutex::new(None)),
            signer,
            uploads: Arc::new(AtomicUsize::new(0)),
            tokens_issued: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make the next storage call fail with `error`
    pub async fn inject_error(&self, error: StorageError) {
        *self.injected_error.lock().await = Some(error);
    }

    /// Seed a blob without counting it as an upload
    pub async fn insert_blob(&self, container: &str, name: &str, data: impl Into<Bytes>) {
        let mut containers = self.containers.lock().await;
        containers
            .entry(container.to_string())
            .or_default()
            .insert(name.to_string(), data.into());
    }

    pub async fn blob(&self, container: &str, name: &str) -> Option<Bytes> {
        let containers = self.containers.lock().await;
        containers.get(container).and_then(|c| c.get(name).cloned())
    }

    /// Number of upload calls that wrote data
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn tokens_issued(&self) -> usize {
        self.tokens_issued.load(Ordering::SeqCst)
    }

    async fn check_call(&self, token: &SasToken) -> Result<(), StorageError> {
        if let Some(error) = self.injected_error.lock().await.take() {
            return Err(error);
        }
        if token.is_expired_at(Utc::now()) {
            return Err(StorageError::AuthError(format!(
                "token expired at {}",
                token.expires_at()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn issue_access_token(&self) -> Result<SasToken, StorageError> {
        if let Some(error) = self.injected_error.lock().await.take() {
            return Err(error);
        }
        self.tokens_issued.fetch_add(1, Ordering::SeqCst);
        self.signer.issue()
    }

    async fn list_containers(&self, token: &SasToken) -> Result<Vec<String>, StorageError> {
        self.check_call(token).await?;
        let containers = self.containers.lock().await;
        let mut names: Vec<String> = containers.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn list_blobs(
        &self,
        token: &SasToken,
        container: &str,
    ) -> Result<Vec<String>, StorageError> {
        self.check_call(token).await?;
        let containers = self.containers.lock().await;
        containers
            .get(container)
            .map(|blobs| blobs.keys().cloned().collect())
            .ok_or_else(|| StorageError::NotFound(container.to_string()))
    }

    async fn create_container(
        &self,
        token: &SasToken,
        name: &str,
    ) -> Result<WriteOutcome, StorageError> {
        self.check_call(token).await?;
        let mut containers = self.containers.lock().await;
        if containers.contains_key(name) {
            return Ok(WriteOutcome::AlreadyExists);
        }
        containers.insert(name.to_string(), BTreeMap::new());
        Ok(WriteOutcome::Created)
    }

    async fn upload_blob(
        &self,
        token: &SasToken,
        container: &str,
        name: &str,
        data: Bytes,
    ) -> Result<(), StorageError> {
        self.check_call(token).await?;
        validate_blob_name(name)?;
        let mut containers = self.containers.lock().await;
        let blobs = containers
            .get_mut(container)
            .ok_or_else(|| StorageError::NotFound(container.to_string()))?;
        blobs.insert(name.to_string(), data);
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn upload_blob_if_absent(
        &self,
        token: &SasToken,
        container: &str,
        name: &str,
        data: Bytes,
    ) -> Result<WriteOutcome, StorageError> {
        self.check_call(token).await?;
        validate_blob_name(name)?;
        let mut containers = self.containers.lock().await;
        let blobs = containers
            .get_mut(container)
            .ok_or_else(|| StorageError::NotFound(container.to_string()))?;
        if blobs.contains_key(name) {
            return Ok(WriteOutcome::AlreadyExists);
        }
        blobs.insert(name.to_string(), data);
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(WriteOutcome::Created)
    }

    async fn download_blob(
        &self,
        token: &SasToken,
        container: &str,
        name: &str,
        destination: &Path,
    ) -> Result<u64, StorageError> {
        self.check_call(token).await?;
        let data = self
            .blob(container, name)
            .await
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", container, name)))?;
        tokio::fs::write(destination, &data).await?;
        Ok(data.len() as u64)
    }
}
