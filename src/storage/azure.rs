// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Azure Blob Storage REST backend authorized by account SAS tokens

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::{Client, Method, Response, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use super::blob_storage::{validate_blob_name, BlobStorage, StorageError, WriteOutcome};
use super::listing::{parse_blob_page, parse_container_page, ListingPage};
use super::sas::{AccountSasSigner, SasToken};
use crate::config::SecretBundle;
use crate::version::STORAGE_API_VERSION;

const MS_VERSION: &str = "x-ms-version";
const MS_BLOB_TYPE: &str = "x-ms-blob-type";
const MS_ERROR_CODE: &str = "x-ms-error-code";

#[derive(Debug, Clone)]
pub struct AzureBlobConfig {
    pub account_url: Url,
    pub account_name: String,
    pub account_key: String,
    pub timeout: Duration,
}

impl AzureBlobConfig {
    pub fn from_secrets(secrets: &SecretBundle, timeout: Duration) -> Result<Self, StorageError> {
        let account_url = secrets
            .storage_account_url()
            .map_err(|e| StorageError::AuthError(e.to_string()))?;
        Ok(Self {
            account_url,
            account_name: secrets.storage_account_name.clone(),
            account_key: secrets.account_key.clone(),
            timeout,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AzureBlobStorage {
    client: Client,
    account_url: Url,
    signer: AccountSasSigner,
}

impl AzureBlobStorage {
    pub fn new(config: AzureBlobConfig) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StorageError::NetworkError(e.to_string()))?;
        let signer = AccountSasSigner::new(&config.account_name, &config.account_key)?;

        info!(
            "Azure blob storage configured: account={}, url={}",
            config.account_name, config.account_url
        );

        Ok(Self {
            client,
            account_url: config.account_url,
            signer,
        })
    }

    /// Build `{account_url}/{segments...}?{query}&{sas}`
    fn url(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        token: &SasToken,
    ) -> Result<Url, StorageError> {
        let mut url = self.account_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| StorageError::InvalidName("account URL cannot be a base".to_string()))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let full_query = match url.query() {
            Some(q) if !q.is_empty() => format!("{}&{}", q, token.query()),
            _ => token.query().to_string(),
        };
        url.set_query(Some(&full_query));
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        headers: &[(&str, &str)],
        body: Option<Bytes>,
    ) -> Result<Response, StorageError> {
        debug!("Azure blob {} {}", method, url.path());

        let mut request = self
            .client
            .request(method, url)
            .header(MS_VERSION, STORAGE_API_VERSION);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        request
            .send()
            .await
            .map_err(|e| StorageError::NetworkError(e.to_string()))
    }

    async fn list_all(
        &self,
        token: &SasToken,
        segments: &[&str],
        base_query: &[(&str, &str)],
        parse: fn(&str) -> Result<ListingPage, StorageError>,
    ) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut query: Vec<(&str, &str)> = base_query.to_vec();
            if let Some(ref m) = marker {
                query.push(("marker", m.as_str()));
            }
            let url = self.url(segments, &query, token)?;
            let response = self.send(Method::GET, url, &[], None).await?;
            let response = expect_success(response, "List").await?;
            let body = response
                .text()
                .await
                .map_err(|e| StorageError::NetworkError(e.to_string()))?;

            let page = parse(&body)?;
            names.extend(page.names);
            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(names)
    }
}

#[async_trait]
impl BlobStorage for AzureBlobStorage {
    async fn issue_access_token(&self) -> Result<SasToken, StorageError> {
        let token = self.signer.issue()?;
        debug!(
            "Issued account SAS for {} expiring at {}",
            self.signer.account_name(),
            token.expires_at()
        );
        Ok(token)
    }

    async fn list_containers(&self, token: &SasToken) -> Result<Vec<String>, StorageError> {
        self.list_all(token, &[], &[("comp", "list")], parse_container_page)
            .await
    }

    async fn list_blobs(
        &self,
        token: &SasToken,
        container: &str,
    ) -> Result<Vec<String>, StorageError> {
        self.list_all(
            token,
            &[container],
            &[("restype", "container"), ("comp", "list")],
            parse_blob_page,
        )
        .await
    }

    async fn create_container(
        &self,
        token: &SasToken,
        name: &str,
    ) -> Result<WriteOutcome, StorageError> {
        let url = self.url(&[name], &[("restype", "container")], token)?;
        let response = self
            .send(Method::PUT, url, &[], Some(Bytes::new()))
            .await?;

        match response.status() {
            StatusCode::CREATED => {
                info!("Created container {}", name);
                Ok(WriteOutcome::Created)
            }
            StatusCode::CONFLICT if error_code(&response) == Some("ContainerAlreadyExists") => {
                Ok(WriteOutcome::AlreadyExists)
            }
            _ => Err(status_error(response, "Create container").await),
        }
    }

    async fn upload_blob(
        &self,
        token: &SasToken,
        container: &str,
        name: &str,
        data: Bytes,
    ) -> Result<(), StorageError> {
        validate_blob_name(name)?;
        let url = self.url(&[container, name], &[], token)?;
        let response = self
            .send(
                Method::PUT,
                url,
                &[(MS_BLOB_TYPE, "BlockBlob")],
                Some(data),
            )
            .await?;
        expect_success(response, "Upload").await?;
        Ok(())
    }

    async fn upload_blob_if_absent(
        &self,
        token: &SasToken,
        container: &str,
        name: &str,
        data: Bytes,
    ) -> Result<WriteOutcome, StorageError> {
        validate_blob_name(name)?;
        let url = self.url(&[container, name], &[], token)?;
        let response = self
            .send(
                Method::PUT,
                url,
                &[(MS_BLOB_TYPE, "BlockBlob"), ("If-None-Match", "*")],
                Some(data),
            )
            .await?;

        match response.status() {
            status if status.is_success() => Ok(WriteOutcome::Created),
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => {
                debug!("Blob {}/{} already exists, skipping upload", container, name);
                Ok(WriteOutcome::AlreadyExists)
            }
            _ => Err(status_error(response, "Conditional upload").await),
        }
    }

    async fn download_blob(
        &self,
        token: &SasToken,
        container: &str,
        name: &str,
        destination: &Path,
    ) -> Result<u64, StorageError> {
        validate_blob_name(name)?;
        let url = self.url(&[container, name], &[], token)?;
        let response = self.send(Method::GET, url, &[], None).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(format!("{}/{}", container, name)));
        }
        let response = expect_success(response, "Download").await?;

        let mut file = tokio::fs::File::create(destination).await?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| StorageError::NetworkError(e.to_string()))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(
            "Downloaded {}/{} ({} bytes) to {}",
            container,
            name,
            written,
            destination.display()
        );
        Ok(written)
    }
}

fn error_code(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(MS_ERROR_CODE)
        .and_then(|v| v.to_str().ok())
}

async fn expect_success(response: Response, operation: &str) -> Result<Response, StorageError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(status_error(response, operation).await)
    }
}

async fn status_error(response: Response, operation: &str) -> StorageError {
    let status = response.status();
    let code = error_code(&response).unwrap_or("").to_string();
    let text = response.text().await.unwrap_or_default();
    let message = format!("{} failed: {} {} {}", operation, status, code, text.trim());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StorageError::AuthError(message),
        StatusCode::NOT_FOUND => StorageError::NotFound(message),
        _ => StorageError::ServerError(message),
    }
}
