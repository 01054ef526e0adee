// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use bytes::Bytes;
use image_insight::storage::{
    AzureBlobConfig, AzureBlobStorage, BlobStorage, StorageError, WriteOutcome,
};
use std::time::Duration;
use url::Url;

use super::fake_azure::FakeAzure;

const ACCOUNT_KEY: &str = "dGVzdC1hY2NvdW50LWtleS1tYXRlcmlhbC0wMDAwMDA=";

fn storage_for(fake: &FakeAzure) -> AzureBlobStorage {
    AzureBlobStorage::new(AzureBlobConfig {
        account_url: Url::parse(&fake.url()).unwrap(),
        account_name: "acct".to_string(),
        account_key: ACCOUNT_KEY.to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn test_list_containers_follows_markers() {
    let fake = FakeAzure::start(2).await;
    for name in ["alpha", "beta", "gamma", "img", "zeta"] {
        fake.seed(name, &[]);
    }
    let storage = storage_for(&fake);
    let token = storage.issue_access_token().await.unwrap();

    let containers = storage.list_containers(&token).await.unwrap();
    assert_eq!(containers, vec!["alpha", "beta", "gamma", "img", "zeta"]);

    // three pages of two
    let listings = fake
        .requests()
        .iter()
        .filter(|r| r.as_str() == "GET /")
        .count();
    assert_eq!(listings, 3);
}

#[tokio::test]
async fn test_container_exists_exact_name() {
    let fake = FakeAzure::start(0).await;
    fake.seed("images", &[]);
    fake.seed("img-archive", &[]);
    let storage = storage_for(&fake);
    let token = storage.issue_access_token().await.unwrap();

    assert!(!storage.container_exists(&token, "img").await.unwrap());
    fake.seed("img", &[]);
    assert!(storage.container_exists(&token, "img").await.unwrap());
}

#[tokio::test]
async fn test_container_exists_empty_account() {
    let fake = FakeAzure::start(0).await;
    let storage = storage_for(&fake);
    let token = storage.issue_access_token().await.unwrap();

    assert!(storage.list_containers(&token).await.unwrap().is_empty());
    assert!(!storage.container_exists(&token, "img").await.unwrap());
}

#[tokio::test]
async fn test_create_container_then_already_exists() {
    let fake = FakeAzure::start(0).await;
    let storage = storage_for(&fake);
    let token = storage.issue_access_token().await.unwrap();

    assert_eq!(
        storage.create_container(&token, "img").await.unwrap(),
        WriteOutcome::Created
    );
    assert_eq!(
        storage.create_container(&token, "img").await.unwrap(),
        WriteOutcome::AlreadyExists
    );
}

#[tokio::test]
async fn test_list_blobs_pages_and_exact_match() {
    let fake = FakeAzure::start(1).await;
    fake.seed("img", &[("cat.jpg", b"1"), ("cat.jpeg", b"2"), ("dog.png", b"3")]);
    let storage = storage_for(&fake);
    let token = storage.issue_access_token().await.unwrap();

    let blobs = storage.list_blobs(&token, "img").await.unwrap();
    assert_eq!(blobs, vec!["cat.jpeg", "cat.jpg", "dog.png"]);

    assert!(storage.blob_exists(&token, "img", "cat.jpg").await.unwrap());
    assert!(!storage.blob_exists(&token, "img", "cat").await.unwrap());
}

#[tokio::test]
async fn test_list_blobs_missing_container() {
    let fake = FakeAzure::start(0).await;
    let storage = storage_for(&fake);
    let token = storage.issue_access_token().await.unwrap();

    let result = storage.list_blobs(&token, "img").await;
    assert!(matches!(result, Err(StorageError::NotFound(_))));
}

#[tokio::test]
async fn test_upload_then_download() {
    let fake = FakeAzure::start(0).await;
    fake.seed("img", &[]);
    let storage = storage_for(&fake);
    let token = storage.issue_access_token().await.unwrap();

    storage
        .upload_blob(&token, "img", "my cat.jpg", Bytes::from_static(b"jpeg bytes"))
        .await
        .unwrap();
    assert_eq!(fake.blob("img", "my cat.jpg").unwrap(), b"jpeg bytes");

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("download_image.jpg");
    std::fs::write(&destination, b"stale content that is longer").unwrap();

    let written = storage
        .download_blob(&token, "img", "my cat.jpg", &destination)
        .await
        .unwrap();
    assert_eq!(written, 10);
    assert_eq!(std::fs::read(&destination).unwrap(), b"jpeg bytes");
}

#[tokio::test]
async fn test_unconditional_upload_overwrites() {
    let fake = FakeAzure::start(0).await;
    fake.seed("img", &[("cat.jpg", b"old")]);
    let storage = storage_for(&fake);
    let token = storage.issue_access_token().await.unwrap();

    storage
        .upload_blob(&token, "img", "cat.jpg", Bytes::from_static(b"new"))
        .await
        .unwrap();
    assert_eq!(fake.blob("img", "cat.jpg").unwrap(), b"new");
}

#[tokio::test]
async fn test_conditional_upload_does_not_overwrite() {
    let fake = FakeAzure::start(0).await;
    fake.seed("img", &[]);
    let storage = storage_for(&fake);
    let token = storage.issue_access_token().await.unwrap();

    let first = storage
        .upload_blob_if_absent(&token, "img", "cat.jpg", Bytes::from_static(b"first"))
        .await
        .unwrap();
    let second = storage
        .upload_blob_if_absent(&token, "img", "cat.jpg", Bytes::from_static(b"second"))
        .await
        .unwrap();

    assert_eq!(first, WriteOutcome::Created);
    assert_eq!(second, WriteOutcome::AlreadyExists);
    assert_eq!(fake.blob("img", "cat.jpg").unwrap(), b"first");
}

#[tokio::test]
async fn test_nested_blob_name_round_trips() {
    let fake = FakeAzure::start(0).await;
    fake.seed("img", &[]);
    let storage = storage_for(&fake);
    let token = storage.issue_access_token().await.unwrap();

    storage
        .upload_blob(&token, "img", "2024/cat.png", Bytes::from_static(b"png"))
        .await
        .unwrap();
    assert_eq!(fake.blob("img", "2024/cat.png").unwrap(), b"png");
}

#[tokio::test]
async fn test_download_missing_blob() {
    let fake = FakeAzure::start(0).await;
    fake.seed("img", &[]);
    let storage = storage_for(&fake);
    let token = storage.issue_access_token().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let result = storage
        .download_blob(&token, "img", "nope.jpg", &dir.path().join("out.jpg"))
        .await;
    assert!(matches!(result, Err(StorageError::NotFound(_))));
}

#[tokio::test]
async fn test_unreachable_account_is_network_error() {
    let storage = AzureBlobStorage::new(AzureBlobConfig {
        account_url: Url::parse("http://127.0.0.1:9/").unwrap(),
        account_name: "acct".to_string(),
        account_key: ACCOUNT_KEY.to_string(),
        timeout: Duration::from_secs(2),
    })
    .unwrap();
    let token = storage.issue_access_token().await.unwrap();

    let result = storage.list_containers(&token).await;
    assert!(matches!(result, Err(StorageError::NetworkError(_))));
}
