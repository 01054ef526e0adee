// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod azure;
pub mod blob_storage;
pub mod listing;
pub mod memory;
pub mod sas;

// Re-export main types for convenience
pub use azure::{AzureBlobConfig, AzureBlobStorage};
pub use blob_storage::{validate_blob_name, BlobStorage, StorageError, WriteOutcome};
pub use listing::{parse_blob_page, parse_container_page, ListingPage};
pub use memory::MemoryBlobStorage;
pub use sas::{AccountSasPermissions, AccountSasSigner, ResourceTypes, SasToken, TOKEN_LIFETIME_MINUTES};

#[cfg(test)]
pub use blob_storage::MockBlobStorage;
