// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Account shared access signatures for Azure Blob Storage
//!
//! Tokens are signed locally with the storage account key (HMAC-SHA256 over
//! the canonical string-to-sign) and appended to every request URL. A token
//! is issued per pipeline run and never cached.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use url::form_urlencoded;

use super::StorageError;
use crate::version::STORAGE_API_VERSION;

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of every issued token
pub const TOKEN_LIFETIME_MINUTES: i64 = 5;

const EXPIRY_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Permissions granted by an account SAS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountSasPermissions {
    pub read: bool,
    pub write: bool,
    pub delete: bool,
    pub list: bool,
    pub add: bool,
    pub create: bool,
}

impl AccountSasPermissions {
    /// Read, write, list and create: everything the pipeline needs
    pub fn pipeline() -> Self {
        Self {
            read: true,
            write: true,
            list: true,
            create: true,
            ..Self::default()
        }
    }
}

impl fmt::Display for AccountSasPermissions {
    // Azure requires the order r w d l a c
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (self.read, 'r'),
            (self.write, 'w'),
            (self.delete, 'd'),
            (self.list, 'l'),
            (self.add, 'a'),
            (self.create, 'c'),
        ];
        for (enabled, c) in flags {
            if enabled {
                write!(f, "{}", c)?;
            }
        }
        Ok(())
    }
}

/// Resource types an account SAS applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTypes {
    pub service: bool,
    pub container: bool,
    pub object: bool,
}

impl ResourceTypes {
    pub fn all() -> Self {
        Self {
            service: true,
            container: true,
            object: true,
        }
    }
}

impl fmt::Display for ResourceTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.service {
            f.write_str("s")?;
        }
        if self.container {
            f.write_str("c")?;
        }
        if self.object {
            f.write_str("o")?;
        }
        Ok(())
    }
}

/// A signed, short-lived account SAS
#[derive(Clone, PartialEq, Eq)]
pub struct SasToken {
    query: String,
    permissions: AccountSasPermissions,
    resource_types: ResourceTypes,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl fmt::Debug for SasToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SasToken")
            .field("permissions", &self.permissions.to_string())
            .field("resource_types", &self.resource_types.to_string())
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl SasToken {
    /// Query string to append to a request URL (no leading `?`)
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn permissions(&self) -> AccountSasPermissions {
        self.permissions
    }

    pub fn resource_types(&self) -> ResourceTypes {
        self.resource_types
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Signs account SAS tokens for one storage account
#[derive(Clone)]
pub struct AccountSasSigner {
    account_name: String,
    key: Vec<u8>,
}

impl fmt::Debug for AccountSasSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountSasSigner")
            .field("account_name", &self.account_name)
            .finish_non_exhaustive()
    }
}

impl AccountSasSigner {
    /// Create a signer from the account name and the base64 account key
    pub fn new(account_name: &str, account_key: &str) -> Result<Self, StorageError> {
        let key = STANDARD
            .decode(account_key.trim())
            .map_err(|e| StorageError::AuthError(format!("account key is not base64: {}", e)))?;
        if key.is_empty() {
            return Err(StorageError::AuthError("account key is empty".to_string()));
        }
        Ok(Self {
            account_name: account_name.to_string(),
            key,
        })
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Issue a token with the pipeline permissions, valid for five minutes from now
    pub fn issue(&self) -> Result<SasToken, StorageError> {
        self.issue_at(Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(&self, now: DateTime<Utc>) -> Result<SasToken, StorageError> {
        let permissions = AccountSasPermissions::pipeline();
        let resource_types = ResourceTypes::all();
        let expires_at = (now + Duration::minutes(TOKEN_LIFETIME_MINUTES)).trunc_subsecs(0);
        let expiry = expires_at.format(EXPIRY_FORMAT).to_string();

        let sp = permissions.to_string();
        let srt = resource_types.to_string();
        let string_to_sign = string_to_sign(&self.account_name, &sp, "b", &srt, &expiry);
        let signature = self.sign(&string_to_sign)?;

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("sv", STORAGE_API_VERSION)
            .append_pair("ss", "b")
            .append_pair("srt", &srt)
            .append_pair("sp", &sp)
            .append_pair("se", &expiry)
            .append_pair("spr", "https")
            .append_pair("sig", &signature)
            .finish();

        Ok(SasToken {
            query,
            permissions,
            resource_types,
            issued_at: now,
            expires_at,
        })
    }

    fn sign(&self, string_to_sign: &str) -> Result<String, StorageError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| StorageError::AuthError(e.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

/// Canonical account SAS string-to-sign for service versions 2020-12-06 and later.
/// Start time, IP range and encryption scope are left empty.
fn string_to_sign(account: &str, sp: &str, ss: &str, srt: &str, expiry: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}\n\n{}\n\nhttps\n{}\n\n",
        account, sp, ss, srt, expiry, STORAGE_API_VERSION
    )
}
