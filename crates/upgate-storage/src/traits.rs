//! Storage abstraction trait
//!
//! This module defines the capability every storage backend must offer the
//! upload issuer.

use crate::StorageBackend;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Authentication with storage backend failed: {0}")]
    CredentialsError(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Storage request timed out: {0}")]
    Timeout(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StorageError::Timeout(err.to_string())
        } else {
            StorageError::BackendError(err.to_string())
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A condition embedded in a form-upload policy document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyCondition {
    /// Total payload size must fall in `[min, max]` bytes
    ContentLengthRange { min: u64, max: u64 },
    /// Form field `field` (e.g. `$Content-Type`) must start with `prefix`
    StartsWith { field: String, prefix: String },
}

impl PolicyCondition {
    /// Array form used in policy documents, e.g. `["content-length-range", 0, 100]`.
    pub fn to_json(&self) -> Value {
        match self {
            PolicyCondition::ContentLengthRange { min, max } => {
                json!(["content-length-range", min, max])
            }
            PolicyCondition::StartsWith { field, prefix } => json!(["starts-with", field, prefix]),
        }
    }
}

/// Signed form-upload policy: the client POSTs `fields` plus the file to `url`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormPolicy {
    pub url: String,
    pub fields: BTreeMap<String, String>,
}

/// Backend metadata for one stored object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSummary {
    pub name: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Storage abstraction trait
///
/// Implementations must be safe to share across concurrent requests; the
/// issuer holds one `Arc<dyn UploadStorage>` for the whole process.
#[async_trait]
pub trait UploadStorage: Send + Sync {
    /// Signed URL permitting a single `PUT` of `key`. The upload must send
    /// `Content-Type: content_type` or the backend rejects it.
    async fn request_put_grant(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Signed form-upload policy for `key` carrying `conditions`.
    async fn request_form_policy(
        &self,
        key: &str,
        conditions: &[PolicyCondition],
        expires_in: Duration,
    ) -> StorageResult<FormPolicy>;

    /// Open a resumable upload session for `key` and return its session URL.
    async fn request_resumable_session(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// List at most `limit` objects whose key starts with `prefix`.
    async fn list_objects(&self, prefix: &str, limit: usize) -> StorageResult<Vec<ObjectSummary>>;

    /// Public (unsigned) URL of an object.
    fn public_url(&self, key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

/// Refuse keys that could escape the caller's namespace.
pub(crate) fn ensure_valid_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.starts_with('/') || key.split('/').any(|seg| seg == "..") {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_condition_json() {
        let range = PolicyCondition::ContentLengthRange {
            min: 0,
            max: 104_857_600,
        };
        assert_eq!(range.to_json(), json!(["content-length-range", 0, 104857600]));

        let starts = PolicyCondition::StartsWith {
            field: "$Content-Type".to_string(),
            prefix: String::new(),
        };
        assert_eq!(starts.to_json(), json!(["starts-with", "$Content-Type", ""]));
    }

    #[test]
    fn test_key_validation() {
        assert!(ensure_valid_key("uploads/u/1_a.txt").is_ok());
        assert!(ensure_valid_key("").is_err());
        assert!(ensure_valid_key("/uploads/u").is_err());
        assert!(ensure_valid_key("uploads/../etc").is_err());
    }
}
