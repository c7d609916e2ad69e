//! Upgate Storage Library
//!
//! The storage capability the upload issuer depends on, plus its backends.
//!
//! # Grant contract
//!
//! A backend hands out three kinds of time-bounded grants for a single object
//! key: a signed PUT URL bound to a content type, a signed form-upload policy
//! with caller-supplied conditions, and a resumable upload session. It also
//! lists objects under a prefix. Backends never choose keys; callers pass fully
//! scoped keys in and backends must not widen them.
//!
//! The Google Cloud Storage backend builds V4 canonical requests and policy
//! documents locally but obtains every signature from the IAM Credentials
//! `signBlob` API, so no private key material lives in this process.

pub mod credentials;
pub mod factory;
#[cfg(feature = "storage-gcs")]
pub mod gcs;
pub mod memory;
#[cfg(feature = "storage-gcs")]
pub(crate) mod signing;
pub mod traits;

// Re-export commonly used types
pub use credentials::{MetadataServerToken, StaticToken, TokenSource};
pub use factory::create_storage;
#[cfg(feature = "storage-gcs")]
pub use gcs::{GcsStorage, GcsStorageConfig};
pub use memory::MemoryStorage;
pub use traits::{
    FormPolicy, ObjectSummary, PolicyCondition, StorageError, StorageResult, UploadStorage,
};
pub use upgate_core::StorageBackend;
