//! Upgate Core Library
//!
//! Domain models, error taxonomy and configuration shared by the storage
//! backends and the HTTP service.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel, VerificationFailure};
pub use storage_types::StorageBackend;
