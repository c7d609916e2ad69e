#[cfg(feature = "storage-gcs")]
use crate::{GcsStorage, GcsStorageConfig, MetadataServerToken, StaticToken, TokenSource};
use crate::{MemoryStorage, StorageBackend, StorageError, StorageResult, UploadStorage};
use std::sync::Arc;
use upgate_core::Config;

/// Create a storage backend based on configuration
///
/// `client` is shared with the rest of the process so one timeout governs
/// every upstream call.
pub fn create_storage(
    config: &Config,
    client: reqwest::Client,
) -> StorageResult<Arc<dyn UploadStorage>> {
    match config.storage_backend {
        #[cfg(feature = "storage-gcs")]
        StorageBackend::Gcs => {
            let service_account_email = config.service_account_email.clone().ok_or_else(|| {
                StorageError::ConfigError("SERVICE_ACCOUNT_EMAIL not configured".to_string())
            })?;

            let tokens: Arc<dyn TokenSource> = match config.gcs_access_token.as_deref() {
                Some(token) => Arc::new(StaticToken::new(token)),
                None => Arc::new(MetadataServerToken::new(
                    client.clone(),
                    config.metadata_endpoint.clone(),
                )),
            };

            let storage = GcsStorage::new(
                GcsStorageConfig {
                    bucket: config.bucket_name.clone(),
                    service_account_email,
                    storage_endpoint: config.gcs_endpoint.clone(),
                    iam_endpoint: config.iam_endpoint.clone(),
                    public_base_url: config.public_base_url.clone(),
                },
                client,
                tokens,
            )?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-gcs"))]
        StorageBackend::Gcs => {
            let _ = client;
            Err(StorageError::ConfigError(
                "GCS storage backend not available (storage-gcs feature not enabled)".to_string(),
            ))
        }

        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage backend; grants are not signed");
            Ok(Arc::new(MemoryStorage::new(
                config.memory_storage_base_url.clone(),
            )))
        }
    }
}
