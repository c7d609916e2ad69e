//! OAuth access tokens for Google APIs.
//!
//! The storage backend and the revocation lookup both call Google REST APIs
//! with a bearer token. On App Engine / Cloud Run the token comes from the
//! instance metadata server; in development a static token can be supplied.

use crate::traits::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Tokens are refreshed this long before the server-reported expiry.
const REFRESH_MARGIN_SECS: i64 = 60;

#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Bearer token valid for at least the next few seconds.
    async fn access_token(&self) -> StorageResult<String>;
}

/// Fixed token, typically from `GCS_ACCESS_TOKEN`.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> StorageResult<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Default service-account token from the instance metadata server, cached
/// until shortly before it expires.
pub struct MetadataServerToken {
    client: reqwest::Client,
    endpoint: String,
    cache: Arc<RwLock<Option<CachedToken>>>,
}

impl MetadataServerToken {
    /// # Arguments
    /// * `endpoint` - metadata server base, e.g. "http://metadata.google.internal"
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            cache: Arc::new(RwLock::new(None)),
        }
    }

    async fn fetch(&self) -> StorageResult<CachedToken> {
        let url = format!(
            "{}/computeMetadata/v1/instance/service-accounts/default/token",
            self.endpoint
        );
        let response = self
            .client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| StorageError::CredentialsError(format!("metadata server: {}", e)))?;

        if !response.status().is_success() {
            return Err(StorageError::CredentialsError(format!(
                "metadata server returned {}",
                response.status()
            )));
        }

        let body: MetadataTokenResponse = response
            .json()
            .await
            .map_err(|e| StorageError::CredentialsError(format!("invalid token response: {}", e)))?;

        Ok(CachedToken {
            token: body.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(body.expires_in - REFRESH_MARGIN_SECS),
        })
    }
}

#[async_trait]
impl TokenSource for MetadataServerToken {
    async fn access_token(&self) -> StorageResult<String> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.expires_at > Utc::now() {
                    return Ok(cached.token.clone());
                }
            }
        }

        let fresh = self.fetch().await?;
        tracing::debug!(expires_at = %fresh.expires_at, "Refreshed metadata server access token");

        let mut cache = self.cache.write().await;
        *cache = Some(fresh.clone());
        Ok(fresh.token)
    }
}
