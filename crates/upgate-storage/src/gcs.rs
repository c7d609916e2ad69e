use crate::credentials::TokenSource;
use crate::signing::{self, SigningScope};
use crate::traits::{
    ensure_valid_key, FormPolicy, ObjectSummary, PolicyCondition, StorageError, StorageResult,
    UploadStorage,
};
use crate::StorageBackend;
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Settings for [`GcsStorage`].
#[derive(Debug, Clone)]
pub struct GcsStorageConfig {
    pub bucket: String,
    /// Service account whose key signs the grants, via `signBlob`
    pub service_account_email: String,
    /// e.g. "https://storage.googleapis.com"
    pub storage_endpoint: String,
    /// e.g. "https://iamcredentials.googleapis.com"
    pub iam_endpoint: String,
    pub public_base_url: String,
}

/// Google Cloud Storage implementation
#[derive(Clone)]
pub struct GcsStorage {
    config: GcsStorageConfig,
    host: String,
    client: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignBlobResponse {
    signed_blob: String,
}

#[derive(Debug, Deserialize)]
struct ListObjectsResponse {
    #[serde(default)]
    items: Vec<ObjectResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource {
    name: String,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    time_created: Option<DateTime<Utc>>,
}

impl From<ObjectResource> for ObjectSummary {
    fn from(item: ObjectResource) -> Self {
        ObjectSummary {
            size: item.size.and_then(|s| s.parse().ok()).unwrap_or(0),
            name: item.name,
            content_type: item.content_type,
            created_at: item.time_created,
        }
    }
}

/// Error text for a failed Google API call, keeping the API's own message
/// (`{"error":{"message":..}}`) or else the raw body.
fn rejection_message(call: &str, status: reqwest::StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| body.trim().to_string());
    if detail.is_empty() {
        format!("{} returned {}", call, status)
    } else {
        format!("{} returned {}: {}", call, status, detail)
    }
}

impl GcsStorage {
    /// Create a new GcsStorage instance
    ///
    /// # Arguments
    /// * `config` - bucket, signer and endpoints
    /// * `client` - shared HTTP client; its timeout bounds every upstream call
    /// * `tokens` - OAuth token source for the JSON and IAM APIs
    pub fn new(
        mut config: GcsStorageConfig,
        client: reqwest::Client,
        tokens: Arc<dyn TokenSource>,
    ) -> StorageResult<Self> {
        if config.bucket.trim().is_empty() {
            return Err(StorageError::ConfigError("bucket name is empty".to_string()));
        }
        if config.service_account_email.trim().is_empty() {
            return Err(StorageError::ConfigError(
                "service account email is empty".to_string(),
            ));
        }
        config.storage_endpoint = config.storage_endpoint.trim_end_matches('/').to_string();
        config.iam_endpoint = config.iam_endpoint.trim_end_matches('/').to_string();
        config.public_base_url = config.public_base_url.trim_end_matches('/').to_string();

        let host = signing::endpoint_host(&config.storage_endpoint)?;

        Ok(Self {
            config,
            host,
            client,
            tokens,
        })
    }

    /// Sign `payload` with the service account's managed key, returning the
    /// hex-encoded RSA-SHA256 signature.
    async fn sign_blob(&self, payload: &[u8]) -> StorageResult<String> {
        let token = self.tokens.access_token().await?;
        let url = format!(
            "{}/v1/projects/-/serviceAccounts/{}:signBlob",
            self.config.iam_endpoint, self.config.service_account_email
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({
                "payload": base64::engine::general_purpose::STANDARD.encode(payload),
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                service_account = %self.config.service_account_email,
                body = %body,
                "signBlob request rejected"
            );
            return Err(StorageError::SigningFailed(rejection_message(
                "signBlob", status, &body,
            )));
        }

        let body: SignBlobResponse = response
            .json()
            .await
            .map_err(|e| StorageError::SigningFailed(format!("invalid signBlob response: {}", e)))?;
        let signature = base64::engine::general_purpose::STANDARD
            .decode(body.signed_blob.as_bytes())
            .map_err(|e| StorageError::SigningFailed(format!("signature is not base64: {}", e)))?;

        Ok(hex::encode(signature))
    }

    fn expires_secs(expires_in: Duration) -> u64 {
        expires_in.as_secs().clamp(1, signing::MAX_EXPIRES_SECS)
    }
}

#[async_trait]
impl UploadStorage for GcsStorage {
    async fn request_put_grant(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        ensure_valid_key(key)?;

        let scope = SigningScope::new(&self.config.service_account_email, Utc::now());
        let resource = signing::resource_path(&self.config.bucket, key);
        let request = signing::canonical_request(
            "PUT",
            &resource,
            &self.host,
            &[("content-type", content_type)],
            &scope,
            Self::expires_secs(expires_in),
        );
        let string_to_sign = signing::string_to_sign(&scope, &request.canonical);
        let signature = self.sign_blob(string_to_sign.as_bytes()).await?;

        tracing::debug!(
            bucket = %self.config.bucket,
            key = %key,
            content_type = %content_type,
            "Signed PUT URL"
        );

        Ok(format!(
            "{}{}?{}&X-Goog-Signature={}",
            self.config.storage_endpoint, resource, request.query, signature
        ))
    }

    async fn request_form_policy(
        &self,
        key: &str,
        conditions: &[PolicyCondition],
        expires_in: Duration,
    ) -> StorageResult<FormPolicy> {
        ensure_valid_key(key)?;

        let now = Utc::now();
        let scope = SigningScope::new(&self.config.service_account_email, now);
        let expiration = now
            + chrono::Duration::seconds(Self::expires_secs(expires_in) as i64);
        let policy = signing::policy_document(
            &self.config.bucket,
            key,
            &scope,
            conditions,
            expiration,
        );
        let signature = self.sign_blob(policy.as_bytes()).await?;

        let mut fields = BTreeMap::new();
        fields.insert("key".to_string(), key.to_string());
        fields.insert(
            "x-goog-algorithm".to_string(),
            signing::ALGORITHM.to_string(),
        );
        fields.insert("x-goog-credential".to_string(), scope.credential);
        fields.insert("x-goog-date".to_string(), scope.datetime);
        fields.insert("x-goog-signature".to_string(), signature);
        fields.insert("policy".to_string(), policy);

        tracing::debug!(
            bucket = %self.config.bucket,
            key = %key,
            conditions = conditions.len(),
            "Signed POST policy"
        );

        Ok(FormPolicy {
            url: format!("{}/{}/", self.config.storage_endpoint, self.config.bucket),
            fields,
        })
    }

    async fn request_resumable_session(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        ensure_valid_key(key)?;

        let token = self.tokens.access_token().await?;
        let url = format!(
            "{}/upload/storage/v1/b/{}/o",
            self.config.storage_endpoint, self.config.bucket
        );

        let response = self
            .client
            .post(&url)
            .query(&[("uploadType", "resumable"), ("name", key)])
            .bearer_auth(token)
            .header("X-Upload-Content-Type", content_type)
            .json(&json!({ "name": key, "contentType": content_type }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                bucket = %self.config.bucket,
                key = %key,
                body = %body,
                "Failed to open resumable upload session"
            );
            return Err(StorageError::BackendError(rejection_message(
                "resumable session request",
                status,
                &body,
            )));
        }

        let session_url = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| {
                StorageError::BackendError(
                    "resumable session response has no Location header".to_string(),
                )
            })?;

        tracing::debug!(
            bucket = %self.config.bucket,
            key = %key,
            validity_secs = expires_in.as_secs(),
            "Opened resumable upload session"
        );

        Ok(session_url)
    }

    async fn list_objects(&self, prefix: &str, limit: usize) -> StorageResult<Vec<ObjectSummary>> {
        let token = self.tokens.access_token().await?;
        let url = format!(
            "{}/storage/v1/b/{}/o",
            self.config.storage_endpoint, self.config.bucket
        );
        let max_results = limit.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[("prefix", prefix), ("maxResults", max_results.as_str())])
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                bucket = %self.config.bucket,
                prefix = %prefix,
                body = %body,
                "Failed to list objects"
            );
            return Err(StorageError::BackendError(rejection_message(
                "object listing",
                status,
                &body,
            )));
        }

        let body: ListObjectsResponse = response
            .json()
            .await
            .map_err(|e| StorageError::BackendError(format!("invalid listing response: {}", e)))?;

        Ok(body
            .items
            .into_iter()
            .take(limit)
            .map(ObjectSummary::from)
            .collect())
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}{}",
            self.config.public_base_url,
            signing::resource_path(&self.config.bucket, key)
        )
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Gcs
    }
}
