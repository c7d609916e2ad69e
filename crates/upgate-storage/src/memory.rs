use crate::traits::{
    ensure_valid_key, FormPolicy, ObjectSummary, PolicyCondition, StorageResult, UploadStorage,
};
use crate::StorageBackend;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// In-process backend for development and tests.
///
/// Grants are plain, unsigned URLs under `base_url`; nothing is ever uploaded
/// through them. Objects only exist once seeded with [`MemoryStorage::insert_object`].
#[derive(Clone)]
pub struct MemoryStorage {
    base_url: String,
    objects: Arc<RwLock<BTreeMap<String, ObjectSummary>>>,
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Seed an object as if it had been uploaded just now.
    pub async fn insert_object(&self, key: &str, size: u64, content_type: Option<&str>) {
        let summary = ObjectSummary {
            name: key.to_string(),
            size,
            content_type: content_type.map(String::from),
            created_at: Some(Utc::now()),
        };
        self.objects.write().await.insert(key.to_string(), summary);
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

#[async_trait]
impl UploadStorage for MemoryStorage {
    async fn request_put_grant(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        ensure_valid_key(key)?;
        Ok(format!(
            "{}?method=PUT&content_type={}&expires={}",
            self.object_url(key),
            content_type,
            expires_in.as_secs()
        ))
    }

    async fn request_form_policy(
        &self,
        key: &str,
        conditions: &[PolicyCondition],
        _expires_in: Duration,
    ) -> StorageResult<FormPolicy> {
        ensure_valid_key(key)?;

        let mut fields = BTreeMap::new();
        fields.insert("key".to_string(), key.to_string());
        let policy: Vec<_> = conditions.iter().map(PolicyCondition::to_json).collect();
        fields.insert(
            "policy".to_string(),
            serde_json::Value::Array(policy).to_string(),
        );

        Ok(FormPolicy {
            url: format!("{}/", self.base_url),
            fields,
        })
    }

    async fn request_resumable_session(
        &self,
        key: &str,
        content_type: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        ensure_valid_key(key)?;
        Ok(format!(
            "{}?upload_type=resumable&content_type={}",
            self.object_url(key),
            content_type
        ))
    }

    async fn list_objects(&self, prefix: &str, limit: usize) -> StorageResult<Vec<ObjectSummary>> {
        let objects = self.objects.read().await;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .take(limit)
            .map(|(_, summary)| summary.clone())
            .collect())
    }

    fn public_url(&self, key: &str) -> String {
        self.object_url(key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
