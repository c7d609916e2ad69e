use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use upgate_storage::{
    FormPolicy, MemoryStorage, ObjectSummary, PolicyCondition, StorageBackend, StorageError,
    StorageResult, UploadStorage,
};

/// In-memory storage that counts every backend call and can be told to fail
/// or to ignore the listing prefix.
pub struct CountingStorage {
    inner: MemoryStorage,
    calls: AtomicUsize,
    fail_with: Option<String>,
    ignore_prefix: bool,
    last_conditions: std::sync::Mutex<Vec<PolicyCondition>>,
    last_expiry: std::sync::Mutex<Option<Duration>>,
}

impl CountingStorage {
    pub fn new() -> Self {
        Self {
            inner: MemoryStorage::new("http://storage.test/test-bucket"),
            calls: AtomicUsize::new(0),
            fail_with: None,
            ignore_prefix: false,
            last_conditions: std::sync::Mutex::new(Vec::new()),
            last_expiry: std::sync::Mutex::new(None),
        }
    }

    /// Every call fails with a backend error carrying `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new()
        }
    }

    /// Listings return every object under `uploads/`, whatever prefix was asked for.
    pub fn leaky() -> Self {
        Self {
            ignore_prefix: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_conditions(&self) -> Vec<PolicyCondition> {
        self.last_conditions.lock().unwrap().clone()
    }

    pub fn last_expiry(&self) -> Option<Duration> {
        *self.last_expiry.lock().unwrap()
    }

    pub async fn seed(&self, key: &str, size: u64) {
        self.inner.insert_object(key, size, Some("application/octet-stream")).await;
    }

    fn record(&self, expires_in: Option<Duration>) -> StorageResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if expires_in.is_some() {
            *self.last_expiry.lock().unwrap() = expires_in;
        }
        match &self.fail_with {
            Some(message) => Err(StorageError::BackendError(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl UploadStorage for CountingStorage {
    async fn request_put_grant(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.record(Some(expires_in))?;
        self.inner.request_put_grant(key, content_type, expires_in).await
    }

    async fn request_form_policy(
        &self,
        key: &str,
        conditions: &[PolicyCondition],
        expires_in: Duration,
    ) -> StorageResult<FormPolicy> {
        self.record(Some(expires_in))?;
        *self.last_conditions.lock().unwrap() = conditions.to_vec();
        self.inner.request_form_policy(key, conditions, expires_in).await
    }

    async fn request_resumable_session(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.record(Some(expires_in))?;
        self.inner
            .request_resumable_session(key, content_type, expires_in)
            .await
    }

    async fn list_objects(&self, prefix: &str, limit: usize) -> StorageResult<Vec<ObjectSummary>> {
        self.record(None)?;
        let prefix = if self.ignore_prefix { "uploads/" } else { prefix };
        self.inner.list_objects(prefix, limit).await
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://storage.googleapis.com/test-bucket/{}", key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
