//! Test helpers: build the router around test doubles.
//!
//! Run from workspace root: `cargo test -p upgate-api`.

#![allow(dead_code)]

pub mod auth;
pub mod storage;

use axum_test::TestServer;
use std::sync::Arc;
use upgate_api::auth::{AccessPolicy, IdentityVerifier};
use upgate_api::setup::{build_state, routes};
use upgate_core::{Config, StorageBackend};

pub use auth::{ScriptedVerifier, ALLOWED_EMAIL};
pub use storage::CountingStorage;

/// Test application: server plus the storage double for call counting.
pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<CountingStorage>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn test_config() -> Config {
    Config {
        server_port: 8081,
        environment: "test".to_string(),
        cors_origins: vec!["*".to_string()],
        log_format: "compact".to_string(),
        storage_backend: StorageBackend::Memory,
        bucket_name: "test-bucket".to_string(),
        service_account_email: None,
        gcs_endpoint: "https://storage.googleapis.com".to_string(),
        iam_endpoint: "https://iamcredentials.googleapis.com".to_string(),
        metadata_endpoint: "http://metadata.google.internal".to_string(),
        gcs_access_token: None,
        public_base_url: "https://storage.googleapis.com".to_string(),
        memory_storage_base_url: "http://storage.test".to_string(),
        firebase_project_id: auth::PROJECT_ID.to_string(),
        firebase_jwks_url: "http://127.0.0.1:9/jwks".to_string(),
        jwks_cache_ttl_secs: 3600,
        check_revoked: false,
        identity_toolkit_endpoint: "http://127.0.0.1:9".to_string(),
        allowed_emails: vec![ALLOWED_EMAIL.to_string(), "second@example.com".to_string()],
        upstream_timeout_secs: 5,
    }
}

/// Build the app with a given verifier and storage double.
pub fn setup_app_with(
    verifier: Arc<dyn IdentityVerifier>,
    storage: Arc<CountingStorage>,
) -> TestApp {
    let config = test_config();
    let policy = AccessPolicy::new(&config.allowed_emails);
    let state = build_state(&config, storage.clone(), verifier, policy);
    let router = routes::setup_routes(&config, state).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to start test server");
    TestApp { server, storage }
}

/// App with the default scripted verifier (see [`auth::ScriptedVerifier::standard`])
/// and a healthy in-memory storage double.
pub fn setup_test_app() -> TestApp {
    setup_app_with(
        Arc::new(ScriptedVerifier::standard()),
        Arc::new(CountingStorage::new()),
    )
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}
