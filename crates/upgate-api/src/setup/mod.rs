//! Application setup and initialization

pub mod routes;
pub mod server;

use crate::auth::{AccessPolicy, FirebaseVerifier, IdentityGate, IdentityVerifier, RevocationCheck};
use crate::services::IssuerService;
use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use upgate_core::Config;
use upgate_storage::{create_storage, MetadataServerToken, StaticToken, TokenSource, UploadStorage};

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(&config.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!("Configuration loaded and validated successfully");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.upstream_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let storage = create_storage(&config, client.clone()).context("Failed to set up storage")?;
    let verifier = build_verifier(&config, client);

    let policy = AccessPolicy::new(&config.allowed_emails);
    if policy.is_empty() {
        tracing::warn!("ALLOWED_EMAILS is empty; every request will be denied");
    } else {
        tracing::info!(allowed_emails = policy.len(), "Access policy loaded");
    }

    let state = build_state(&config, storage, verifier, policy);
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

/// Wire the gate and issuer around already-built collaborators.
pub fn build_state(
    config: &Config,
    storage: Arc<dyn UploadStorage>,
    verifier: Arc<dyn IdentityVerifier>,
    policy: AccessPolicy,
) -> Arc<AppState> {
    Arc::new(AppState {
        issuer: Arc::new(IssuerService::new(storage)),
        gate: Arc::new(IdentityGate::new(verifier, Arc::new(policy))),
        bucket_name: config.bucket_name.clone(),
    })
}

fn build_verifier(config: &Config, client: reqwest::Client) -> Arc<dyn IdentityVerifier> {
    let verifier = FirebaseVerifier::new(
        config.firebase_project_id.clone(),
        config.firebase_jwks_url.clone(),
        client.clone(),
        Some(config.jwks_cache_ttl_secs),
    );

    if !config.check_revoked {
        return Arc::new(verifier);
    }

    let tokens: Arc<dyn TokenSource> = match config.gcs_access_token.as_deref() {
        Some(token) => Arc::new(StaticToken::new(token)),
        None => Arc::new(MetadataServerToken::new(
            client.clone(),
            config.metadata_endpoint.clone(),
        )),
    };
    tracing::info!("Token revocation checks enabled");

    Arc::new(verifier.with_revocation_check(RevocationCheck::new(
        client,
        config.identity_toolkit_endpoint.clone(),
        config.firebase_project_id.clone(),
        tokens,
    )))
}
