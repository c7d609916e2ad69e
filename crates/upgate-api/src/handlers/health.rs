use crate::constants::{API_PREFIX, SERVICE_NAME};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub bucket: String,
    pub storage_backend: String,
    pub endpoints: BTreeMap<&'static str, String>,
}

/// Public service descriptor
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let endpoints = BTreeMap::from([
        ("standard_signed_url", format!("{}/generate-signed-url", API_PREFIX)),
        ("direct_url", format!("{}/generate-direct-url", API_PREFIX)),
        ("post_signed_url", format!("{}/generate-post-url", API_PREFIX)),
        ("resumable_url", format!("{}/generate-resumable-url", API_PREFIX)),
        ("list_files", format!("{}/list-files", API_PREFIX)),
    ]);

    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        bucket: state.bucket_name.clone(),
        storage_backend: state.issuer.storage().backend_type().to_string(),
        endpoints,
    })
}
