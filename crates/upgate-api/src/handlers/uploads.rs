use crate::auth::Principal;
use crate::constants::{DIRECT_INSTRUCTIONS, POST_INSTRUCTIONS, RESUMABLE_INSTRUCTIONS};
use crate::error::{HttpAppError, ValidatedJson};
use crate::services::IssuedGrant;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use upgate_core::models::{Grant, UploadRequest};

/// Grant fields flattened next to the issued key and caller.
#[derive(Debug, Serialize)]
pub struct GrantResponse {
    #[serde(flatten)]
    pub grant: Grant,
    pub filename: String,
    pub user_email: String,
    pub instructions: &'static str,
}

impl GrantResponse {
    fn new(issued: IssuedGrant, principal: &Principal, instructions: &'static str) -> Self {
        Self {
            grant: issued.grant,
            filename: issued.object_path.to_string(),
            user_email: principal.email_or_unknown().to_string(),
            instructions,
        }
    }
}

/// Signed PUT URL for a direct upload
#[tracing::instrument(
    skip(state, principal, request),
    fields(subject_id = %principal.subject_id, operation = "generate_direct_url")
)]
pub async fn generate_direct_url(
    principal: Principal,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<UploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let issued = state.issuer.issue_direct_grant(&principal, &request).await?;
    Ok(Json(GrantResponse::new(issued, &principal, DIRECT_INSTRUCTIONS)))
}

/// Signed POST policy for a browser form upload
#[tracing::instrument(
    skip(state, principal, request),
    fields(subject_id = %principal.subject_id, operation = "generate_post_url")
)]
pub async fn generate_post_url(
    principal: Principal,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<UploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let issued = state.issuer.issue_post_policy(&principal, &request).await?;
    Ok(Json(GrantResponse::new(issued, &principal, POST_INSTRUCTIONS)))
}

/// Resumable upload session for large files
#[tracing::instrument(
    skip(state, principal, request),
    fields(subject_id = %principal.subject_id, operation = "generate_resumable_url")
)]
pub async fn generate_resumable_url(
    principal: Principal,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<UploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let issued = state
        .issuer
        .issue_resumable_grant(&principal, &request)
        .await?;
    Ok(Json(GrantResponse::new(
        issued,
        &principal,
        RESUMABLE_INSTRUCTIONS,
    )))
}
