use crate::auth::Principal;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use upgate_core::models::FileEntry;

#[derive(Debug, Serialize)]
pub struct ListFilesResponse {
    pub files: Vec<FileEntry>,
    pub count: usize,
}

/// List the caller's own uploads
#[tracing::instrument(skip(state, principal), fields(subject_id = %principal.subject_id))]
pub async fn list_files(
    principal: Principal,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let files = state.issuer.list_own_files(&principal).await?;
    Ok(Json(ListFilesResponse {
        count: files.len(),
        files,
    }))
}
