//! Upload credential issuer
//!
//! Turns a verified principal and a requested filename into a time-bounded
//! grant for exactly one key under `uploads/{subject_id}/`, and lists only
//! that principal's objects. Requests are validated before the backend is
//! touched; backend failures surface once, without retries.

use crate::auth::Principal;
use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;
use upgate_core::constants::{
    DIRECT_GRANT_TTL, FORM_POLICY_MAX_BYTES, FORM_POLICY_TTL, LIST_FILES_LIMIT,
    RESUMABLE_SESSION_TTL,
};
use upgate_core::models::{
    DirectGrant, FileEntry, FormPolicyGrant, Grant, ResumableGrant, ScopedObjectPath,
    UploadRequest,
};
use upgate_core::AppError;
use upgate_storage::{PolicyCondition, StorageError, UploadStorage};
use validator::Validate;

/// A grant together with the key it was issued for.
#[derive(Debug, Clone)]
pub struct IssuedGrant {
    pub object_path: ScopedObjectPath,
    pub grant: Grant,
}

pub struct IssuerService {
    storage: Arc<dyn UploadStorage>,
}

fn upstream(err: StorageError) -> AppError {
    AppError::UpstreamStorage(err.to_string())
}

impl IssuerService {
    pub fn new(storage: Arc<dyn UploadStorage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn UploadStorage> {
        &self.storage
    }

    /// Validate the request and derive the principal's scoped key.
    fn scoped_path(
        principal: &Principal,
        request: &UploadRequest,
    ) -> Result<ScopedObjectPath, AppError> {
        request.validate()?;
        ScopedObjectPath::new(&principal.subject_id, &request.filename, Utc::now())
    }

    /// Conditions attached to every form-upload policy.
    fn form_conditions() -> Vec<PolicyCondition> {
        vec![
            PolicyCondition::ContentLengthRange {
                min: 0,
                max: FORM_POLICY_MAX_BYTES,
            },
            PolicyCondition::StartsWith {
                field: "$Content-Type".to_string(),
                prefix: String::new(),
            },
        ]
    }

    /// Whole-second issuance instant. Signatures are dated to the second, so
    /// an advertised expiry built from this never outlives the real one.
    fn issued_at() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(0)
    }

    /// Final ownership check before a grant leaves the service.
    fn finish(
        principal: &Principal,
        object_path: ScopedObjectPath,
        grant: Grant,
    ) -> Result<IssuedGrant, AppError> {
        if !object_path.is_owned_by(&principal.subject_id) {
            tracing::error!(
                subject_id = %principal.subject_id,
                object = %object_path,
                "Refusing grant outside the caller's namespace"
            );
            return Err(AppError::Internal(format!(
                "object '{}' is outside the caller's namespace",
                object_path
            )));
        }

        tracing::info!(
            email = %principal.email_or_unknown(),
            object = %object_path,
            kind = %grant.kind(),
            expires_at = %grant.expires_at(),
            "Issued upload grant"
        );

        Ok(IssuedGrant { object_path, grant })
    }

    #[tracing::instrument(
        skip(self, principal, request),
        fields(subject_id = %principal.subject_id, filename = %request.filename)
    )]
    pub async fn issue_direct_grant(
        &self,
        principal: &Principal,
        request: &UploadRequest,
    ) -> Result<IssuedGrant, AppError> {
        let object_path = Self::scoped_path(principal, request)?;
        let content_type = request.effective_content_type();

        let issued_at = Self::issued_at();
        let url = self
            .storage
            .request_put_grant(object_path.as_str(), content_type, DIRECT_GRANT_TTL)
            .await
            .map_err(upstream)?;

        let grant = Grant::Direct(DirectGrant::new(url, content_type, issued_at, DIRECT_GRANT_TTL));
        Self::finish(principal, object_path, grant)
    }

    #[tracing::instrument(
        skip(self, principal, request),
        fields(subject_id = %principal.subject_id, filename = %request.filename)
    )]
    pub async fn issue_post_policy(
        &self,
        principal: &Principal,
        request: &UploadRequest,
    ) -> Result<IssuedGrant, AppError> {
        let object_path = Self::scoped_path(principal, request)?;

        let issued_at = Self::issued_at();
        let policy = self
            .storage
            .request_form_policy(
                object_path.as_str(),
                &Self::form_conditions(),
                FORM_POLICY_TTL,
            )
            .await
            .map_err(upstream)?;

        let grant = Grant::FormPolicy(FormPolicyGrant::new(
            policy.url,
            policy.fields,
            issued_at,
            FORM_POLICY_TTL,
            FORM_POLICY_MAX_BYTES,
        ));
        Self::finish(principal, object_path, grant)
    }

    #[tracing::instrument(
        skip(self, principal, request),
        fields(subject_id = %principal.subject_id, filename = %request.filename)
    )]
    pub async fn issue_resumable_grant(
        &self,
        principal: &Principal,
        request: &UploadRequest,
    ) -> Result<IssuedGrant, AppError> {
        let object_path = Self::scoped_path(principal, request)?;
        let content_type = request.effective_content_type();

        let issued_at = Self::issued_at();
        let session_url = self
            .storage
            .request_resumable_session(object_path.as_str(), content_type, RESUMABLE_SESSION_TTL)
            .await
            .map_err(upstream)?;

        let grant = Grant::Resumable(ResumableGrant::new(
            session_url,
            content_type,
            issued_at,
            RESUMABLE_SESSION_TTL,
        ));
        Self::finish(principal, object_path, grant)
    }

    /// At most 50 of the principal's own objects. Entries outside the
    /// principal's prefix are dropped even if the backend returns them.
    #[tracing::instrument(skip(self, principal), fields(subject_id = %principal.subject_id))]
    pub async fn list_own_files(&self, principal: &Principal) -> Result<Vec<FileEntry>, AppError> {
        let prefix = ScopedObjectPath::prefix_for(&principal.subject_id)?;

        let objects = self
            .storage
            .list_objects(&prefix, LIST_FILES_LIMIT)
            .await
            .map_err(upstream)?;

        let returned = objects.len();
        let files: Vec<FileEntry> = objects
            .into_iter()
            .filter(|o| o.name.starts_with(&prefix))
            .take(LIST_FILES_LIMIT)
            .map(|o| FileEntry {
                public_url: self.storage.public_url(&o.name),
                name: o.name,
                size: o.size,
                content_type: o.content_type,
                created_at: o.created_at,
            })
            .collect();

        if files.len() < returned.min(LIST_FILES_LIMIT) {
            tracing::warn!(
                returned,
                kept = files.len(),
                "Dropped listing entries outside the caller's prefix"
            );
        }

        tracing::debug!(email = %principal.email_or_unknown(), count = files.len(), "Listed own files");
        Ok(files)
    }
}
