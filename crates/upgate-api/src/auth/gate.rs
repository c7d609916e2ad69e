use crate::auth::models::Principal;
use crate::auth::policy::AccessPolicy;
use crate::auth::verifier::{IdentityVerifier, VerificationError};
use crate::middleware::audit::{AuditEventType, AuditLogEntry};
use axum::http::{header, HeaderMap};
use std::sync::Arc;
use upgate_core::models::upload::is_valid_subject;
use upgate_core::AppError;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing or invalid Authorization header")]
    MissingOrMalformedCredential,

    #[error("Token verification failed: {0}")]
    Verification(#[from] VerificationError),

    #[error("Access denied for {email}")]
    AccessDenied {
        subject_id: String,
        email: String,
        reason: String,
    },
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingOrMalformedCredential => AppError::MissingOrMalformedCredential,
            AuthError::Verification(e) => AppError::verification(e.kind, e.message),
            AuthError::AccessDenied { reason, .. } => AppError::AccessDenied { reason },
        }
    }
}

/// Verifies the bearer credential of each request and enforces the access policy.
///
/// Stateless between requests: every call re-verifies, nothing is cached here.
pub struct IdentityGate {
    verifier: Arc<dyn IdentityVerifier>,
    policy: Arc<AccessPolicy>,
}

impl IdentityGate {
    pub fn new(verifier: Arc<dyn IdentityVerifier>, policy: Arc<AccessPolicy>) -> Self {
        Self { verifier, policy }
    }

    /// Resolve the request's principal, writing exactly one audit line.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let outcome = self.resolve(headers).await;

        let entry = match &outcome {
            Ok(principal) => AuditLogEntry::new(AuditEventType::AccessGranted)
                .with_subject_id(principal.subject_id.clone())
                .with_email(principal.email_or_unknown()),
            Err(AuthError::AccessDenied {
                subject_id,
                email,
                reason,
            }) => AuditLogEntry::new(AuditEventType::AccessDenied)
                .with_subject_id(subject_id.clone())
                .with_email(email.clone())
                .with_failure(reason.clone()),
            Err(err) => {
                AuditLogEntry::new(AuditEventType::AuthenticationFailure).with_failure(err.to_string())
            }
        };
        entry
            .with_client_ip(client_ip(headers))
            .with_user_agent(header_text(headers, header::USER_AGENT.as_str()))
            .log();

        outcome
    }

    async fn resolve(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let token = bearer_token(headers).ok_or(AuthError::MissingOrMalformedCredential)?;

        let claims = self.verifier.verify(token).await?;
        if !is_valid_subject(&claims.uid) {
            return Err(VerificationError::malformed(
                "token subject cannot be used as a storage namespace",
            )
            .into());
        }

        let principal = Principal::from(claims);
        let email = principal.email_or_unknown().to_string();
        if let Err(AppError::AccessDenied { reason }) = self.policy.check(&email) {
            return Err(AuthError::AccessDenied {
                subject_id: principal.subject_id,
                email,
                reason,
            });
        }

        Ok(principal)
    }
}

/// Token from `Authorization: Bearer <token>`; `None` for any other shape.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(String::from)
}

/// First hop of `X-Forwarded-For`, as set by the App Engine / Cloud Run front end.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_text(headers, "x-forwarded-for").and_then(|v| {
        v.split(',')
            .next()
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty())
    })
}
