use crate::auth::verifier::Claims;
use crate::error::HttpAppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde_json::{Map, Value};
use upgate_core::constants::UNKNOWN_EMAIL;
use upgate_core::AppError;

/// Verified caller, created by the identity gate and stored in request extensions.
/// Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub subject_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub raw_claims: Map<String, Value>,
}

impl Principal {
    /// Email for logs and responses, `"unknown"` when the token carried none.
    pub fn email_or_unknown(&self) -> &str {
        self.email.as_deref().unwrap_or(UNKNOWN_EMAIL)
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            subject_id: claims.uid,
            email: claims.email,
            display_name: claims.name,
            raw_claims: claims.raw,
        }
    }
}

// Handlers taking a Principal only run behind the identity gate middleware;
// a missing extension means the route was mounted without it, a server fault.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| {
                HttpAppError(AppError::Internal(
                    "route is not behind the identity gate".to_string(),
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_defaults_to_unknown() {
        let principal = Principal {
            subject_id: "uid".to_string(),
            email: None,
            display_name: None,
            raw_claims: Map::new(),
        };
        assert_eq!(principal.email_or_unknown(), "unknown");
    }

    #[tokio::test]
    async fn test_extractor_requires_gate() {
        let (mut parts, _) = axum::http::Request::new(()).into_parts();
        let result = Principal::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(HttpAppError(AppError::Internal(_)))));
    }
}
