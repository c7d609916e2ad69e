use async_trait::async_trait;
use serde_json::{Map, Value};
use upgate_core::VerificationFailure;

/// Claims of a verified identity assertion.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    /// When the user last signed in (seconds since epoch)
    pub auth_time: Option<i64>,
    pub raw: Map<String, Value>,
}

impl Claims {
    /// Build from a decoded token payload, picking out the well-known claims.
    pub fn from_raw(raw: Map<String, Value>) -> Self {
        let text = |key: &str| {
            raw.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        Self {
            uid: text("sub").unwrap_or_default(),
            email: text("email"),
            name: text("name"),
            auth_time: raw.get("auth_time").and_then(Value::as_i64),
            raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct VerificationError {
    pub kind: VerificationFailure,
    pub message: String,
}

impl VerificationError {
    pub fn new(kind: VerificationFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn expired(message: impl Into<String>) -> Self {
        Self::new(VerificationFailure::Expired, message)
    }

    pub fn revoked(message: impl Into<String>) -> Self {
        Self::new(VerificationFailure::Revoked, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(VerificationFailure::Malformed, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(VerificationFailure::Unknown, message)
    }
}

/// Verifies an opaque bearer credential with the identity provider.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, VerificationError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_claims_from_raw() {
        let raw = json!({
            "sub": "uid-1",
            "email": "a@example.com",
            "name": "",
            "auth_time": 1_700_000_000,
            "firebase": {"sign_in_provider": "google.com"}
        });
        let claims = Claims::from_raw(raw.as_object().unwrap().clone());
        assert_eq!(claims.uid, "uid-1");
        assert_eq!(claims.email.as_deref(), Some("a@example.com"));
        assert_eq!(claims.name, None);
        assert_eq!(claims.auth_time, Some(1_700_000_000));
        assert!(claims.raw.contains_key("firebase"));
    }

    #[test]
    fn test_error_display() {
        let err = VerificationError::expired("exp in the past");
        assert_eq!(err.to_string(), "expired: exp in the past");
    }
}
