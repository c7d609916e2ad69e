//! Time-bounded upload grants handed back to clients.
//!
//! A grant is returned exactly once and is never stored; nothing in the
//! gateway can re-derive it after the response is sent.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

/// Grant variants. Serialized untagged so each variant's fields sit at the top
/// level of the response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Grant {
    Direct(DirectGrant),
    FormPolicy(FormPolicyGrant),
    Resumable(ResumableGrant),
}

impl Grant {
    pub fn kind(&self) -> GrantKind {
        match self {
            Grant::Direct(_) => GrantKind::Direct,
            Grant::FormPolicy(_) => GrantKind::FormPolicy,
            Grant::Resumable(_) => GrantKind::Resumable,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        match self {
            Grant::Direct(g) => g.expires_at,
            Grant::FormPolicy(g) => g.expires_at,
            Grant::Resumable(g) => g.expires_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantKind {
    Direct,
    FormPolicy,
    Resumable,
}

impl Display for GrantKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            GrantKind::Direct => write!(f, "direct"),
            GrantKind::FormPolicy => write!(f, "form_policy"),
            GrantKind::Resumable => write!(f, "resumable"),
        }
    }
}

/// Signed PUT URL bound to a content type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectGrant {
    #[serde(rename = "signed_url")]
    pub url: String,
    pub method: &'static str,
    /// The upload must declare exactly this `Content-Type`
    pub content_type: String,
    pub expires_in: String,
    pub expires_at: DateTime<Utc>,
}

impl DirectGrant {
    pub fn new(url: String, content_type: &str, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            url,
            method: "PUT",
            content_type: content_type.to_string(),
            expires_in: describe_duration(ttl),
            expires_at: expires_at(issued_at, ttl),
        }
    }
}

/// Browser form-upload policy: POST `fields` plus the file to `url`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormPolicyGrant {
    pub url: String,
    pub fields: BTreeMap<String, String>,
    pub method: &'static str,
    pub expires_in: String,
    pub expires_at: DateTime<Utc>,
    pub max_file_size: String,
    pub max_size_bytes: u64,
}

impl FormPolicyGrant {
    pub fn new(
        url: String,
        fields: BTreeMap<String, String>,
        issued_at: DateTime<Utc>,
        ttl: Duration,
        max_size_bytes: u64,
    ) -> Self {
        Self {
            url,
            fields,
            method: "POST",
            expires_in: describe_duration(ttl),
            expires_at: expires_at(issued_at, ttl),
            max_file_size: describe_size(max_size_bytes),
            max_size_bytes,
        }
    }
}

/// Resumable session URL; chunks are PUT to it until the upload completes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumableGrant {
    #[serde(rename = "resumable_url")]
    pub session_url: String,
    pub method: &'static str,
    pub content_type: String,
    pub timeout: String,
    pub expires_at: DateTime<Utc>,
}

impl ResumableGrant {
    pub fn new(
        session_url: String,
        content_type: &str,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            session_url,
            method: "PUT",
            content_type: content_type.to_string(),
            timeout: describe_duration(ttl),
            expires_at: expires_at(issued_at, ttl),
        }
    }
}

fn expires_at(issued_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    issued_at + chrono::Duration::seconds(ttl.as_secs() as i64)
}

/// Human-readable window such as "15 minutes" or "1 hour".
pub fn describe_duration(ttl: Duration) -> String {
    let secs = ttl.as_secs();
    let (value, unit) = if secs % 3600 == 0 && secs > 0 {
        (secs / 3600, "hour")
    } else if secs % 60 == 0 && secs > 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if value == 1 {
        format!("{} {}", value, unit)
    } else {
        format!("{} {}s", value, unit)
    }
}

fn describe_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DIRECT_GRANT_TTL, FORM_POLICY_MAX_BYTES, RESUMABLE_SESSION_TTL};

    #[test]
    fn test_describe_duration() {
        assert_eq!(describe_duration(DIRECT_GRANT_TTL), "15 minutes");
        assert_eq!(describe_duration(RESUMABLE_SESSION_TTL), "1 hour");
        assert_eq!(describe_duration(Duration::from_secs(7200)), "2 hours");
        assert_eq!(describe_duration(Duration::from_secs(90)), "90 seconds");
    }

    #[test]
    fn test_describe_size() {
        assert_eq!(describe_size(FORM_POLICY_MAX_BYTES), "100MB");
        assert_eq!(describe_size(1000), "1000 bytes");
    }

    #[test]
    fn test_direct_grant_serializes_flat() {
        let now = Utc::now();
        let grant = Grant::Direct(DirectGrant::new(
            "https://example/put".to_string(),
            "audio/mpeg",
            now,
            DIRECT_GRANT_TTL,
        ));
        let json = serde_json::to_value(&grant).unwrap();
        assert_eq!(json["signed_url"], "https://example/put");
        assert_eq!(json["method"], "PUT");
        assert_eq!(json["expires_in"], "15 minutes");
        assert_eq!(grant.kind(), GrantKind::Direct);
        assert_eq!(grant.expires_at(), now + chrono::Duration::minutes(15));
    }

    #[test]
    fn test_resumable_grant_window() {
        let now = Utc::now();
        let grant = ResumableGrant::new("s".to_string(), "video/mp4", now, RESUMABLE_SESSION_TTL);
        assert_eq!(grant.expires_at, now + chrono::Duration::hours(1));
        assert_eq!(grant.timeout, "1 hour");
    }
}
