//! Security audit logging
//!
//! One structured line per gated request, emitted on the `audit` target so it
//! can be routed separately from diagnostics.

use serde::Serialize;

/// Audit event types for categorization
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// Verified and allow-listed
    AccessGranted,
    /// Verified but not on the allow-list
    AccessDenied,
    /// Credential missing or failed verification
    AuthenticationFailure,
}

/// Structured audit log entry
#[derive(Debug, Serialize)]
pub struct AuditLogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub event_type: AuditEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AuditLogEntry {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            event_type,
            subject_id: None,
            email: None,
            client_ip: None,
            user_agent: None,
            success: event_type == AuditEventType::AccessGranted,
            error_message: None,
        }
    }

    pub fn with_subject_id(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_client_ip(mut self, client_ip: Option<String>) -> Self {
        self.client_ip = client_ip;
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Mark as failure
    pub fn with_failure(mut self, error_message: impl Into<String>) -> Self {
        self.success = false;
        self.error_message = Some(error_message.into());
        self
    }

    /// Log the audit entry. Serialization problems degrade to `{}`; this never fails.
    pub fn log(&self) {
        let json = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());

        if self.success {
            tracing::event!(
                target: "audit",
                tracing::Level::INFO,
                audit_entry = %json,
                event_type = ?self.event_type,
                email = ?self.email,
                success = self.success,
                "Security audit log"
            );
        } else {
            tracing::event!(
                target: "audit",
                tracing::Level::WARN,
                audit_entry = %json,
                event_type = ?self.event_type,
                email = ?self.email,
                success = self.success,
                error = ?self.error_message,
                "Security audit log - failure"
            );
        }
    }
}
