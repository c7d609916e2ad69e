//! Error types module
//!
//! Every failure the gateway can surface to a client is a variant of
//! [`AppError`]. Variants self-describe their HTTP presentation through
//! [`ErrorMetadata`], so the HTTP layer only renders what the error reports.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for rejected credentials and denied access
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Why an identity assertion failed verification.
///
/// The distinction matters to the caller: expired and revoked tokens mean
/// "sign in again", a malformed token means the client is broken or the token
/// was tampered with, and unknown covers anything else (including keys that
/// could not be obtained to check the signature).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationFailure {
    Expired,
    Revoked,
    Malformed,
    Unknown,
}

impl Display for VerificationFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            VerificationFailure::Expired => write!(f, "expired"),
            VerificationFailure::Revoked => write!(f, "revoked"),
            VerificationFailure::Malformed => write!(f, "malformed"),
            VerificationFailure::Unknown => write!(f, "unknown"),
        }
    }
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "TOKEN_EXPIRED")
    fn error_code(&self) -> &'static str;

    /// Client-facing `error` field
    fn client_message(&self) -> String;

    /// Optional `message` field carrying a human-readable reason
    fn detail_message(&self) -> Option<String>;

    /// Suggested action for the client, rendered as `hint`
    fn hint(&self) -> Option<&'static str>;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Missing or invalid Authorization header")]
    MissingOrMalformedCredential,

    #[error("Token verification failed ({kind}): {message}")]
    VerificationFailed {
        kind: VerificationFailure,
        message: String,
    },

    #[error("Access denied: {reason}")]
    AccessDenied { reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Upstream storage error: {0}")]
    UpstreamStorage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn verification(kind: VerificationFailure, message: impl Into<String>) -> Self {
        AppError::VerificationFailed {
            kind,
            message: message.into(),
        }
    }

    /// Short variant name used as a structured log field.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::MissingOrMalformedCredential => "MissingOrMalformedCredential",
            AppError::VerificationFailed { .. } => "VerificationFailed",
            AppError::AccessDenied { .. } => "AccessDenied",
            AppError::InvalidRequest(_) => "InvalidRequest",
            AppError::UpstreamStorage(_) => "UpstreamStorageError",
            AppError::Internal(_) => "Internal",
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        // Surface the first field message ("filename is required") rather than
        // the validator's full report.
        let message = err
            .field_errors()
            .values()
            .flat_map(|errors| errors.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| format!("Validation error: {}", err));
        AppError::InvalidRequest(message)
    }
}

/// Static metadata for each variant: (http_status, error_code, hint, log_level).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, Option<&'static str>, LogLevel) {
    match err {
        AppError::MissingOrMalformedCredential => (
            401,
            "MISSING_CREDENTIAL",
            Some("Include: Authorization: Bearer YOUR_FIREBASE_TOKEN"),
            LogLevel::Debug,
        ),
        AppError::VerificationFailed { kind, .. } => match kind {
            VerificationFailure::Expired => (
                401,
                "TOKEN_EXPIRED",
                Some("Please sign in again to get a new token"),
                LogLevel::Debug,
            ),
            VerificationFailure::Revoked => (
                401,
                "TOKEN_REVOKED",
                Some("Please sign in again"),
                LogLevel::Warn,
            ),
            VerificationFailure::Malformed => (
                401,
                "TOKEN_INVALID",
                Some("Token format is incorrect or tampered with"),
                LogLevel::Warn,
            ),
            VerificationFailure::Unknown => {
                (401, "AUTHENTICATION_FAILED", None, LogLevel::Warn)
            }
        },
        AppError::AccessDenied { .. } => (
            403,
            "ACCESS_DENIED",
            Some("Contact the administrator to request access"),
            LogLevel::Warn,
        ),
        AppError::InvalidRequest(_) => (
            400,
            "INVALID_REQUEST",
            Some("Check request parameters and try again"),
            LogLevel::Debug,
        ),
        AppError::UpstreamStorage(_) => (500, "UPSTREAM_STORAGE_ERROR", None, LogLevel::Error),
        AppError::Internal(_) => (500, "INTERNAL_ERROR", None, LogLevel::Error),
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn client_message(&self) -> String {
        match self {
            AppError::MissingOrMalformedCredential => {
                "Missing or invalid Authorization header".to_string()
            }
            AppError::VerificationFailed { kind, message } => match kind {
                VerificationFailure::Expired => "Token has expired".to_string(),
                VerificationFailure::Revoked => "Token has been revoked".to_string(),
                VerificationFailure::Malformed => "Invalid token".to_string(),
                VerificationFailure::Unknown => format!("Authentication failed: {}", message),
            },
            AppError::AccessDenied { .. } => "Access Denied".to_string(),
            AppError::InvalidRequest(msg) => msg.clone(),
            // Backend messages pass through verbatim; the caller decides whether to retry.
            AppError::UpstreamStorage(msg) => msg.clone(),
            AppError::Internal(_) => "An internal error occurred".to_string(),
        }
    }

    fn detail_message(&self) -> Option<String> {
        match self {
            AppError::AccessDenied { reason } => Some(reason.clone()),
            _ => None,
        }
    }

    fn hint(&self) -> Option<&'static str> {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }
}
