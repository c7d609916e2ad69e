use crate::constants::{DEFAULT_CONTENT_TYPE, UPLOADS_ROOT};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use validator::{Validate, ValidationError};

/// Request body shared by the three issuance endpoints.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UploadRequest {
    /// Name the client wants the object to carry (without any directory part)
    #[serde(default)]
    #[validate(
        length(min = 1, message = "filename is required"),
        custom(function = "validate_filename")
    )]
    pub filename: String,
    /// MIME type the upload will be bound to
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

/// Reject names that would create nested keys or traverse out of the namespace.
fn validate_filename(filename: &str) -> Result<(), ValidationError> {
    if filename.is_empty() {
        return Ok(());
    }
    let invalid = filename == "."
        || filename == ".."
        || filename.contains('/')
        || filename.contains('\\')
        || filename.chars().any(char::is_control);
    if invalid {
        let mut err = ValidationError::new("invalid_filename");
        err.message = Some("filename must not contain path separators or control characters".into());
        return Err(err);
    }
    Ok(())
}

impl UploadRequest {
    pub fn new(filename: impl Into<String>, content_type: Option<&str>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.unwrap_or(DEFAULT_CONTENT_TYPE).to_string(),
        }
    }

    /// Declared content type, falling back to the default for blank values.
    pub fn effective_content_type(&self) -> &str {
        let trimmed = self.content_type.trim();
        if trimmed.is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            trimmed
        }
    }
}

/// Object key namespaced by principal: `uploads/{subject_id}/{timestamp}_{filename}`.
///
/// The only way to build one is [`ScopedObjectPath::new`], which refuses subjects
/// that could alias another principal's prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ScopedObjectPath(String);

impl ScopedObjectPath {
    /// Timestamp layout. The microsecond component keeps two same-named uploads
    /// in the same second from landing on one key.
    pub const TIMESTAMP_FORMAT: &'static str = "%Y%m%d_%H%M%S_%6f";

    pub fn new(subject_id: &str, filename: &str, now: DateTime<Utc>) -> Result<Self, AppError> {
        let prefix = Self::prefix_for(subject_id)?;
        if filename.is_empty() {
            return Err(AppError::InvalidRequest("filename is required".to_string()));
        }
        validate_filename(filename)
            .map_err(|e| AppError::InvalidRequest(e.message.unwrap_or_default().to_string()))?;

        let timestamp = now.format(Self::TIMESTAMP_FORMAT);
        Ok(Self(format!("{}{}_{}", prefix, timestamp, filename)))
    }

    /// Listing prefix owned by `subject_id`, including the trailing slash.
    pub fn prefix_for(subject_id: &str) -> Result<String, AppError> {
        if !is_valid_subject(subject_id) {
            return Err(AppError::InvalidRequest(format!(
                "subject '{}' cannot be used as a storage namespace",
                subject_id
            )));
        }
        Ok(format!("{}/{}/", UPLOADS_ROOT, subject_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_owned_by(&self, subject_id: &str) -> bool {
        Self::prefix_for(subject_id)
            .map(|prefix| self.0.starts_with(&prefix))
            .unwrap_or(false)
    }
}

impl Display for ScopedObjectPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// A subject can own a namespace when it is a single, non-relative path segment.
pub fn is_valid_subject(subject_id: &str) -> bool {
    !subject_id.is_empty()
        && subject_id != "."
        && subject_id != ".."
        && !subject_id.contains('/')
        && !subject_id.chars().any(char::is_control)
}
