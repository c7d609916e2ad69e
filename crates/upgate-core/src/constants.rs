//! Grant validity windows and listing limits.

use std::time::Duration;

/// Root prefix under which every principal's namespace lives.
pub const UPLOADS_ROOT: &str = "uploads";

/// Content type assumed when an upload request does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Validity window of a direct PUT grant.
pub const DIRECT_GRANT_TTL: Duration = Duration::from_secs(15 * 60);

/// Validity window of a form-upload policy.
pub const FORM_POLICY_TTL: Duration = Duration::from_secs(15 * 60);

/// Validity window of a resumable upload session.
pub const RESUMABLE_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Upper bound of the `content-length-range` condition on form policies (100 MiB).
pub const FORM_POLICY_MAX_BYTES: u64 = 100 * 1024 * 1024;

/// Maximum number of entries returned by a file listing. There is no pagination.
pub const LIST_FILES_LIMIT: usize = 50;

/// Email used for principals whose token carries no `email` claim.
pub const UNKNOWN_EMAIL: &str = "unknown";
