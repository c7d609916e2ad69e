//! API constants

/// API base path prefix
pub const API_PREFIX: &str = "/api";

/// Service name reported by the health endpoint
pub const SERVICE_NAME: &str = "Signed URL Generator";

/// Default `RUST_LOG` filter when none is set
pub const DEFAULT_LOG_FILTER: &str = "upgate=debug,upgate_api=debug,upgate_storage=debug,tower_http=debug";

/// Client instructions returned alongside each grant
pub const DIRECT_INSTRUCTIONS: &str = "Use PUT method to upload file directly to this URL";
pub const POST_INSTRUCTIONS: &str = "Use POST method with form-data including all fields";
pub const RESUMABLE_INSTRUCTIONS: &str = "Use PUT method to upload chunks. Supports pause/resume.";
