pub mod grant;
pub mod listing;
pub mod upload;

pub use grant::{describe_duration, DirectGrant, FormPolicyGrant, Grant, GrantKind, ResumableGrant};
pub use listing::FileEntry;
pub use upload::{ScopedObjectPath, UploadRequest};
