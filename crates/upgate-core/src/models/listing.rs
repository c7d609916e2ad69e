use chrono::{DateTime, Utc};
use serde::Serialize;

/// One entry of a principal's own file listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub content_type: Option<String>,
    #[serde(rename = "created")]
    pub created_at: Option<DateTime<Utc>>,
    pub public_url: String,
}
