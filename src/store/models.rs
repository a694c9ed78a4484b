use chrono::{DateTime, Utc};

/// A stored clip, derived on demand from the managed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub stored_name: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}
