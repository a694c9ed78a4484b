use chrono::{DateTime, Utc};

use crate::config::TimestampPrecision;

/// Extension every stored clip is normalized to.
pub const CANONICAL_EXTENSION: &str = "wav";

/// Longest stem kept from a client name. Leaves room under the 255-byte name limit for
/// the timestamp prefix, the tie-break suffix and the extension.
pub const MAX_STEM_LEN: usize = 100;

/// Derives storage names from the upload time and the client-supplied name.
#[derive(Debug, Clone, Copy)]
pub struct FilenameAllocator {
    precision: TimestampPrecision,
}

/// A timestamped, normalized name awaiting acceptance by the store.
///
/// The store tries [`AllocatedName::candidate`] with increasing attempt numbers until
/// an exclusive create succeeds, which is what breaks ties between uploads sharing a
/// timestamp tick and an original name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedName {
    pub timestamp: i64,
    /// Sanitized original name without extension.
    pub stem: String,
}

impl FilenameAllocator {
    pub fn new(precision: TimestampPrecision) -> Self {
        Self { precision }
    }

    pub fn allocate(&self, original: Option<&str>, now: DateTime<Utc>) -> AllocatedName {
        let timestamp = match self.precision {
            TimestampPrecision::Millis => now.timestamp_millis(),
            TimestampPrecision::Seconds => now.timestamp(),
        };

        let stem = original
            .map(sanitize_stem)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("recording_{timestamp}"));

        AllocatedName { timestamp, stem }
    }
}

impl AllocatedName {
    /// Attempt 0 is the plain `<t>_<stem>.wav`; later attempts carry a random suffix.
    pub fn candidate(&self, attempt: u32) -> String {
        if attempt == 0 {
            format!("{}_{}.{CANONICAL_EXTENSION}", self.timestamp, self.stem)
        } else {
            let suffix = uuid::Uuid::new_v4().simple().to_string();
            format!(
                "{}_{}-{}.{CANONICAL_EXTENSION}",
                self.timestamp,
                self.stem,
                &suffix[..8]
            )
        }
    }
}

/// Keep the last path component, drop its extension, replace anything outside
/// `[A-Za-z0-9._-]` with `_` and cap the result at [`MAX_STEM_LEN`].
fn sanitize_stem(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let stem = match base.rfind('.') {
        Some(0) | None => base,
        Some(idx) => &base[..idx],
    };

    // Every kept char is ASCII, so truncating by byte count stays on a char boundary
    let mut sanitized: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    sanitized.truncate(MAX_STEM_LEN);

    sanitized.trim_matches('.').to_string()
}
