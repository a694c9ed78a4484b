mod allocator;
mod local;
pub mod models;

pub use allocator::{AllocatedName, FilenameAllocator, CANONICAL_EXTENSION, MAX_STEM_LEN};
pub use local::{StoredFile, UploadStore};
pub use models::UploadRecord;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The incoming byte stream failed before it was fully written.
    #[error("Upload incomplete: {0}")]
    Incomplete(BoxError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Rejected path outside the upload directory: {0}")]
    PathTraversalRejected(String),
}
