use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use std::path::{Component, Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

use super::{AllocatedName, BoxError, FilenameAllocator, StoreError, UploadRecord};
use crate::config::UploadConfig;

/// Publish attempts before giving up on a name.
const MAX_PUBLISH_ATTEMPTS: u32 = 8;

/// Prefix of in-flight uploads. Names starting with it are never listed or served.
const STAGING_PREFIX: &str = ".upload-";

/// Flat directory of uploaded clips. The filesystem is the only index.
pub struct UploadStore {
    allocator: FilenameAllocator,
    base_path: PathBuf,
}

/// An opened stored file, ready to be streamed back.
pub struct StoredFile {
    pub file: File,
    pub name: String,
    pub size: u64,
}

/// Staging file owned by an in-flight upload.
///
/// Removed explicitly once the upload is published or has failed. If the owning future
/// is dropped first, `Drop` removes it instead.
struct StagedFile {
    path: PathBuf,
    removed: bool,
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            removed: false,
        }
    }

    async fn remove(mut self) {
        self.removed = true;
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staged upload");
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove abandoned upload");
        } else {
            tracing::debug!(path = %self.path.display(), "Removed abandoned upload");
        }
    }
}

impl UploadStore {
    /// Open the store, creating the managed directory if it is missing.
    pub fn new(config: &UploadConfig) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&config.dir)?;
        Ok(Self {
            allocator: FilenameAllocator::new(config.timestamp_precision),
            base_path: config.dir.clone(),
        })
    }

    pub fn allocator(&self) -> &FilenameAllocator {
        &self.allocator
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Stream `data` into the store under a name derived from `name`, returning the
    /// accepted name and the exact number of bytes written.
    ///
    /// Bytes land in a hidden staging file first. Once the stream ends the file is
    /// linked to the first free candidate name, so a stored name only ever refers to
    /// a complete upload. A stream error or a dropped future leaves nothing behind.
    pub async fn save<S, E>(&self, name: &AllocatedName, data: S) -> Result<UploadRecord, StoreError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<BoxError>,
    {
        let staging = self.base_path.join(format!(
            "{STAGING_PREFIX}{}.part",
            uuid::Uuid::new_v4().simple()
        ));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staging)
            .await?;
        let staged = StagedFile::new(staging);

        let written = match write_stream(file, data).await {
            Ok(size_bytes) => self
                .publish(name, &staged.path)
                .await
                .map(|stored_name| (stored_name, size_bytes)),
            Err(e) => Err(e),
        };
        staged.remove().await;

        let (stored_name, size_bytes) = written?;
        Ok(UploadRecord {
            stored_name,
            size_bytes,
            created_at: Utc::now(),
        })
    }

    /// Link a finished staging file to the first candidate name nobody holds yet.
    async fn publish(&self, name: &AllocatedName, staging: &Path) -> Result<String, StoreError> {
        let mut last_err = None;

        for attempt in 0..MAX_PUBLISH_ATTEMPTS {
            let candidate = name.candidate(attempt);
            match tokio::fs::hard_link(staging, self.base_path.join(&candidate)).await {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    tracing::debug!(filename = %candidate, attempt, "Stored name taken, retrying");
                    last_err = Some(e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(last_err
            .unwrap_or_else(|| std::io::Error::from(std::io::ErrorKind::AlreadyExists))
            .into())
    }

    /// Open a stored file for streaming.
    pub async fn get(&self, name: &str) -> Result<StoredFile, StoreError> {
        let path = self.object_path(name)?;

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(StoreError::NotFound(name.to_string()));
        }

        Ok(StoredFile {
            file,
            name: name.to_string(),
            size: metadata.len(),
        })
    }

    /// Read a stored file fully into memory.
    pub async fn read(&self, name: &str) -> Result<Bytes, StoreError> {
        let path = self.object_path(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Every stored clip, ordered by name. Uploads still in flight are not included.
    pub async fn list(&self) -> Result<Vec<UploadRecord>, StoreError> {
        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let Ok(stored_name) = entry.file_name().into_string() else {
                continue;
            };
            if stored_name.starts_with('.') {
                continue;
            }

            let created = metadata.created().or_else(|_| metadata.modified())?;
            records.push(UploadRecord {
                stored_name,
                size_bytes: metadata.len(),
                created_at: DateTime::<Utc>::from(created),
            });
        }

        records.sort_by(|a, b| a.stored_name.cmp(&b.stored_name));
        Ok(records)
    }

    /// Resolve a stored name to a path, refusing hidden names and anything but a
    /// single plain component.
    fn object_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        let rejected = || StoreError::PathTraversalRejected(name.to_string());

        if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\', '\0']) {
            return Err(rejected());
        }

        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.base_path.join(name)),
            _ => Err(rejected()),
        }
    }
}

async fn write_stream<S, E>(file: File, data: S) -> Result<u64, StoreError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    let mut data = std::pin::pin!(data);
    let mut writer = BufWriter::new(file);
    let mut size_bytes = 0u64;

    while let Some(chunk) = data.next().await {
        let chunk = chunk.map_err(|e| StoreError::Incomplete(e.into()))?;
        writer.write_all(&chunk).await?;
        size_bytes += chunk.len() as u64;
    }

    writer.flush().await?;
    writer.get_mut().sync_all().await?;
    Ok(size_bytes)
}
