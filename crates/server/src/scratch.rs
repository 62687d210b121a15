//! Scratch storage for uploads in flight.
//!
//! Every upload is written to its own file under the scratch root and
//! removed when its [`ScratchFile`] guard is dropped, whichever way the
//! request ends.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Longest original-name suffix kept in a scratch filename.
const MAX_NAME_SUFFIX_LEN: usize = 100;

/// Scratch storage errors.
#[derive(Debug, thiserror::Error)]
pub enum ScratchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("upload stream failed: {0}")]
    Stream(String),
}

/// Result type for scratch operations.
pub type ScratchResult<T> = std::result::Result<T, ScratchError>;

/// Root directory holding scratch files.
#[derive(Debug)]
pub struct ScratchStore {
    root: PathBuf,
}

impl ScratchStore {
    /// Open the scratch directory, creating it if needed and removing any
    /// files left behind by a previous process.
    pub async fn open(root: impl AsRef<Path>) -> ScratchResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        let store = Self { root };

        let removed = store.sweep().await?;
        if removed > 0 {
            tracing::warn!(
                removed,
                root = %store.root.display(),
                "Removed leftover scratch files"
            );
        }
        Ok(store)
    }

    /// Scratch root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remove every regular file directly under the root.
    async fn sweep(&self) -> ScratchResult<usize> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    /// Stream an upload into a new scratch file.
    ///
    /// The guard exists before the first byte is written, so a failed or
    /// cancelled write still removes the partial file.
    pub async fn persist<S, E>(
        &self,
        original_name: &str,
        content_type: &str,
        stream: S,
    ) -> ScratchResult<ScratchFile>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let mut scratch = ScratchFile {
            path: self.root.join(scratch_name(original_name)),
            original_name: original_name.to_string(),
            content_type: content_type.to_string(),
            size: 0,
        };

        let mut stream = std::pin::pin!(stream);
        let mut file = fs::File::create(&scratch.path).await?;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ScratchError::Stream(e.to_string()))?;
            file.write_all(&chunk).await?;
            scratch.size += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(
            path = %scratch.path.display(),
            size = scratch.size,
            "Upload persisted to scratch"
        );
        Ok(scratch)
    }
}

/// A persisted upload. Deletes its file on drop.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    original_name: String,
    content_type: String,
    size: u64,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Filename as sent by the client.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Bytes written.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Scratch file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove scratch file"
            ),
        }
    }
}

/// Unique scratch filename: a UUID v4 prefix plus a filesystem-safe form of
/// the original basename.
fn scratch_name(original_name: &str) -> String {
    let base = Path::new(original_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload");
    let safe: String = base
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_SUFFIX_LEN)
        .collect();
    let safe = safe.trim_start_matches('.');
    format!("{}-{}", Uuid::new_v4(), safe)
}
