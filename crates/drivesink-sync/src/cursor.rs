//! File-backed delta cursor persistence
//!
//! The cursor is stored as a small JSON file. A missing or corrupt file
//! loads as `None`, which makes the next cycle a full resync; losing the
//! cursor costs time, never correctness.

use std::path::PathBuf;

use anyhow::{Context, Result};
use drivesink_core::domain::DeltaCursor;
use drivesink_core::ports::ICursorStore;
use tracing::{debug, info, warn};

/// Cursor store backed by a JSON file on disk
pub struct FileCursorStore {
    path: PathBuf,
}

impl FileCursorStore {
    /// Creates a store backed by the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl ICursorStore for FileCursorStore {
    async fn load(&self) -> Option<DeltaCursor> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cursor file unreadable, forcing full resync");
                return None;
            }
        };

        match serde_json::from_str::<DeltaCursor>(&json) {
            Ok(cursor) => {
                debug!(path = %self.path.display(), "Loaded delta cursor");
                Some(cursor)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cursor file corrupt, forcing full resync");
                None
            }
        }
    }

    async fn save(&self, cursor: &DeltaCursor) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create cursor directory")?;
        }

        let json = serde_json::to_string(cursor).context("Failed to serialize cursor")?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .context("Failed to write cursor file")?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .context("Failed to move cursor file into place")?;

        debug!(path = %self.path.display(), "Saved delta cursor");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "Cleared delta cursor");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to remove cursor file")),
        }
    }
}
