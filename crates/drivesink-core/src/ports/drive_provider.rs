//! Drive provider port (change-delta feed and content download)
//!
//! Interface for the source cloud drive. The primary implementation
//! targets Microsoft OneDrive via the Graph API, but the trait is
//! provider-agnostic.
//!
//! ## Design Notes
//!
//! - `DeltaEntry` is a port-level DTO mirroring the raw feed record;
//!   the domain works with the validated
//!   [`UploadCandidate`](crate::domain::UploadCandidate) projection.
//! - `fetch_changes` follows the feed's own pagination internally and
//!   returns one batch per cycle together with the resume cursor, so
//!   the orchestrator never advances the cursor mid-page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::newtypes::{DeltaCursor, ObjectKey};
use crate::domain::UploadCandidate;

// ============================================================================
// DeltaEntry
// ============================================================================

/// A single record from the drive's change-delta feed
///
/// Produced by the drive API, immutable once read, and never persisted
/// beyond the current processing pass. Deleted entries may lack a path,
/// timestamp, or size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaEntry {
    /// Provider-specific item identifier
    pub id: String,
    /// Item name (file or folder name)
    pub name: String,
    /// Full drive-root-relative path (None for deleted entries)
    pub path: Option<String>,
    /// File size in bytes (None for folders or deleted entries)
    pub size: Option<u64>,
    /// Drive-side last-modified timestamp, UTC
    pub last_modified: Option<DateTime<Utc>>,
    /// Whether this entry has been deleted since the last delta
    pub is_deleted: bool,
    /// Whether this entry is a folder
    pub is_folder: bool,
}

impl DeltaEntry {
    /// Projects this entry into an [`UploadCandidate`]
    ///
    /// Returns `None` for folders, deletions, and entries missing a
    /// path, timestamp, or size. Folders produce no direct write, and
    /// deletion sync is a non-goal; a moved file surfaces as a new
    /// path and is treated as a new upload.
    pub fn to_candidate(&self, key_prefix: Option<&str>) -> Option<UploadCandidate> {
        if self.is_deleted || self.is_folder {
            return None;
        }
        let path = self.path.as_deref()?;
        let mtime = self.last_modified?;
        let size = self.size?;
        let key = ObjectKey::from_drive_path(path, key_prefix).ok()?;

        Some(UploadCandidate {
            item_id: self.id.clone(),
            key,
            mtime,
            size,
        })
    }
}

// ============================================================================
// DeltaBatch
// ============================================================================

/// One cycle's worth of delta changes
///
/// All pages the feed returned for this cycle, flattened, plus the
/// resume cursor from the final page. The cursor must not be persisted
/// until every entry in the batch has reached a terminal outcome.
#[derive(Debug, Clone)]
pub struct DeltaBatch {
    /// Changed entries across all pages of this cycle
    pub entries: Vec<DeltaEntry>,
    /// Resume cursor for the next cycle
    pub cursor: DeltaCursor,
}

// ============================================================================
// IDriveProvider trait
// ============================================================================

/// Port trait for the source drive
///
/// ## Implementation Notes
///
/// - Implementations acquire access tokens internally (through the
///   token manager), so callers never handle credentials.
/// - An expired cursor must surface as an error whose chain mentions
///   `410` / `Gone`; the orchestrator reacts by clearing the cursor
///   and refetching from scratch.
#[async_trait::async_trait]
pub trait IDriveProvider: Send + Sync {
    /// Fetches all changes since `cursor`, following pagination
    ///
    /// `None` requests a full initial enumeration.
    async fn fetch_changes(&self, cursor: Option<&DeltaCursor>) -> anyhow::Result<DeltaBatch>;

    /// Resolves a short-lived content download URL for an item
    async fn download_url(&self, item_id: &str) -> anyhow::Result<String>;

    /// Downloads an item's full content
    async fn download(&self, item_id: &str) -> anyhow::Result<Vec<u8>>;

    /// Downloads the inclusive byte range `from..=to` from a download
    /// URL previously returned by [`download_url`](Self::download_url)
    async fn download_range(&self, url: &str, from: u64, to: u64) -> anyhow::Result<Vec<u8>>;
}
