//! Upload-decision data model
//!
//! [`UploadCandidate`] is the validated projection of a raw
//! [`DeltaEntry`](crate::ports::drive_provider::DeltaEntry): folders and
//! deletions never become candidates, and every field a transfer needs
//! is guaranteed present. [`RemoteObjectMeta`] is the result of probing
//! the destination bucket, and [`ReconcileOutcome`] is the terminal
//! state of one entry's reconciliation.

use chrono::{DateTime, Utc};

use super::newtypes::ObjectKey;

// ============================================================================
// RemoteObjectMeta
// ============================================================================

/// Result of a metadata-only probe of the destination bucket
///
/// Derived per-key from a HeadObject call and never cached across
/// cycles: the destination is the source of truth for "already synced".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObjectMeta {
    /// Whether an object exists under the probed key
    pub exists: bool,
    /// Source modification time recorded on the object, if any
    pub mtime: Option<DateTime<Utc>>,
}

impl RemoteObjectMeta {
    /// Meta for a key with no object behind it
    pub fn absent() -> Self {
        Self {
            exists: false,
            mtime: None,
        }
    }

    /// Meta for an existing object carrying a recorded source mtime
    pub fn present(mtime: Option<DateTime<Utc>>) -> Self {
        Self {
            exists: true,
            mtime,
        }
    }

    /// Whether the stored mtime matches `candidate_mtime`
    ///
    /// Compared at integer epoch-second granularity, the finest
    /// resolution the provider timestamp survives the round trip with.
    /// Sub-second drift must not force a re-upload.
    pub fn matches_mtime(&self, candidate_mtime: DateTime<Utc>) -> bool {
        match self.mtime {
            Some(stored) => stored.timestamp() == candidate_mtime.timestamp(),
            None => false,
        }
    }
}

// ============================================================================
// UploadCandidate
// ============================================================================

/// A changed file that is eligible for upload consideration
///
/// Built from a delta entry by
/// [`DeltaEntry::to_candidate`](crate::ports::drive_provider::DeltaEntry::to_candidate);
/// construction filters out folders, deletions, and entries missing a
/// path, timestamp, or size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    /// Provider-side item identifier, used to download content
    pub item_id: String,
    /// Destination object key
    pub key: ObjectKey,
    /// Drive-side last-modified timestamp (UTC)
    pub mtime: DateTime<Utc>,
    /// Size in bytes as reported by the delta feed
    pub size: u64,
}

// ============================================================================
// TransferKind / ReconcileOutcome
// ============================================================================

/// Upload strategy, selected once by comparing size to the configured
/// multipart threshold
///
/// Both variants commit the object with the same `src-mtime` metadata;
/// they differ only in transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// One atomic put for files at or below the threshold
    Single,
    /// Chunked multipart transfer, finalized after all parts succeed
    Multipart {
        /// Number of parts committed
        parts: u32,
    },
}

/// Terminal outcome of reconciling one upload candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Remote object already carries the candidate's mtime; no write
    Skipped,
    /// The object was written and committed
    Uploaded(TransferKind),
    /// The entry failed after exhausting retries; the cycle continues
    Failed(String),
}

impl ReconcileOutcome {
    /// Whether this outcome represents a committed write
    pub fn is_uploaded(&self) -> bool {
        matches!(self, ReconcileOutcome::Uploaded(_))
    }
}
