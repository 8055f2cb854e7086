//! Object store port (destination bucket)
//!
//! Interface for the destination object storage. The primary
//! implementation targets S3 via the AWS SDK.
//!
//! ## Design Notes
//!
//! - [`head`](IObjectStore::head) must distinguish "object not found"
//!   (returned as [`RemoteObjectMeta::absent`]) from every other error
//!   (returned as `Err`, retryable). Misclassifying a transient probe
//!   failure as absent would trigger a spurious, possibly large,
//!   re-upload.
//! - The source modification time rides on the committed object as the
//!   `src-mtime` user-metadata entry (integer epoch seconds), since the
//!   store's native timestamp reflects write time, not source mtime.

use chrono::{DateTime, Utc};

use crate::domain::newtypes::ObjectKey;
use crate::domain::RemoteObjectMeta;

/// Identifier of one successfully uploaded multipart part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartTag {
    /// 1-based part number
    pub part_number: i32,
    /// ETag the store returned for the part
    pub etag: String,
}

/// Port trait for the destination object store
#[async_trait::async_trait]
pub trait IObjectStore: Send + Sync {
    /// Metadata-only probe of the object under `key`
    ///
    /// Returns [`RemoteObjectMeta::absent`] only when the store
    /// positively reports that no object exists; all other failures
    /// are errors.
    async fn head(&self, key: &ObjectKey) -> anyhow::Result<RemoteObjectMeta>;

    /// Single atomic put with `mtime` attached as object metadata
    async fn put(&self, key: &ObjectKey, mtime: DateTime<Utc>, bytes: Vec<u8>)
        -> anyhow::Result<()>;

    /// Starts a multipart upload, returning its upload id
    ///
    /// `mtime` metadata set here applies to the final committed object.
    async fn create_multipart(&self, key: &ObjectKey, mtime: DateTime<Utc>)
        -> anyhow::Result<String>;

    /// Uploads one part of an in-flight multipart upload
    async fn upload_part(
        &self,
        key: &ObjectKey,
        upload_id: &str,
        part_number: i32,
        bytes: Vec<u8>,
    ) -> anyhow::Result<PartTag>;

    /// Commits a multipart upload after all parts succeeded
    async fn complete_multipart(
        &self,
        key: &ObjectKey,
        upload_id: &str,
        parts: Vec<PartTag>,
    ) -> anyhow::Result<()>;

    /// Aborts an in-flight multipart upload
    ///
    /// Called on any mid-transfer failure so incomplete parts do not
    /// linger and accrue storage cost.
    async fn abort_multipart(&self, key: &ObjectKey, upload_id: &str) -> anyhow::Result<()>;
}
