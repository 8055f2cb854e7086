//! S3-backed object store
//!
//! Implements [`IObjectStore`] against a single destination bucket.
//!
//! ## Design Notes
//!
//! - The source modification time is attached as `src-mtime` user
//!   metadata (integer epoch seconds) on every committed object, so the
//!   probe needs only a `HeadObject` round trip.
//! - `head` maps a service-level NotFound to [`RemoteObjectMeta::absent`]
//!   and every other failure, including transport errors, to `Err`.
//!   A transient probe failure must never masquerade as a missing object.

use anyhow::{Context, Result};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, warn};

use drivesink_core::domain::{ObjectKey, RemoteObjectMeta};
use drivesink_core::ports::{IObjectStore, PartTag};

/// User-metadata key carrying the source modification time
const SRC_MTIME_META: &str = "src-mtime";

/// Encodes a source mtime as its metadata representation (epoch seconds)
fn encode_mtime(mtime: DateTime<Utc>) -> String {
    mtime.timestamp().to_string()
}

/// Parses the `src-mtime` metadata value back into a timestamp
///
/// Unparseable values yield `None`; the reconciler then treats the object
/// as differing and re-uploads, which is the safe direction.
fn parse_mtime(value: &str) -> Option<DateTime<Utc>> {
    let secs: i64 = value.parse().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}

/// Object store backed by a single S3 bucket
pub struct BucketStore {
    client: Client,
    bucket: String,
}

impl BucketStore {
    /// Creates a store from an existing SDK client
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Creates a store using the ambient AWS credential chain
    ///
    /// # Arguments
    /// * `bucket` - Destination bucket name
    /// * `region` - Bucket region
    pub async fn from_env(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.into()))
            .load()
            .await;
        Self::new(Client::new(&config), bucket)
    }
}

#[async_trait::async_trait]
impl IObjectStore for BucketStore {
    async fn head(&self, key: &ObjectKey) -> Result<RemoteObjectMeta> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await;

        match result {
            Ok(output) => {
                let mtime = output
                    .metadata()
                    .and_then(|m| m.get(SRC_MTIME_META))
                    .and_then(|v| parse_mtime(v));
                if mtime.is_none() {
                    warn!(key = key.as_str(), "Object exists without a parseable src-mtime");
                }
                debug!(key = key.as_str(), ?mtime, "HeadObject: present");
                Ok(RemoteObjectMeta { exists: true, mtime })
            }
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false);
                if not_found {
                    debug!(key = key.as_str(), "HeadObject: absent");
                    Ok(RemoteObjectMeta::absent())
                } else {
                    Err(anyhow::Error::new(err))
                        .with_context(|| format!("HeadObject failed for {}", key.as_str()))
                }
            }
        }
    }

    async fn put(&self, key: &ObjectKey, mtime: DateTime<Utc>, bytes: Vec<u8>) -> Result<()> {
        let len = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .metadata(SRC_MTIME_META, encode_mtime(mtime))
            .body(ByteStream::from(bytes))
            .send()
            .await
            .with_context(|| format!("PutObject failed for {}", key.as_str()))?;

        debug!(key = key.as_str(), bytes = len, "PutObject complete");
        Ok(())
    }

    async fn create_multipart(&self, key: &ObjectKey, mtime: DateTime<Utc>) -> Result<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key.as_str())
            .metadata(SRC_MTIME_META, encode_mtime(mtime))
            .send()
            .await
            .with_context(|| format!("CreateMultipartUpload failed for {}", key.as_str()))?;

        let upload_id = output
            .upload_id()
            .context("CreateMultipartUpload returned no upload id")?
            .to_string();

        debug!(key = key.as_str(), upload_id, "Multipart upload created");
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        key: &ObjectKey,
        upload_id: &str,
        part_number: i32,
        bytes: Vec<u8>,
    ) -> Result<PartTag> {
        let len = bytes.len();
        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key.as_str())
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .with_context(|| {
                format!("UploadPart {} failed for {}", part_number, key.as_str())
            })?;

        let etag = output
            .e_tag()
            .context("UploadPart returned no ETag")?
            .to_string();

        debug!(
            key = key.as_str(),
            part_number,
            bytes = len,
            "Part uploaded"
        );
        Ok(PartTag { part_number, etag })
    }

    async fn complete_multipart(
        &self,
        key: &ObjectKey,
        upload_id: &str,
        parts: Vec<PartTag>,
    ) -> Result<()> {
        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(
                parts
                    .into_iter()
                    .map(|p| {
                        CompletedPart::builder()
                            .part_number(p.part_number)
                            .e_tag(p.etag)
                            .build()
                    })
                    .collect(),
            ))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key.as_str())
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .with_context(|| format!("CompleteMultipartUpload failed for {}", key.as_str()))?;

        debug!(key = key.as_str(), upload_id, "Multipart upload committed");
        Ok(())
    }

    async fn abort_multipart(&self, key: &ObjectKey, upload_id: &str) -> Result<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key.as_str())
            .upload_id(upload_id)
            .send()
            .await
            .with_context(|| format!("AbortMultipartUpload failed for {}", key.as_str()))?;

        debug!(key = key.as_str(), upload_id, "Multipart upload aborted");
        Ok(())
    }
}
