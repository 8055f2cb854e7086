//! Per-file reconciliation: probe, decide, transfer
//!
//! For each upload candidate the reconciler probes the destination with a
//! metadata-only head request, compares source and stored modification
//! times at second granularity, and either skips the entry or uploads it.
//! Files at or below the multipart threshold go up in one atomic put;
//! larger files are streamed range by range through a multipart upload.
//!
//! ## Design Notes
//!
//! - The decision is metadata-only: no bytes are downloaded for entries
//!   that end up skipped.
//! - A failed part aborts the whole multipart upload, and the abort
//!   completes before the failure is reported, so no in-flight upload
//!   accrues storage cost past the outcome. S3 never exposes a partially
//!   completed object; retrying from scratch next cycle is simpler than
//!   resuming and the delta feed will offer the entry again.
//! - Parts of one file transfer sequentially; concurrency lives at the
//!   file level in the orchestrator's worker pool.

use std::sync::Arc;

use anyhow::{Context, Result};
use drivesink_core::domain::{PartPlan, ReconcileOutcome, TransferKind, UploadCandidate};
use drivesink_core::ports::{IDriveProvider, IObjectStore, PartTag};
use tracing::{debug, info, warn};

use crate::retry::{with_retry, RetryPolicy};

/// Transfer sizing knobs
#[derive(Debug, Clone, Copy)]
pub struct TransferSettings {
    /// Files above this many bytes upload in parts; at or below, one put
    pub multipart_threshold: u64,
    /// Size of each multipart part in bytes
    pub part_size: u64,
    /// Upper bound on the part count
    pub max_parts: u32,
}

/// Decides and executes the transfer for one upload candidate
pub struct Reconciler {
    drive: Arc<dyn IDriveProvider>,
    store: Arc<dyn IObjectStore>,
    settings: TransferSettings,
    retry: RetryPolicy,
}

impl Reconciler {
    /// Creates a new reconciler
    pub fn new(
        drive: Arc<dyn IDriveProvider>,
        store: Arc<dyn IObjectStore>,
        settings: TransferSettings,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            drive,
            store,
            settings,
            retry,
        }
    }

    /// Reconciles one candidate to a terminal outcome
    ///
    /// Never returns an error: failures are captured in
    /// [`ReconcileOutcome::Failed`] so one broken file cannot take down
    /// the rest of the batch.
    pub async fn reconcile(&self, candidate: &UploadCandidate) -> ReconcileOutcome {
        match self.try_reconcile(candidate).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    key = candidate.key.as_str(),
                    error = format!("{err:#}"),
                    "Reconciliation failed"
                );
                ReconcileOutcome::Failed(format!("{err:#}"))
            }
        }
    }

    async fn try_reconcile(&self, candidate: &UploadCandidate) -> Result<ReconcileOutcome> {
        let meta = with_retry(&self.retry, "head", || self.store.head(&candidate.key))
            .await
            .context("Remote probe failed")?;

        if meta.exists && meta.matches_mtime(candidate.mtime) {
            debug!(key = candidate.key.as_str(), "Up to date, skipping");
            return Ok(ReconcileOutcome::Skipped);
        }

        let kind = if candidate.size <= self.settings.multipart_threshold {
            self.upload_single(candidate).await?;
            TransferKind::Single
        } else {
            let parts = self.upload_multipart(candidate).await?;
            TransferKind::Multipart { parts }
        };

        info!(
            key = candidate.key.as_str(),
            size = candidate.size,
            ?kind,
            "Uploaded"
        );
        Ok(ReconcileOutcome::Uploaded(kind))
    }

    /// Downloads the full content and writes it in one atomic put
    async fn upload_single(&self, candidate: &UploadCandidate) -> Result<()> {
        let bytes = with_retry(&self.retry, "download", || {
            self.drive.download(&candidate.item_id)
        })
        .await
        .context("Content download failed")?;

        with_retry(&self.retry, "put", || {
            let bytes = bytes.clone();
            self.store.put(&candidate.key, candidate.mtime, bytes)
        })
        .await
        .context("Object put failed")?;

        Ok(())
    }

    /// Streams the content range by range through a multipart upload
    ///
    /// Returns the number of parts uploaded. Any failure after the upload
    /// is created aborts it before the error propagates.
    async fn upload_multipart(&self, candidate: &UploadCandidate) -> Result<u32> {
        let plan = PartPlan::new(
            candidate.size,
            self.settings.part_size,
            self.settings.max_parts,
        )?;
        let part_count = plan.part_count();

        let url = with_retry(&self.retry, "download_url", || {
            self.drive.download_url(&candidate.item_id)
        })
        .await
        .context("Download URL resolution failed")?;

        let upload_id = with_retry(&self.retry, "create_multipart", || {
            self.store.create_multipart(&candidate.key, candidate.mtime)
        })
        .await
        .context("Multipart creation failed")?;

        debug!(
            key = candidate.key.as_str(),
            upload_id, part_count, "Starting multipart transfer"
        );

        match self.transfer_parts(candidate, &url, &upload_id, plan).await {
            Ok(tags) => {
                let completed = with_retry(&self.retry, "complete_multipart", || {
                    self.store
                        .complete_multipart(&candidate.key, &upload_id, tags.clone())
                })
                .await
                .context("Multipart completion failed");
                if let Err(err) = completed {
                    self.abort_upload(candidate, &upload_id).await;
                    return Err(err);
                }
                Ok(part_count)
            }
            Err(err) => {
                self.abort_upload(candidate, &upload_id).await;
                Err(err)
            }
        }
    }

    /// Downloads and uploads every planned part in order
    async fn transfer_parts(
        &self,
        candidate: &UploadCandidate,
        url: &str,
        upload_id: &str,
        plan: PartPlan,
    ) -> Result<Vec<PartTag>> {
        let mut tags = Vec::new();
        for range in plan {
            let bytes = with_retry(&self.retry, "download_range", || {
                self.drive.download_range(url, range.from, range.to)
            })
            .await
            .with_context(|| format!("Range download failed for part {}", range.part_number))?;

            let tag = with_retry(&self.retry, "upload_part", || {
                let bytes = bytes.clone();
                self.store
                    .upload_part(&candidate.key, upload_id, range.part_number, bytes)
            })
            .await
            .with_context(|| format!("Part upload failed for part {}", range.part_number))?;

            tags.push(tag);
        }
        Ok(tags)
    }

    /// Aborts the given upload, waiting for the result so no in-flight
    /// upload outlives the reported outcome
    ///
    /// An abort that still fails after retries is logged, not propagated;
    /// the transfer error it accompanies is the one the caller reports.
    async fn abort_upload(&self, candidate: &UploadCandidate, upload_id: &str) {
        let aborted = with_retry(&self.retry, "abort_multipart", || {
            self.store.abort_multipart(&candidate.key, upload_id)
        })
        .await;
        if let Err(e) = aborted {
            warn!(
                key = candidate.key.as_str(),
                upload_id,
                error = format!("{e:#}"),
                "Failed to abort multipart upload"
            );
        }
    }
}
