//! Cycle orchestration: fetch delta, reconcile, persist cursor
//!
//! [`DeltaOrchestrator`] drives one sync cycle end to end. Each cycle
//! moves through the phases fetch, reconcile, persist-cursor; the cursor
//! is written only after every entry in the batch has reached a terminal
//! outcome, so a crash mid-batch refetches the same batch rather than
//! silently dropping entries.
//!
//! ## Design Notes
//!
//! - An expired delta cursor (410 Gone from the feed) is recovered
//!   in-cycle: the stored cursor is cleared and the cycle restarts as a
//!   full enumeration. Expensive, never incorrect.
//! - A rejected refresh token halts the orchestrator permanently and
//!   raises exactly one operator alert; every other token failure skips
//!   the cycle and the loop keeps polling.
//! - `Failed` reconcile outcomes are terminal for cursor purposes: the
//!   cursor advances past them and the entry is retried when the drive
//!   next reports it changed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use drivesink_core::domain::{ReconcileOutcome, TokenError};
use drivesink_core::ports::{IAlertSink, ICursorStore, IDriveProvider, ITokenProvider};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::reconcile::Reconciler;

// ============================================================================
// Cycle state
// ============================================================================

/// Phase of the orchestrator, observable for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Between cycles
    Idle,
    /// Fetching the change delta from the drive
    Fetching,
    /// Reconciling the fetched batch against the bucket
    Reconciling,
    /// Writing the resume cursor
    PersistingCursor,
    /// Stopped permanently after a rejected refresh token
    Halted,
}

/// Per-cycle counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Raw delta entries in the batch, including folders and deletions
    pub entries: usize,
    /// Candidates uploaded (single or multipart)
    pub uploaded: usize,
    /// Candidates probed and found already in sync
    pub skipped: usize,
    /// Entries that can never be candidates: folders, deletions, and
    /// entries missing a path, size, or modification time
    pub filtered: usize,
    /// Candidates that failed after exhausting retries
    pub failed: usize,
    /// Whether an expired cursor was cleared during this cycle
    pub cursor_cleared: bool,
}

/// Result of one orchestrated cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The cycle ran to completion and the cursor was persisted
    Completed(CycleReport),
    /// No stored token set; the cycle was skipped without fetching
    SkippedNotAuthorized,
    /// The orchestrator is halted and will not run further cycles
    Halted,
}

// ============================================================================
// DeltaOrchestrator
// ============================================================================

/// Runs sync cycles against the drive and bucket ports
pub struct DeltaOrchestrator {
    drive: Arc<dyn IDriveProvider>,
    tokens: Arc<dyn ITokenProvider>,
    reconciler: Arc<Reconciler>,
    cursor_store: Arc<dyn ICursorStore>,
    alerts: Arc<dyn IAlertSink>,
    key_prefix: Option<String>,
    workers: usize,
    halted: AtomicBool,
    phase: Mutex<SyncPhase>,
}

impl DeltaOrchestrator {
    /// Creates a new orchestrator
    ///
    /// `workers` bounds how many files reconcile concurrently within a
    /// cycle; parts of one file always transfer sequentially.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        drive: Arc<dyn IDriveProvider>,
        tokens: Arc<dyn ITokenProvider>,
        reconciler: Arc<Reconciler>,
        cursor_store: Arc<dyn ICursorStore>,
        alerts: Arc<dyn IAlertSink>,
        key_prefix: Option<String>,
        workers: usize,
    ) -> Self {
        Self {
            drive,
            tokens,
            reconciler,
            cursor_store,
            alerts,
            key_prefix,
            workers: workers.max(1),
            halted: AtomicBool::new(false),
            phase: Mutex::new(SyncPhase::Idle),
        }
    }

    /// Current phase
    pub fn phase(&self) -> SyncPhase {
        self.phase.lock().map(|g| *g).unwrap_or(SyncPhase::Halted)
    }

    /// Whether the orchestrator has halted permanently
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    fn set_phase(&self, phase: SyncPhase) {
        if let Ok(mut guard) = self.phase.lock() {
            *guard = phase;
        }
    }

    /// Runs one complete sync cycle
    ///
    /// Returns `Err` only for cycle-level failures the caller should log
    /// and retry next tick; halt and authorization states are expressed
    /// in [`CycleOutcome`].
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        if self.is_halted() {
            return Ok(CycleOutcome::Halted);
        }

        // Probe the token up front so an unauthorized or rejected
        // credential is diagnosed before any fetch work starts.
        match self.tokens.access_token().await {
            Ok(_) => {}
            Err(TokenError::NotAuthorized) => {
                warn!("No stored token set; run the login flow to authorize. Skipping cycle");
                return Ok(CycleOutcome::SkippedNotAuthorized);
            }
            Err(err) if err.is_fatal() => {
                self.halt(&err.to_string()).await;
                return Ok(CycleOutcome::Halted);
            }
            Err(err) => {
                return Err(anyhow::Error::new(err).context("Token acquisition failed"));
            }
        }

        self.set_phase(SyncPhase::Fetching);
        let cursor = self.cursor_store.load().await;
        let mut report = CycleReport::default();

        let batch = match self.drive.fetch_changes(cursor.as_ref()).await {
            Ok(batch) => batch,
            Err(err) => {
                if let Some(tok) = err.chain().find_map(|c| c.downcast_ref::<TokenError>()) {
                    if tok.is_fatal() {
                        let reason = tok.to_string();
                        self.halt(&reason).await;
                        return Ok(CycleOutcome::Halted);
                    }
                }
                if cursor.is_some() && is_cursor_expired(&err) {
                    warn!("Delta cursor expired; clearing and refetching from scratch");
                    self.cursor_store
                        .clear()
                        .await
                        .context("Failed to clear expired cursor")?;
                    report.cursor_cleared = true;
                    self.drive
                        .fetch_changes(None)
                        .await
                        .context("Full resync fetch failed")?
                } else {
                    self.set_phase(SyncPhase::Idle);
                    return Err(err.context("Delta fetch failed"));
                }
            }
        };

        self.set_phase(SyncPhase::Reconciling);
        report.entries = batch.entries.len();

        let candidates: Vec<_> = batch
            .entries
            .iter()
            .filter_map(|entry| entry.to_candidate(self.key_prefix.as_deref()))
            .collect();
        // Folders, deletions, and incomplete entries produce no write.
        report.filtered = report.entries - candidates.len();

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        for candidate in candidates {
            let semaphore = semaphore.clone();
            let reconciler = self.reconciler.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                reconciler.reconcile(&candidate).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(ReconcileOutcome::Uploaded(_)) => report.uploaded += 1,
                Ok(ReconcileOutcome::Skipped) => report.skipped += 1,
                Ok(ReconcileOutcome::Failed(_)) => report.failed += 1,
                Err(join_err) => {
                    warn!(error = %join_err, "Reconcile task panicked");
                    report.failed += 1;
                }
            }
        }

        self.set_phase(SyncPhase::PersistingCursor);
        if report.failed > 0 {
            // Failed entries are terminal for this batch; they come back
            // the next time the drive reports them changed.
            warn!(
                failed = report.failed,
                "Persisting cursor with failed entries in the batch"
            );
        }
        self.cursor_store
            .save(&batch.cursor)
            .await
            .context("Failed to persist delta cursor")?;

        self.set_phase(SyncPhase::Idle);
        info!(
            entries = report.entries,
            uploaded = report.uploaded,
            skipped = report.skipped,
            filtered = report.filtered,
            failed = report.failed,
            "Sync cycle complete"
        );
        Ok(CycleOutcome::Completed(report))
    }

    /// Halts the orchestrator and raises the single operator alert
    async fn halt(&self, reason: &str) {
        if self.halted.swap(true, Ordering::SeqCst) {
            return;
        }
        self.set_phase(SyncPhase::Halted);
        error!(reason, "Refresh token rejected; sync halted until re-authorization");
        self.alerts
            .notify(&format!(
                "Sync halted: {reason}. Re-run the login flow to authorize."
            ))
            .await;
    }
}

/// Whether an error chain indicates an expired delta cursor
///
/// The drive adapter surfaces feed-side cursor expiry as an error
/// mentioning `410 Gone`.
fn is_cursor_expired(err: &anyhow::Error) -> bool {
    let text = format!("{err:#}").to_lowercase();
    text.contains("410") && text.contains("gone")
}
