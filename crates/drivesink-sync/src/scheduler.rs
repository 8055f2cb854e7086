//! Fixed-interval polling loop
//!
//! Wraps the orchestrator in a tokio interval. Cycle failures are logged
//! and the loop keeps ticking; a halted orchestrator ends the loop with
//! an error so the process exits visibly rather than idling forever.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::engine::{CycleOutcome, DeltaOrchestrator};

/// Runs sync cycles at a fixed interval until cancelled or halted
pub struct PollScheduler {
    orchestrator: Arc<DeltaOrchestrator>,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl PollScheduler {
    /// Creates a scheduler around the orchestrator
    pub fn new(
        orchestrator: Arc<DeltaOrchestrator>,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            orchestrator,
            poll_interval,
            cancel,
        }
    }

    /// Runs the polling loop
    ///
    /// The first cycle starts immediately. Returns `Ok(())` on
    /// cancellation and an error if the orchestrator halted.
    pub async fn run(&self) -> Result<()> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        // A long cycle must not be followed by a burst of catch-up ticks.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "Sync scheduler started"
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Shutdown requested, stopping scheduler");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    match self.orchestrator.run_cycle().await {
                        Ok(CycleOutcome::Completed(_)) => {}
                        Ok(CycleOutcome::SkippedNotAuthorized) => {
                            warn!("Cycle skipped: not authorized");
                        }
                        Ok(CycleOutcome::Halted) => {
                            error!("Orchestrator halted, stopping scheduler");
                            anyhow::bail!(
                                "sync halted: refresh token rejected, re-authorization required"
                            );
                        }
                        Err(err) => {
                            error!(error = format!("{err:#}"), "Sync cycle failed");
                        }
                    }
                }
            }
        }
    }
}
