//! Alerting port
//!
//! A minimal seam to the out-of-scope notifier (an email collaborator
//! in the reference deployment). Used exactly once per halt: when the
//! provider rejects the refresh token and the sync loop stops until a
//! human re-authorizes.
//!
//! ## Design Notes
//!
//! - Fire-and-forget: delivery failures are the sink's problem and must
//!   never propagate into the orchestrator.

/// Port trait for raising operator alerts
#[async_trait::async_trait]
pub trait IAlertSink: Send + Sync {
    /// Delivers a single alert message to the operator channel
    async fn notify(&self, message: &str);
}
