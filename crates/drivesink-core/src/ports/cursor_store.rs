//! Delta cursor persistence port
//!
//! The cursor is the orchestrator's only durable state. Loss or
//! corruption is recoverable by design: an unreadable cursor loads as
//! `None`, which simply triggers a full resync on the next cycle.

use crate::domain::newtypes::DeltaCursor;

/// Port trait for durable cursor storage
///
/// Mutated exclusively by the orchestrator's single-threaded driver,
/// never by reconciliation workers.
#[async_trait::async_trait]
pub trait ICursorStore: Send + Sync {
    /// Loads the persisted cursor
    ///
    /// Returns `None` when no cursor exists *or* when the persisted
    /// value is unreadable or invalid; corruption is never fatal.
    async fn load(&self) -> Option<DeltaCursor>;

    /// Durably stores `cursor`
    ///
    /// Called only after an entire batch has been reconciled.
    async fn save(&self, cursor: &DeltaCursor) -> anyhow::Result<()>;

    /// Removes the persisted cursor, forcing a full resync
    async fn clear(&self) -> anyhow::Result<()>;
}
