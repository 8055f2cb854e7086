//! DriveSink Sync - the delta reconciliation engine
//!
//! Orchestrates one-way incremental mirroring: each cycle fetches the
//! drive's change delta, decides per entry whether the destination bucket
//! already holds the current bytes, uploads what differs, and persists
//! the resume cursor once the whole batch is settled.
//!
//! ## Modules
//!
//! - [`engine`] - [`DeltaOrchestrator`](engine::DeltaOrchestrator), the cycle state machine
//! - [`reconcile`] - per-file probe / upload decision / transfer execution
//! - [`retry`] - bounded exponential backoff for transient failures
//! - [`cursor`] - file-backed cursor persistence
//! - [`scheduler`] - fixed-interval polling loop around the orchestrator

pub mod cursor;
pub mod engine;
pub mod reconcile;
pub mod retry;
pub mod scheduler;
