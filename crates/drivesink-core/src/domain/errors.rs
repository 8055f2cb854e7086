//! Domain error types
//!
//! Typed errors for domain validation and for the token lifecycle.
//! Adapter-specific failures travel as `anyhow::Error` at port
//! boundaries; the variants here are the ones the orchestrator must
//! distinguish to pick the right failure semantics.

use thiserror::Error;

/// Errors that can occur in domain validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid object key (empty, or absolute)
    #[error("Invalid object key: {0}")]
    InvalidObjectKey(String),

    /// Invalid delta cursor value
    #[error("Invalid delta cursor: {0}")]
    InvalidCursor(String),

    /// A delta entry cannot become an upload candidate
    #[error("Entry is not uploadable: {0}")]
    NotUploadable(String),

    /// A multipart plan cannot be built for this size and part size
    #[error("Invalid part plan: {0}")]
    InvalidPartPlan(String),
}

/// Errors from the token lifecycle
///
/// The orchestrator branches on these variants:
/// [`Rejected`](TokenError::Rejected) halts the sync loop and raises the
/// single alert; every other variant is cycle-level and the loop keeps
/// running.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The provider rejected the refresh token (expired or revoked).
    /// Fatal to the sync loop; a human must re-run the bootstrap flow.
    #[error("refresh token rejected by provider: {0}")]
    Rejected(String),

    /// Transient failure reaching the token endpoint; the next cycle
    /// retries the refresh.
    #[error("token endpoint unreachable: {0}")]
    Transport(String),

    /// Reading or writing the persisted token set failed
    #[error("token storage error: {0}")]
    Storage(String),

    /// No token set has been stored yet; the bootstrap flow has not run
    #[error("not authorized: no stored token set")]
    NotAuthorized,
}

impl TokenError {
    /// Returns true if this error must halt the sync loop entirely
    pub fn is_fatal(&self) -> bool {
        matches!(self, TokenError::Rejected(_))
    }
}
