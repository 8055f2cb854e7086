//! Domain model for the delta-reconciliation engine
//!
//! Contains validated newtypes, the upload-decision data model, and the
//! error taxonomy. Port-level DTOs (raw provider data) live in
//! [`crate::ports`]; everything here has been validated.

pub mod chunk;
pub mod entry;
pub mod errors;
pub mod newtypes;

pub use chunk::{PartPlan, PartRange};
pub use entry::{ReconcileOutcome, RemoteObjectMeta, TransferKind, UploadCandidate};
pub use errors::{DomainError, TokenError};
pub use newtypes::{AccessToken, DeltaCursor, ObjectKey};
