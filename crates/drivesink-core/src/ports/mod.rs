//! Ports (driven/secondary interfaces)
//!
//! Traits implemented by the adapter crates. Port methods return
//! `anyhow::Result` because failures at these boundaries are
//! adapter-specific; the one exception is the token lifecycle, whose
//! error variants the orchestrator must branch on (see
//! [`TokenError`](crate::domain::errors::TokenError)).

pub mod alert;
pub mod cursor_store;
pub mod drive_provider;
pub mod object_store;
pub mod token_store;

pub use alert::IAlertSink;
pub use cursor_store::ICursorStore;
pub use drive_provider::{DeltaBatch, DeltaEntry, IDriveProvider};
pub use object_store::{IObjectStore, PartTag};
pub use token_store::{ITokenProvider, ITokenStore, TokenSet};
