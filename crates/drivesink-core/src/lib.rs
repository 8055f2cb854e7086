//! Core domain logic and ports for Drivesink
//!
//! Drivesink mirrors a personal cloud drive one way into an S3 bucket.
//! This crate holds everything adapter-independent:
//!
//! - [`domain`] - validated newtypes, the upload-decision data model,
//!   and the error taxonomy
//! - [`ports`] - traits implemented by the Graph and S3 adapters plus
//!   the persistence and alerting seams
//! - [`config`] - typed YAML configuration with defaults and validation
//!
//! The crate performs no I/O of its own.

pub mod config;
pub mod domain;
pub mod ports;
