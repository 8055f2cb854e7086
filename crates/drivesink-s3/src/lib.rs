//! DriveSink S3 - destination bucket adapter
//!
//! Implements the [`IObjectStore`](drivesink_core::ports::IObjectStore)
//! port against Amazon S3 via the AWS SDK.
//!
//! ## Modules
//!
//! - [`bucket`] - `BucketStore`, the S3-backed object store

pub mod bucket;
