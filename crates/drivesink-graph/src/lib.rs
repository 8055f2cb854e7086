//! DriveSink Graph - Microsoft Graph API client
//!
//! Provides the drive-side adapters:
//! - OAuth2 authentication (Authorization Code with PKCE)
//! - Access token lifecycle with transparent refresh
//! - Delta queries for incremental change detection
//! - Content download (full and ranged)
//!
//! ## Modules
//!
//! - [`auth`] - OAuth2 PKCE authentication flow components
//! - [`client`] - Microsoft Graph API HTTP client
//! - [`delta`] - Delta queries for incremental synchronization
//! - [`download`] - Content download operations
//! - [`provider`] - [`IDriveProvider`](drivesink_core::ports::IDriveProvider) implementation
//! - [`token_manager`] - Single-flight token refresh manager

pub mod auth;
pub mod client;
pub mod delta;
pub mod download;
pub mod provider;
pub mod token_manager;
