//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the identifiers that cross component
//! boundaries. Each newtype ensures validity at construction time.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// DeltaCursor
// ============================================================================

/// Opaque continuation token for the drive's change-delta feed
///
/// Represents "delta feed position after the last fully-processed
/// batch". Owned exclusively by the orchestrator and persisted only
/// after an entire batch has been reconciled. An absent cursor means
/// full resync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeltaCursor(String);

impl DeltaCursor {
    /// Creates a cursor, rejecting empty or whitespace-only values
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::InvalidCursor(
                "cursor must not be empty".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Returns the cursor value as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DeltaCursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ObjectKey
// ============================================================================

/// Key of an object in the destination bucket
///
/// Derived from a drive-root-relative path: the leading slash is
/// stripped and an optional configured prefix is prepended. Never empty
/// and never starts with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Creates an object key, rejecting empty or absolute values
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DomainError::InvalidObjectKey(
                "key must not be empty".to_string(),
            ));
        }
        if value.starts_with('/') {
            return Err(DomainError::InvalidObjectKey(format!(
                "key must be relative: {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Builds a key from a drive path (`/Photos/img.jpg`) and an
    /// optional bucket prefix (`backup`)
    pub fn from_drive_path(path: &str, prefix: Option<&str>) -> Result<Self, DomainError> {
        let relative = path.trim_start_matches('/');
        if relative.is_empty() {
            return Err(DomainError::InvalidObjectKey(format!(
                "drive path has no key component: {path}"
            )));
        }
        match prefix {
            Some(p) if !p.is_empty() => {
                Self::new(format!("{}/{}", p.trim_end_matches('/'), relative))
            }
            _ => Self::new(relative),
        }
    }

    /// Returns the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// AccessToken
// ============================================================================

/// A bearer access token handed out by the token manager
///
/// The wrapper keeps the secret out of `Display`/`Debug` output so
/// structured logs never leak it.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw access token secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the token secret for use in an Authorization header
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken(***)")
    }
}
