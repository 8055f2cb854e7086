//! Token lifecycle ports
//!
//! [`TokenSet`] is the persisted OAuth2 state, [`ITokenStore`] its
//! durable storage seam, and [`ITokenProvider`] the interface the
//! orchestrator and drive adapter use to obtain a valid access token.
//!
//! ## Design Notes
//!
//! - The refresh token is a long-lived secret with single-use-rotating
//!   semantics at most providers. Exactly one in-memory copy of the
//!   current set may exist, replaced atomically on refresh; the
//!   implementing manager enforces a single-refresh-in-flight rule.
//! - `ITokenProvider` returns the typed
//!   [`TokenError`](crate::domain::errors::TokenError) rather than
//!   `anyhow::Error` because the orchestrator's halt-vs-continue
//!   decision hangs on the variant.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::TokenError;
use crate::domain::newtypes::AccessToken;

// ============================================================================
// TokenSet
// ============================================================================

/// OAuth2 token pair with expiry, as persisted between restarts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    /// Bearer token for authenticating API requests
    pub access_token: String,
    /// Token for refreshing the access token without user interaction
    pub refresh_token: String,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
}

impl TokenSet {
    /// Returns true if the access token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns true if the access token expires within `margin`
    ///
    /// The manager refreshes proactively inside this safety margin so
    /// a token never expires mid-request.
    pub fn expires_within(&self, margin: Duration) -> bool {
        Utc::now() + margin >= self.expires_at
    }
}

// ============================================================================
// ITokenStore / ITokenProvider traits
// ============================================================================

/// Port trait for durable token persistence
#[async_trait::async_trait]
pub trait ITokenStore: Send + Sync {
    /// Loads the stored token set, `None` if none has been saved yet
    async fn load(&self) -> anyhow::Result<Option<TokenSet>>;

    /// Persists `tokens`, replacing any previous set
    async fn save(&self, tokens: &TokenSet) -> anyhow::Result<()>;

    /// Removes the stored token set
    ///
    /// Used when the provider rejects the refresh token, so a restart
    /// does not retry a dead credential.
    async fn clear(&self) -> anyhow::Result<()>;
}

/// Port trait for obtaining a valid access token
#[async_trait::async_trait]
pub trait ITokenProvider: Send + Sync {
    /// Returns an access token valid for at least the configured
    /// safety margin, refreshing transparently when needed
    ///
    /// Concurrent callers during an in-flight refresh wait on that
    /// refresh rather than issuing duplicates.
    async fn access_token(&self) -> Result<AccessToken, TokenError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_set(expires_in_secs: i64) -> TokenSet {
        TokenSet {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
        }
    }

    #[test]
    fn test_expiry_checks() {
        let fresh = token_set(3600);
        assert!(!fresh.is_expired());
        assert!(!fresh.expires_within(Duration::minutes(5)));
        assert!(fresh.expires_within(Duration::hours(2)));

        let stale = token_set(-10);
        assert!(stale.is_expired());
        assert!(stale.expires_within(Duration::minutes(5)));
    }

    #[test]
    fn test_token_set_json_roundtrip() {
        let set = token_set(600);
        let json = serde_json::to_string(&set).unwrap();
        let back: TokenSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.access_token, set.access_token);
        assert_eq!(back.refresh_token, set.refresh_token);
        assert_eq!(back.expires_at, set.expires_at);
    }
}
