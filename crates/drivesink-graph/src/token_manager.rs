//! Access token lifecycle manager
//!
//! Owns the single in-memory copy of the OAuth token set and refreshes it
//! transparently when callers ask for an access token near expiry.
//!
//! ## Design Notes
//!
//! - Single-flight refresh: the token set lives behind a `tokio::sync::Mutex`
//!   that is held across the refresh request. Concurrent callers queue on
//!   the lock and observe the already-refreshed set, so N simultaneous
//!   requests against an expired token produce exactly one refresh call.
//! - A rejected refresh token clears both the in-memory set and the
//!   persisted file, so a restart does not retry a dead credential.

use std::sync::Arc;

use chrono::Duration;
use drivesink_core::domain::{AccessToken, TokenError};
use drivesink_core::ports::{ITokenProvider, ITokenStore, TokenSet};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::PkceFlow;

/// Default attempts against the token endpoint per refresh
const DEFAULT_REFRESH_ATTEMPTS: u32 = 3;

/// Manages the OAuth token set and serves valid access tokens
pub struct TokenManager {
    flow: PkceFlow,
    store: Arc<dyn ITokenStore>,
    refresh_margin: Duration,
    refresh_attempts: u32,
    refresh_base_delay: std::time::Duration,
    current: Mutex<Option<TokenSet>>,
}

impl TokenManager {
    /// Creates a new manager
    ///
    /// # Arguments
    /// * `flow` - PKCE flow used for refresh requests
    /// * `store` - Durable token persistence
    /// * `refresh_margin` - Tokens expiring within this margin are
    ///   refreshed proactively
    pub fn new(flow: PkceFlow, store: Arc<dyn ITokenStore>, refresh_margin: Duration) -> Self {
        Self {
            flow,
            store,
            refresh_margin,
            refresh_attempts: DEFAULT_REFRESH_ATTEMPTS,
            refresh_base_delay: std::time::Duration::from_secs(1),
            current: Mutex::new(None),
        }
    }

    /// Overrides the transport-retry schedule for refresh requests
    pub fn with_refresh_backoff(
        mut self,
        attempts: u32,
        base_delay: std::time::Duration,
    ) -> Self {
        self.refresh_attempts = attempts.max(1);
        self.refresh_base_delay = base_delay;
        self
    }

    /// Installs a freshly obtained token set (e.g. after interactive login)
    /// and persists it
    pub async fn install(&self, tokens: TokenSet) -> Result<(), TokenError> {
        self.store
            .save(&tokens)
            .await
            .map_err(|e| TokenError::Storage(e.to_string()))?;
        *self.current.lock().await = Some(tokens);
        info!("Installed new token set");
        Ok(())
    }

    /// Refreshes the locked-in token set, replacing it atomically
    ///
    /// Must be called with the `current` lock held; `tokens` is the set
    /// observed under that same lock.
    async fn refresh_locked(
        &self,
        guard: &mut Option<TokenSet>,
        refresh_token: String,
    ) -> Result<AccessToken, TokenError> {
        let mut attempt = 0;
        loop {
            match self.flow.refresh(&refresh_token).await {
                Ok(new_set) => {
                    self.store
                        .save(&new_set)
                        .await
                        .map_err(|e| TokenError::Storage(e.to_string()))?;
                    let token = AccessToken::new(new_set.access_token.clone());
                    *guard = Some(new_set);
                    debug!("Access token refreshed");
                    return Ok(token);
                }
                Err(TokenError::Rejected(msg)) => {
                    warn!("Refresh token rejected by provider: {}", msg);
                    *guard = None;
                    if let Err(e) = self.store.clear().await {
                        warn!("Failed to clear stored token set: {:#}", e);
                    }
                    return Err(TokenError::Rejected(msg));
                }
                // Transient endpoint trouble is retried with doubling
                // delay before it surfaces as a cycle-level error.
                Err(TokenError::Transport(msg)) => {
                    if attempt + 1 >= self.refresh_attempts {
                        return Err(TokenError::Transport(msg));
                    }
                    let delay = self.refresh_base_delay * 2u32.saturating_pow(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Token endpoint unreachable, retrying: {}",
                        msg
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait::async_trait]
impl ITokenProvider for TokenManager {
    async fn access_token(&self) -> Result<AccessToken, TokenError> {
        let mut guard = self.current.lock().await;

        if guard.is_none() {
            *guard = self
                .store
                .load()
                .await
                .map_err(|e| TokenError::Storage(e.to_string()))?;
        }

        let Some(tokens) = guard.as_ref() else {
            return Err(TokenError::NotAuthorized);
        };

        if !tokens.expires_within(self.refresh_margin) {
            return Ok(AccessToken::new(tokens.access_token.clone()));
        }

        let refresh_token = tokens.refresh_token.clone();
        self.refresh_locked(&mut guard, refresh_token).await
    }
}
