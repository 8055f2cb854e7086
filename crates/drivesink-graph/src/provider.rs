//! [`IDriveProvider`] implementation backed by Microsoft Graph
//!
//! Glues the HTTP client, token manager, delta query, and download modules
//! into the port the sync engine consumes. A token is acquired from the
//! manager per operation; token errors propagate inside the `anyhow` chain
//! so the orchestrator can recover the typed
//! [`TokenError`](drivesink_core::domain::TokenError) by downcasting.

use std::sync::Arc;

use anyhow::Result;
use drivesink_core::domain::{AccessToken, DeltaCursor};
use drivesink_core::ports::{DeltaBatch, IDriveProvider, ITokenProvider};

use crate::client::GraphClient;
use crate::{delta, download};

/// Drive provider backed by the Microsoft Graph API
pub struct GraphDriveProvider {
    client: GraphClient,
    tokens: Arc<dyn ITokenProvider>,
}

impl GraphDriveProvider {
    /// Creates a new provider
    pub fn new(client: GraphClient, tokens: Arc<dyn ITokenProvider>) -> Self {
        Self { client, tokens }
    }

    async fn token(&self) -> Result<AccessToken> {
        Ok(self.tokens.access_token().await?)
    }
}

#[async_trait::async_trait]
impl IDriveProvider for GraphDriveProvider {
    async fn fetch_changes(&self, cursor: Option<&DeltaCursor>) -> Result<DeltaBatch> {
        let token = self.token().await?;
        delta::fetch_delta(&self.client, &token, cursor).await
    }

    async fn download_url(&self, item_id: &str) -> Result<String> {
        let token = self.token().await?;
        download::resolve_download_url(&self.client, &token, item_id).await
    }

    async fn download(&self, item_id: &str) -> Result<Vec<u8>> {
        let token = self.token().await?;
        download::download(&self.client, &token, item_id).await
    }

    async fn download_range(&self, url: &str, from: u64, to: u64) -> Result<Vec<u8>> {
        download::download_range(&self.client, url, from, to).await
    }
}
