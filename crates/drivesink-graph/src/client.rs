//! Microsoft Graph API HTTP client
//!
//! Thin wrapper over `reqwest::Client` that handles base URL construction
//! and bearer authentication. Credentials are passed per request because
//! access tokens rotate underneath long-lived clients.

use std::time::Duration;

use drivesink_core::domain::AccessToken;
use reqwest::{Client, Method, RequestBuilder};

/// Base URL for Microsoft Graph API v1.0
const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// HTTP client for Microsoft Graph API calls
///
/// Wraps `reqwest::Client` with base URL construction for the Microsoft
/// Graph API. The same client is reused across all requests so connection
/// pooling applies.
pub struct GraphClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: String,
}

impl GraphClient {
    /// Creates a new GraphClient with the given per-request timeout
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: GRAPH_BASE_URL.to_string(),
        })
    }

    /// Creates a new GraphClient with a custom base URL (useful for testing)
    ///
    /// # Arguments
    /// * `base_url` - Custom base URL for API requests
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Automatically prepends the base URL and adds the Authorization header.
    ///
    /// # Arguments
    /// * `method` - HTTP method (GET, POST, PUT, DELETE, etc.)
    /// * `path` - API path relative to base URL (e.g., "/me/drive/root/delta")
    /// * `token` - Access token for the Authorization header
    pub fn request(&self, method: Method, path: &str, token: &AccessToken) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(token.secret())
    }

    /// Creates an authenticated request builder for an absolute URL
    ///
    /// Used for URLs the API hands back whole, such as `@odata.nextLink`
    /// pagination links.
    pub fn request_absolute(
        &self,
        method: Method,
        url: &str,
        token: &AccessToken,
    ) -> RequestBuilder {
        self.client.request(method, url).bearer_auth(token.secret())
    }

    /// Returns a reference to the underlying reqwest Client
    ///
    /// Useful for making unauthenticated requests to pre-signed download URLs.
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
