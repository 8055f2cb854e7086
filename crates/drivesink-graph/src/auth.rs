//! OAuth2 PKCE authentication flow for Microsoft Graph API
//!
//! Implements the Authorization Code flow with PKCE (RFC 7636) for
//! authenticating native applications with the Microsoft identity platform.
//!
//! ## Components
//!
//! - [`OAuthConfig`] - Configuration for the OAuth2 flow
//! - [`PkceFlow`] - OAuth2 PKCE challenge/exchange/refresh logic
//! - [`LocalCallbackServer`] - Minimal HTTP server for the OAuth redirect
//! - [`FileTokenStore`] - JSON-file token persistence
//! - [`GraphAuthenticator`] - Orchestrates the interactive login flow

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use drivesink_core::domain::TokenError;
use drivesink_core::ports::{ITokenStore, TokenSet};
use oauth2::basic::BasicErrorResponseType;
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, CsrfToken, EndpointNotSet,
    EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError,
    Scope, TokenResponse, TokenUrl,
};
use tracing::{debug, info, warn};

/// Default Microsoft OAuth2 authorization endpoint (consumers tenant)
const AUTH_URL: &str = "https://login.microsoftonline.com/consumers/oauth2/v2.0/authorize";

/// Default Microsoft OAuth2 token endpoint (consumers tenant)
const TOKEN_URL: &str = "https://login.microsoftonline.com/consumers/oauth2/v2.0/token";

/// Fallback access token lifetime when the response omits `expires_in`
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

// ============================================================================
// OAuthConfig
// ============================================================================

/// Configuration for the OAuth2 PKCE authentication flow
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Application (client) ID from the Azure AD app registration
    pub app_id: String,
    /// Redirect URI for receiving the authorization code
    pub redirect_uri: String,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token endpoint URL
    pub token_url: String,
}

impl OAuthConfig {
    /// Creates a new OAuthConfig with the given app_id, redirect URI, and scopes
    pub fn new(
        app_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            redirect_uri: redirect_uri.into(),
            scopes,
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Overrides the token endpoint URL (useful for testing)
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Overrides the authorization endpoint URL (useful for testing)
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }
}

// ============================================================================
// PkceFlow
// ============================================================================

/// OAuth2 PKCE flow implementation using the `oauth2` crate
///
/// Handles generating authorization URLs with PKCE challenges,
/// exchanging authorization codes for tokens, and refreshing tokens.
pub struct PkceFlow {
    client: BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    http_client: reqwest::Client,
    scopes: Vec<String>,
}

impl PkceFlow {
    /// Creates a new PkceFlow from the given configuration
    pub fn new(config: &OAuthConfig) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.app_id.clone()))
            .set_auth_uri(
                AuthUrl::new(config.auth_url.clone()).context("Invalid authorization URL")?,
            )
            .set_token_uri(TokenUrl::new(config.token_url.clone()).context("Invalid token URL")?)
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_uri.clone()).context("Invalid redirect URI")?,
            );

        Ok(Self {
            client,
            http_client: reqwest::Client::new(),
            scopes: config.scopes.clone(),
        })
    }

    /// Generates an authorization URL with a PKCE challenge
    ///
    /// # Returns
    /// A tuple of `(authorization_url, csrf_token, pkce_verifier)`.
    /// The `pkce_verifier` must be kept until the code exchange step.
    pub fn generate_auth_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = self.client.authorize_url(CsrfToken::new_random);

        for scope in &self.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token) = auth_request.set_pkce_challenge(pkce_challenge).url();

        debug!("Generated authorization URL");
        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchanges an authorization code for a token set
    ///
    /// # Arguments
    /// * `code` - The authorization code received from the callback
    /// * `pkce_verifier` - The PKCE verifier generated alongside the auth URL
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<TokenSet> {
        info!("Exchanging authorization code for tokens");

        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http_client)
            .await
            .context("Failed to exchange authorization code")?;

        let refresh_token = token_result
            .refresh_token()
            .map(|t| t.secret().to_string())
            .context("Token response did not include a refresh token; is offline_access granted?")?;

        Ok(TokenSet {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token,
            expires_at: expires_at_from(token_result.expires_in()),
        })
    }

    /// Refreshes an expired access token using a refresh token
    ///
    /// Returns the typed [`TokenError`] so the caller can distinguish a
    /// fatal provider rejection (e.g. `invalid_grant` on a revoked or
    /// expired refresh token) from a transient transport failure.
    ///
    /// When the provider rotates the refresh token, the returned set
    /// carries the new one; otherwise the previous refresh token is kept.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, TokenError> {
        info!("Refreshing access token");

        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(classify_refresh_error)?;

        Ok(TokenSet {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result
                .refresh_token()
                .map(|t| t.secret().to_string())
                .unwrap_or_else(|| refresh_token.to_string()),
            expires_at: expires_at_from(token_result.expires_in()),
        })
    }
}

/// Computes an absolute expiry timestamp from an `expires_in` duration
fn expires_at_from(expires_in: Option<std::time::Duration>) -> chrono::DateTime<Utc> {
    expires_in
        .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
        .unwrap_or_else(|| Utc::now() + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS))
}

/// Maps an `oauth2` refresh failure onto the domain token error taxonomy
///
/// An `invalid_grant` or `invalid_client` error response means the
/// provider will never accept this refresh token again; everything else
/// is worth retrying.
fn classify_refresh_error<RE>(
    err: RequestTokenError<RE, oauth2::StandardErrorResponse<BasicErrorResponseType>>,
) -> TokenError
where
    RE: std::error::Error + 'static,
{
    match err {
        RequestTokenError::ServerResponse(resp) => match resp.error() {
            BasicErrorResponseType::InvalidGrant | BasicErrorResponseType::InvalidClient => {
                let detail = resp
                    .error_description()
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| resp.error().to_string());
                TokenError::Rejected(detail)
            }
            other => TokenError::Transport(format!("token endpoint error: {other}")),
        },
        RequestTokenError::Request(e) => TokenError::Transport(e.to_string()),
        RequestTokenError::Parse(e, _) => {
            TokenError::Transport(format!("unparseable token response: {e}"))
        }
        RequestTokenError::Other(msg) => TokenError::Transport(msg),
    }
}

// ============================================================================
// LocalCallbackServer
// ============================================================================

/// Minimal HTTP server that listens on localhost for the OAuth2 redirect callback.
///
/// Binds the host and port of the configured redirect URI, waits for the
/// OAuth provider to redirect the user's browser back with an authorization
/// code, responds with a small HTML page, and shuts down.
pub struct LocalCallbackServer;

/// Parameters extracted from the OAuth2 callback
#[derive(Debug)]
pub struct CallbackParams {
    /// The authorization code
    pub code: String,
    /// The CSRF state parameter
    pub state: String,
}

impl LocalCallbackServer {
    /// Starts the local callback server and waits for the OAuth redirect
    ///
    /// # Arguments
    /// * `redirect_uri` - The configured redirect URI; its host and port
    ///   determine the bind address
    ///
    /// # Returns
    /// The callback parameters (code and state) extracted from the redirect URL
    pub async fn start(redirect_uri: &str) -> Result<CallbackParams> {
        use http_body_util::Full;
        use hyper::body::Bytes;
        use hyper::server::conn::http1;
        use hyper::service::service_fn;
        use hyper::{Request, Response, StatusCode};
        use hyper_util::rt::TokioIo;
        use tokio::net::TcpListener;
        use tokio::sync::oneshot;

        let addr = bind_address(redirect_uri)?;
        info!("Starting local OAuth callback server on {}", addr);

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind callback server to {addr}"))?;

        let (tx, rx) = oneshot::channel::<CallbackParams>();
        let tx = std::sync::Arc::new(tokio::sync::Mutex::new(Some(tx)));

        // Accept a single connection
        let (stream, _addr) = listener
            .accept()
            .await
            .context("Failed to accept connection on callback server")?;

        let io = TokioIo::new(stream);
        let tx_clone = tx.clone();

        let service = service_fn(move |req: Request<hyper::body::Incoming>| {
            let tx_inner = tx_clone.clone();
            async move {
                let uri = req.uri().to_string();
                debug!("Callback server received request: {}", uri);

                match parse_callback_params(&uri) {
                    Some(callback_params) => {
                        if let Some(sender) = tx_inner.lock().await.take() {
                            let _ = sender.send(callback_params);
                        }

                        Ok::<_, hyper::Error>(
                            Response::builder()
                                .status(StatusCode::OK)
                                .header("Content-Type", "text/html; charset=utf-8")
                                .body(Full::new(Bytes::from(success_html())))
                                .unwrap(),
                        )
                    }
                    None => Ok(Response::builder()
                        .status(StatusCode::BAD_REQUEST)
                        .header("Content-Type", "text/html; charset=utf-8")
                        .body(Full::new(Bytes::from(error_html(
                            "Missing authorization code in callback",
                        ))))
                        .unwrap()),
                }
            }
        });

        // Serve the single connection
        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                warn!("Callback server connection error: {}", e);
            }
        });

        let params = rx
            .await
            .context("Callback server channel closed without receiving parameters")?;

        info!("Received OAuth callback with authorization code");
        Ok(params)
    }
}

/// Derives the bind address (`host:port`) from a redirect URI
fn bind_address(redirect_uri: &str) -> Result<String> {
    let url = url::Url::parse(redirect_uri).context("Invalid redirect URI")?;
    let host = url.host_str().context("Redirect URI has no host")?;
    let port = url.port().context("Redirect URI has no explicit port")?;
    Ok(format!("{host}:{port}"))
}

/// Parses the authorization code and state from a callback URI
fn parse_callback_params(uri: &str) -> Option<CallbackParams> {
    let url = url::Url::parse(&format!("http://localhost{uri}")).ok()?;
    let mut code = None;
    let mut state = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            _ => {}
        }
    }

    Some(CallbackParams {
        code: code?,
        state: state.unwrap_or_default(),
    })
}

/// Returns the HTML for a successful authentication page
fn success_html() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>DriveSink - Authentication Successful</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authentication Successful</h1>
    <p>DriveSink is now authorized to read your drive.</p>
    <p>You can close this window.</p>
    <script>setTimeout(function() { window.close(); }, 3000);</script>
</body>
</html>"#
        .to_string()
}

/// Returns the HTML for an authentication error page
fn error_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>DriveSink - Authentication Error</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authentication Error</h1>
    <p>{message}</p>
    <p>Please close this window and try again.</p>
</body>
</html>"#
    )
}

// ============================================================================
// FileTokenStore
// ============================================================================

/// Persists the OAuth token set as a JSON file on disk
///
/// The file survives daemon restarts, so an authorized installation keeps
/// syncing without user interaction. Written via a temporary sibling file
/// and rename so a crash mid-write never leaves a truncated token file.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Creates a store backed by the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl ITokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<TokenSet>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => {
                let tokens: TokenSet =
                    serde_json::from_str(&json).context("Failed to parse stored token file")?;
                debug!(path = %self.path.display(), "Loaded token set");
                Ok(Some(tokens))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read token file")),
        }
    }

    async fn save(&self, tokens: &TokenSet) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create token directory")?;
        }

        let json = serde_json::to_string_pretty(tokens).context("Failed to serialize tokens")?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .context("Failed to write token file")?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .context("Failed to move token file into place")?;

        debug!(path = %self.path.display(), "Saved token set");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "Cleared stored token set");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to remove token file")),
        }
    }
}

// ============================================================================
// GraphAuthenticator
// ============================================================================

/// Orchestrates the full interactive OAuth2 PKCE login flow
///
/// 1. Generates a PKCE-secured authorization URL
/// 2. Opens the user's browser to the Microsoft login page
/// 3. Starts a local callback server to receive the redirect
/// 4. Exchanges the authorization code for a token set
pub struct GraphAuthenticator {
    config: OAuthConfig,
}

impl GraphAuthenticator {
    /// Creates a new authenticator with the given configuration
    pub fn new(config: OAuthConfig) -> Self {
        Self { config }
    }

    /// Performs the full interactive login flow
    ///
    /// # Returns
    /// The obtained token set on successful authentication
    pub async fn login(&self) -> Result<TokenSet> {
        info!("Starting OAuth2 PKCE login flow");

        let flow = PkceFlow::new(&self.config)?;

        let (auth_url, _csrf_token, pkce_verifier) = flow.generate_auth_url();

        info!("Opening browser for authentication");
        webbrowser::open(&auth_url).context("Failed to open browser for authentication")?;

        let callback = LocalCallbackServer::start(&self.config.redirect_uri).await?;

        let tokens = flow.exchange_code(callback.code, pkce_verifier).await?;

        info!("OAuth2 PKCE login completed successfully");
        Ok(tokens)
    }

    /// Returns a reference to the current configuration
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> OAuthConfig {
        OAuthConfig::new(
            "test-app-id",
            "http://127.0.0.1:8400/callback",
            vec!["Files.Read".to_string(), "offline_access".to_string()],
        )
    }

    #[test]
    fn test_oauth_config_defaults_to_microsoft_endpoints() {
        let config = test_config();
        assert!(config.auth_url.contains("login.microsoftonline.com"));
        assert!(config.token_url.contains("login.microsoftonline.com"));
    }

    #[test]
    fn test_oauth_config_endpoint_overrides() {
        let config = test_config()
            .with_auth_url("http://localhost:9000/authorize")
            .with_token_url("http://localhost:9000/token");
        assert_eq!(config.auth_url, "http://localhost:9000/authorize");
        assert_eq!(config.token_url, "http://localhost:9000/token");
    }

    #[test]
    fn test_pkce_flow_generates_auth_url() {
        let flow = PkceFlow::new(&test_config()).unwrap();
        let (url, _csrf, _verifier) = flow.generate_auth_url();

        assert!(url.contains("login.microsoftonline.com"));
        assert!(url.contains("test-app-id"));
        assert!(url.contains("code_challenge"));
        assert!(url.contains("offline_access"));
    }

    #[test]
    fn test_bind_address_from_redirect_uri() {
        let addr = bind_address("http://127.0.0.1:8400/callback").unwrap();
        assert_eq!(addr, "127.0.0.1:8400");
    }

    #[test]
    fn test_bind_address_requires_port() {
        assert!(bind_address("http://127.0.0.1/callback").is_err());
    }

    #[test]
    fn test_parse_callback_params_valid() {
        let uri = "/callback?code=M.C507_SN1.2.abc123&state=xyz789";
        let params = parse_callback_params(uri).unwrap();
        assert_eq!(params.code, "M.C507_SN1.2.abc123");
        assert_eq!(params.state, "xyz789");
    }

    #[test]
    fn test_parse_callback_params_missing_code() {
        assert!(parse_callback_params("/callback?state=xyz789").is_none());
    }

    #[test]
    fn test_parse_callback_params_missing_state() {
        let params = parse_callback_params("/callback?code=abc123").unwrap();
        assert_eq!(params.code, "abc123");
        assert_eq!(params.state, "");
    }

    #[test]
    fn test_success_html_contains_message() {
        let html = success_html();
        assert!(html.contains("Authentication Successful"));
        assert!(html.contains("DriveSink"));
    }

    #[test]
    fn test_error_html_contains_message() {
        let html = error_html("test error message");
        assert!(html.contains("test error message"));
        assert!(html.contains("Authentication Error"));
    }

    #[tokio::test]
    async fn test_file_token_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("tokens.json"));

        assert!(store.load().await.unwrap().is_none());

        let tokens = TokenSet {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        store.save(&tokens).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "access");
        assert_eq!(loaded.refresh_token, "refresh");

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_token_store_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("tokens.json"));
        store.clear().await.unwrap();
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_token_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let store = FileTokenStore::new(path);
        assert!(store.load().await.is_err());
    }
}
