//! Shared test helpers for Graph adapter integration tests
//!
//! Provides wiremock-based mock server setup for the Microsoft Graph
//! endpoints the adapter talks to.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use drivesink_core::domain::AccessToken;
use drivesink_graph::client::GraphClient;

/// Starts a mock server and returns it with a client pointed at it.
pub async fn setup_server() -> (MockServer, GraphClient) {
    let server = MockServer::start().await;
    let client = GraphClient::with_base_url(server.uri());
    (server, client)
}

/// A fixed access token for requests against the mock server.
pub fn test_token() -> AccessToken {
    AccessToken::new("test-access-token")
}

/// Mounts a delta endpoint that returns a single page with the given items.
pub async fn mount_delta_single_page(
    server: &MockServer,
    items: serde_json::Value,
    delta_token: &str,
) {
    Mock::given(method("GET"))
        .and(path("/me/drive/root/delta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": items,
            "@odata.deltaLink": format!(
                "{}/me/drive/root/delta?token={}",
                server.uri(),
                delta_token
            )
        })))
        .mount(server)
        .await;
}
