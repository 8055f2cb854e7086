//! Content download integration tests

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use drivesink_graph::download::{download, download_range, resolve_download_url};

use crate::common::{setup_server, test_token};

#[tokio::test]
async fn test_resolve_download_url() {
    let (server, client) = setup_server().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/items/item-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "item-1",
            "@microsoft.graph.downloadUrl": "https://files.example/abc?tempauth=xyz"
        })))
        .mount(&server)
        .await;

    let url = resolve_download_url(&client, &test_token(), "item-1")
        .await
        .unwrap();
    assert_eq!(url, "https://files.example/abc?tempauth=xyz");
}

#[tokio::test]
async fn test_resolve_download_url_missing_field() {
    let (server, client) = setup_server().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/items/item-2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "item-2" })),
        )
        .mount(&server)
        .await;

    let err = resolve_download_url(&client, &test_token(), "item-2")
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("no download URL"));
}

#[tokio::test]
async fn test_download_full_content() {
    let (server, client) = setup_server().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/items/item-1/content"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello world".to_vec()))
        .mount(&server)
        .await;

    let bytes = download(&client, &test_token(), "item-1").await.unwrap();
    assert_eq!(bytes, b"hello world");
}

#[tokio::test]
async fn test_download_range_sends_range_header() {
    let (server, client) = setup_server().await;

    Mock::given(method("GET"))
        .and(path("/content/abc"))
        .and(header("Range", "bytes=0-4"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(b"hello".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/content/abc", server.uri());
    let bytes = download_range(&client, &url, 0, 4).await.unwrap();
    assert_eq!(bytes, b"hello");
}

#[tokio::test]
async fn test_download_range_rejects_full_response() {
    let (server, client) = setup_server().await;

    // A server that ignores Range and sends the whole body back.
    Mock::given(method("GET"))
        .and(path("/content/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 100]))
        .mount(&server)
        .await;

    let url = format!("{}/content/abc", server.uri());
    let err = download_range(&client, &url, 0, 9).await.unwrap_err();
    assert!(format!("{err:#}").contains("206"));
}

#[tokio::test]
async fn test_download_range_rejects_short_body() {
    let (server, client) = setup_server().await;

    Mock::given(method("GET"))
        .and(path("/content/abc"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(b"abc".to_vec()))
        .mount(&server)
        .await;

    let url = format!("{}/content/abc", server.uri());
    let err = download_range(&client, &url, 0, 9).await.unwrap_err();
    assert!(format!("{err:#}").contains("expected 10"));
}
