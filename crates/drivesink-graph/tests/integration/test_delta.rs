//! Delta query integration tests

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use drivesink_core::domain::DeltaCursor;
use drivesink_graph::delta::fetch_delta;

use crate::common::{mount_delta_single_page, setup_server, test_token};

#[tokio::test]
async fn test_fetch_delta_single_page() {
    let (server, client) = setup_server().await;

    mount_delta_single_page(
        &server,
        serde_json::json!([
            {
                "id": "item-1",
                "name": "notes.txt",
                "size": 512,
                "lastModifiedDateTime": "2025-06-15T10:30:00Z",
                "parentReference": { "path": "/drive/root:" },
                "file": {}
            }
        ]),
        "cursor-1",
    )
    .await;

    let batch = fetch_delta(&client, &test_token(), None).await.unwrap();

    assert_eq!(batch.entries.len(), 1);
    assert_eq!(batch.entries[0].id, "item-1");
    assert_eq!(batch.entries[0].path, Some("/notes.txt".to_string()));
    assert_eq!(batch.cursor.as_str(), "cursor-1");
}

#[tokio::test]
async fn test_fetch_delta_follows_pagination() {
    let (server, client) = setup_server().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/root/delta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                {
                    "id": "page1-item",
                    "name": "a.txt",
                    "size": 10,
                    "lastModifiedDateTime": "2025-06-15T10:00:00Z",
                    "parentReference": { "path": "/drive/root:" },
                    "file": {}
                }
            ],
            "@odata.nextLink": format!("{}/delta-page-2", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/delta-page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                {
                    "id": "page2-item",
                    "name": "b.txt",
                    "size": 20,
                    "lastModifiedDateTime": "2025-06-15T11:00:00Z",
                    "parentReference": { "path": "/drive/root:/Sub" },
                    "file": {}
                }
            ],
            "@odata.deltaLink": format!("{}/me/drive/root/delta?token=final-cursor", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    let batch = fetch_delta(&client, &test_token(), None).await.unwrap();

    // Both pages flattened into one batch, cursor from the last page.
    assert_eq!(batch.entries.len(), 2);
    assert_eq!(batch.entries[0].id, "page1-item");
    assert_eq!(batch.entries[1].id, "page2-item");
    assert_eq!(batch.entries[1].path, Some("/Sub/b.txt".to_string()));
    assert_eq!(batch.cursor.as_str(), "final-cursor");
}

#[tokio::test]
async fn test_fetch_delta_sends_cursor() {
    let (server, client) = setup_server().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/root/delta"))
        .and(query_param("token", "prev-cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [],
            "@odata.deltaLink": format!("{}/me/drive/root/delta?token=next-cursor", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cursor = DeltaCursor::new("prev-cursor".to_string()).unwrap();
    let batch = fetch_delta(&client, &test_token(), Some(&cursor))
        .await
        .unwrap();

    assert!(batch.entries.is_empty());
    assert_eq!(batch.cursor.as_str(), "next-cursor");
}

#[tokio::test]
async fn test_fetch_delta_expired_cursor_surfaces_410() {
    let (server, client) = setup_server().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/root/delta"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let cursor = DeltaCursor::new("stale".to_string()).unwrap();
    let err = fetch_delta(&client, &test_token(), Some(&cursor))
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("410 Gone"));
}

#[tokio::test]
async fn test_fetch_delta_mixed_entry_kinds() {
    let (server, client) = setup_server().await;

    mount_delta_single_page(
        &server,
        serde_json::json!([
            {
                "id": "f-1",
                "name": "doc.pdf",
                "size": 2048,
                "lastModifiedDateTime": "2025-06-15T10:30:00Z",
                "parentReference": { "path": "/drive/root:/Docs" },
                "file": {}
            },
            {
                "id": "d-1",
                "name": "Docs",
                "size": 0,
                "lastModifiedDateTime": "2025-06-15T09:00:00Z",
                "parentReference": { "path": "/drive/root:" },
                "folder": { "childCount": 1 }
            },
            {
                "id": "del-1",
                "name": "gone.txt",
                "deleted": {}
            }
        ]),
        "mixed-cursor",
    )
    .await;

    let batch = fetch_delta(&client, &test_token(), None).await.unwrap();
    assert_eq!(batch.entries.len(), 3);

    // Only the plain file survives candidate projection.
    let candidates: Vec<_> = batch
        .entries
        .iter()
        .filter_map(|e| e.to_candidate(None))
        .collect();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].key.as_str(), "Docs/doc.pdf");
}
