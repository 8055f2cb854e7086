//! Microsoft Graph Delta API for incremental change detection
//!
//! Implements the delta query pattern for OneDrive, which returns only the
//! items that changed since the last query.
//!
//! ## Delta Query Flow
//!
//! 1. **Initial sync**: Call [`fetch_delta`] with `cursor = None` to enumerate
//!    all items
//! 2. **Follow pages**: The function automatically follows `@odata.nextLink`
//!    pages and flattens them into a single batch
//! 3. **Save cursor**: The returned [`DeltaBatch`] carries the cursor taken
//!    from the final page's `@odata.deltaLink`
//! 4. **Incremental sync**: Call [`fetch_delta`] with the saved cursor to get
//!    only changes
//!
//! A `410 Gone` response means the cursor has expired server-side; the error
//! message carries the status so the caller can clear the cursor and restart
//! with a full enumeration.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use drivesink_core::domain::{AccessToken, DeltaCursor};
use drivesink_core::ports::{DeltaBatch, DeltaEntry};
use reqwest::Method;
use serde::Deserialize;
use tracing::debug;

use crate::client::GraphClient;

/// Path for the delta endpoint relative to the Graph API base URL
const DELTA_PATH: &str = "/me/drive/root/delta";

// ============================================================================
// Microsoft Graph API response types (JSON deserialization)
// ============================================================================

/// Raw response from the Microsoft Graph delta API
///
/// Represents the JSON structure returned by `GET /me/drive/root/delta`.
/// See: <https://learn.microsoft.com/en-us/graph/api/driveitem-delta>
#[derive(Debug, Deserialize)]
struct GraphDeltaResponse {
    /// Array of changed drive items
    #[serde(default)]
    value: Vec<GraphDriveItem>,

    /// URL for the next page of results (present when more pages exist)
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,

    /// URL containing the delta token for the next sync cycle
    /// (present only on the last page of results)
    #[serde(rename = "@odata.deltaLink")]
    delta_link: Option<String>,
}

/// A drive item from the Microsoft Graph delta response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDriveItem {
    /// Unique identifier of the item within the drive
    id: String,

    /// Name of the item (filename or folder name)
    #[serde(default)]
    name: String,

    /// Size of the item in bytes (only for files)
    size: Option<u64>,

    /// Last modified date and time in ISO 8601 format
    last_modified_date_time: Option<DateTime<Utc>>,

    /// Reference to the parent item
    parent_reference: Option<GraphParentReference>,

    /// File facet (present if the item is a file)
    file: Option<GraphFileFacet>,

    /// Folder facet (present if the item is a folder)
    folder: Option<GraphFolderFacet>,

    /// Deleted facet (present if the item has been deleted)
    deleted: Option<GraphDeletedFacet>,
}

/// Parent reference information for a drive item
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphParentReference {
    /// URL-decoded path of the parent in the drive
    /// Format: `/drive/root:/path/to/parent`
    path: Option<String>,
}

/// File facet indicating the item is a file
#[derive(Debug, Deserialize)]
struct GraphFileFacet {}

/// Folder facet indicating the item is a folder
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphFolderFacet {
    /// Number of immediate children in the folder
    #[allow(dead_code)]
    child_count: Option<u64>,
}

/// Deleted facet indicating the item has been deleted
#[derive(Debug, Deserialize)]
struct GraphDeletedFacet {
    /// Reason or state of deletion (often absent)
    #[allow(dead_code)]
    state: Option<String>,
}

// ============================================================================
// DeltaParser - converts Graph API responses to port-level types
// ============================================================================

/// Parser for converting Microsoft Graph delta responses into port-level types
pub struct DeltaParser;

impl DeltaParser {
    /// Parse a single Graph API drive item into a port-level [`DeltaEntry`]
    ///
    /// - Determines folder / deletion status from the respective facets
    /// - Strips the `/drive/root:` prefix from the parent path and appends
    ///   the item name to form the full drive-relative path
    fn parse_item(item: GraphDriveItem) -> DeltaEntry {
        let is_deleted = item.deleted.is_some();
        let is_folder = item.folder.is_some();

        let path = item
            .parent_reference
            .as_ref()
            .and_then(|pr| pr.path.as_ref())
            .map(|p| Self::normalize_parent_path(p, &item.name));

        DeltaEntry {
            id: item.id,
            name: item.name,
            path,
            size: item.size,
            last_modified: item.last_modified_date_time,
            is_deleted,
            is_folder,
        }
    }

    /// Normalize a parent path from Graph API format to a clean path
    ///
    /// The Graph API returns parent paths like `/drive/root:/Documents`.
    /// This strips the `/drive/root:` prefix and appends the item name to
    /// produce `/Documents/filename.txt`. A parent of exactly
    /// `/drive/root:` yields `/<item_name>`.
    fn normalize_parent_path(parent_path: &str, item_name: &str) -> String {
        let stripped = if let Some(rest) = parent_path.strip_prefix("/drive/root:") {
            if rest.is_empty() {
                "/".to_string()
            } else {
                rest.to_string()
            }
        } else {
            parent_path.to_string()
        };

        if stripped == "/" {
            format!("/{item_name}")
        } else {
            format!("{stripped}/{item_name}")
        }
    }

    /// Extract the delta token value from a delta link URL
    ///
    /// The delta link is a full URL like:
    /// `https://graph.microsoft.com/v1.0/me/drive/root/delta?token=...`
    pub fn extract_delta_token(delta_link: &str) -> Option<String> {
        url::Url::parse(delta_link).ok().and_then(|u| {
            u.query_pairs()
                .find(|(key, _)| key == "token")
                .map(|(_, value)| value.into_owned())
        })
    }
}

// ============================================================================
// Delta query functions
// ============================================================================

/// Fetches all delta changes since `cursor`, following pagination
///
/// Makes the initial delta request and follows all `@odata.nextLink` pages
/// until the final page with `@odata.deltaLink` is reached. The entries of
/// every page are flattened into one batch so the caller advances its
/// cursor only across whole cycles, never mid-page.
///
/// # Arguments
///
/// * `client` - The Graph HTTP client
/// * `token` - A valid access token
/// * `cursor` - Cursor from a previous sync, `None` for a full enumeration
///
/// # Errors
///
/// - A `410 Gone` status produces an error mentioning `410 Gone`, which the
///   orchestrator treats as cursor expiry
/// - Any other HTTP failure, non-success status, or malformed JSON is an
///   ordinary error
pub async fn fetch_delta(
    client: &GraphClient,
    token: &AccessToken,
    cursor: Option<&DeltaCursor>,
) -> Result<DeltaBatch> {
    let path = match cursor {
        Some(c) => format!("{}?token={}", DELTA_PATH, c.as_str()),
        None => DELTA_PATH.to_string(),
    };

    debug!(has_cursor = cursor.is_some(), "Starting delta query");

    let mut entries = Vec::new();
    let mut delta_link = None;

    let mut page = fetch_page(client, token, &path, false).await?;
    let mut page_count: u32 = 1;

    loop {
        debug!(
            page = page_count,
            items = page.value.len(),
            has_next = page.next_link.is_some(),
            "Received delta page"
        );

        entries.extend(page.value.into_iter().map(DeltaParser::parse_item));
        delta_link = page.delta_link.or(delta_link);

        let Some(next_link) = page.next_link else {
            break;
        };
        page_count += 1;
        page = fetch_page(client, token, &next_link, true).await?;
    }

    let delta_link = delta_link.context("Delta response ended without a deltaLink")?;
    let token_value = DeltaParser::extract_delta_token(&delta_link)
        .context("deltaLink did not contain a token parameter")?;
    let cursor = DeltaCursor::new(token_value).context("deltaLink produced an empty cursor")?;

    debug!(
        total_items = entries.len(),
        total_pages = page_count,
        "Delta query complete"
    );

    Ok(DeltaBatch { entries, cursor })
}

/// Fetches a single page of delta results
///
/// `@odata.nextLink` URLs are absolute, so pagination requests bypass the
/// client's base-URL prefixing.
async fn fetch_page(
    client: &GraphClient,
    token: &AccessToken,
    path_or_url: &str,
    absolute: bool,
) -> Result<GraphDeltaResponse> {
    let request = if absolute {
        client.request_absolute(Method::GET, path_or_url, token)
    } else {
        client.request(Method::GET, path_or_url, token)
    };

    let response = request
        .send()
        .await
        .context("Failed to send delta request")?;

    // A 410 means the delta cursor has expired and the caller must perform
    // a full resync without a cursor. Checked before error_for_status so
    // the status survives into the message.
    if response.status() == reqwest::StatusCode::GONE {
        anyhow::bail!("Delta cursor expired (410 Gone)");
    }

    response
        .error_for_status()
        .context("Delta request returned error status")?
        .json()
        .await
        .context("Failed to parse delta response JSON")
}

// ============================================================================
// Tests
// ============================================================================
