//! Content download operations
//!
//! Two download paths exist:
//!
//! - Small files are fetched whole via `GET /me/drive/items/{id}/content`
//! - Large files are streamed part by part: a short-lived pre-signed
//!   download URL is resolved once, then byte ranges are fetched from it
//!   with `Range` headers. Pre-signed URLs embed their own authorization,
//!   so ranged requests carry no bearer token.

use anyhow::{Context, Result};
use drivesink_core::domain::AccessToken;
use reqwest::{header::RANGE, Method, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::client::GraphClient;

/// Item metadata response carrying the pre-signed download URL
#[derive(Debug, Deserialize)]
struct DownloadUrlResponse {
    #[serde(rename = "@microsoft.graph.downloadUrl")]
    download_url: Option<String>,
}

/// Resolves a short-lived pre-signed content download URL for an item
///
/// # Arguments
/// * `client` - The Graph HTTP client
/// * `token` - A valid access token
/// * `item_id` - The drive item to resolve
pub async fn resolve_download_url(
    client: &GraphClient,
    token: &AccessToken,
    item_id: &str,
) -> Result<String> {
    let path = format!("/me/drive/items/{item_id}?select=id,@microsoft.graph.downloadUrl");
    debug!(item_id, "Resolving download URL");

    let response: DownloadUrlResponse = client
        .request(Method::GET, &path, token)
        .send()
        .await
        .context("Failed to request download URL")?
        .error_for_status()
        .context("Download URL request returned error status")?
        .json()
        .await
        .context("Failed to parse download URL response")?;

    response
        .download_url
        .with_context(|| format!("Item {item_id} has no download URL"))
}

/// Downloads an item's full content
///
/// The Graph API answers `GET /items/{id}/content` with a redirect to the
/// pre-signed URL; reqwest follows it automatically.
pub async fn download(client: &GraphClient, token: &AccessToken, item_id: &str) -> Result<Vec<u8>> {
    let path = format!("/me/drive/items/{item_id}/content");
    debug!(item_id, "Downloading full content");

    let response = client
        .request(Method::GET, &path, token)
        .send()
        .await
        .context("Failed to send download request")?
        .error_for_status()
        .context("Download request returned error status")?;

    let bytes = response
        .bytes()
        .await
        .context("Failed to read download response body")?;

    debug!(item_id, bytes = bytes.len(), "Download complete");
    Ok(bytes.to_vec())
}

/// Downloads the inclusive byte range `from..=to` from a pre-signed URL
pub async fn download_range(
    client: &GraphClient,
    url: &str,
    from: u64,
    to: u64,
) -> Result<Vec<u8>> {
    debug!(from, to, "Downloading byte range");

    let response = client
        .http_client()
        .get(url)
        .header(RANGE, format!("bytes={from}-{to}"))
        .send()
        .await
        .context("Failed to send ranged download request")?;

    // Servers that ignore Range answer 200 with the full body, which would
    // silently corrupt part assembly.
    if response.status() != StatusCode::PARTIAL_CONTENT {
        anyhow::bail!(
            "Ranged download returned {} instead of 206 Partial Content",
            response.status()
        );
    }

    let bytes = response
        .bytes()
        .await
        .context("Failed to read ranged download body")?;

    let expected = (to - from + 1) as usize;
    if bytes.len() != expected {
        anyhow::bail!(
            "Ranged download returned {} bytes, expected {}",
            bytes.len(),
            expected
        );
    }

    Ok(bytes.to_vec())
}
