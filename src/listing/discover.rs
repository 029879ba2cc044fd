// src/listing/discover.rs
// =============================================================================
// Directory discovery
//
// Turning a directory URL into the list of files it holds takes two tries:
// the bare URL with its trailing slash usually serves an auto-generated
// listing, but a handful of discs only answer on an explicit index.html.
// We fetch the first candidate that yields any links and scrape that.
//
// Also lives here: the image-file filter (which listing entries are worth
// downloading) and the URL -> local file name mapping.
// =============================================================================

use anyhow::{bail, Result};
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::config::RunConfig;
use crate::listing::scrape::extract_listing_links;

/// File extensions (lowercase, with dot) that count as pill photographs.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tif", ".tiff", ".webp",
];

/// List the entries of a remote directory.
///
/// Tries the bare directory URL first, then `index.html` inside it. Hrefs
/// from either page are resolved against the directory itself, so both
/// candidates produce the same absolute URLs. Returns an empty Vec when
/// neither candidate could be fetched or neither contained any links.
pub async fn list_directory(client: &Client, dir_url: &Url, config: &RunConfig) -> Vec<Url> {
    let index_url = match dir_url.join("index.html") {
        Ok(url) => url,
        Err(_) => return Vec::new(),
    };

    for candidate in [dir_url.clone(), index_url] {
        let Some(html) = fetch_listing_html(client, &candidate, config).await else {
            continue;
        };

        let links = extract_listing_links(&html, dir_url);
        if !links.is_empty() {
            return links;
        }

        debug!("listing at {candidate} fetched but contained no links");
    }

    Vec::new()
}

/// Fetch one listing page as text, retrying within the configured budget.
///
/// Listing pages are small, so there's no streaming here - but they sit on
/// the same flaky server as everything else, so they get the same retry
/// treatment. Returns None once the budget is spent.
async fn fetch_listing_html(client: &Client, url: &Url, config: &RunConfig) -> Option<String> {
    for attempt in 1..=config.retry_budget {
        match try_fetch_html(client, url).await {
            Ok(html) => return Some(html),
            Err(e) => {
                debug!(
                    "listing fetch {}/{} for {} failed: {:#}",
                    attempt, config.retry_budget, url, e
                );
                if attempt < config.retry_budget {
                    tokio::time::sleep(config.retry_base_delay * attempt).await;
                }
            }
        }
    }
    None
}

/// One fetch attempt: GET the page, insist on a success status, read the body.
async fn try_fetch_html(client: &Client, url: &Url) -> Result<String> {
    let response = client.get(url.clone()).send().await?;

    let status = response.status();
    if !status.is_success() {
        bail!("HTTP {status}");
    }

    Ok(response.text().await?)
}

/// Keep only the listing entries that are image files.
///
/// A sub-directory link ends with a slash; everything else is judged by the
/// extension of its URL path, case-insensitively and ignoring any query
/// string. Order is preserved.
pub fn image_file_urls(links: &[Url]) -> Vec<Url> {
    links.iter().filter(|url| is_image_file(url)).cloned().collect()
}

fn is_image_file(url: &Url) -> bool {
    let path = url.path();

    // Trailing slash means directory, not file
    if path.ends_with('/') {
        return false;
    }

    let lower = path.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// The local file name for a URL: its last path segment, verbatim.
///
/// Percent-encoding is kept as-is; a name that round-trips back into the
/// URL is worth more here than a pretty one. Returns None for URLs whose
/// path ends in a slash.
pub fn file_name_of(url: &Url) -> Option<String> {
    let name = url.path_segments()?.last()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why does list_directory try two URLs?
//    - Most discs answer the bare images/ URL with an auto-generated page
//    - A few only respond on a literal index.html file
//    - Both carry the same anchors, so the first non-empty result wins
//
// 2. Why return Option<String> from the fetch instead of Result?
//    - Once both candidates are exhausted, "server broke" and "page does
//      not exist" look the same from here and the caller reacts the same
//      way: warn and move on with an empty listing
//    - The individual errors were already logged as they happened
//
// 3. Why filter on url.path() rather than the whole URL?
//    - A query string ("photo.jpg?preview=1") would hide the extension
//      from a plain ends_with on the full string
//    - path() also makes the trailing-slash directory test reliable
//
// 4. Why lowercase before the extension check?
//    - The archive mixes "00001.JPG" and "00001.jpg" across discs
//    - Lowercasing the path once beats carrying both spellings in the
//      extension table
// -----------------------------------------------------------------------------

// =============================================================================
// TESTS
// =============================================================================
