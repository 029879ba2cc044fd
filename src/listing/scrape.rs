// src/listing/scrape.rs
// =============================================================================
// HTML listing scraper
//
// A directory listing page is just HTML full of <a href="..."> anchors, one
// per entry. This module parses that HTML and turns every usable href into
// an absolute URL, resolved against the directory the page describes.
//
// "Usable" excludes two kinds of anchors that listing pages love:
// - fragment links ("#top") that navigate within the page
// - query links ("?C=M;O=A") that re-sort the same listing
// Neither names a file, so both are dropped before resolution.
// =============================================================================

use scraper::{Html, Selector};
use url::Url;

/// Extract every file/directory link from a listing page.
///
/// `dir_url` is the URL of the directory the listing describes; relative
/// hrefs are resolved against it, which is why it must end with a slash.
/// Returns absolute http/https URLs in document order.
pub fn extract_listing_links(html: &str, dir_url: &Url) -> Vec<Url> {
    let mut links = Vec::new();

    // Parse the HTML document
    let document = Html::parse_document(html);

    // CSS selector for anchors that actually carry an href.
    // The selector string is a constant, so parse can't fail here.
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return links,
    };

    for element in document.select(&selector) {
        if let Some(href) = element.value().attr("href") {
            if let Some(url) = resolve_href(dir_url, href) {
                links.push(url);
            }
        }
    }

    links
}

/// Resolve one href against the directory URL, or reject it.
fn resolve_href(dir_url: &Url, href: &str) -> Option<Url> {
    // In-page fragments and sort-order links don't name entries
    if href.starts_with('#') || href.starts_with('?') {
        return None;
    }

    // join() handles both relative hrefs ("00001.jpg") and absolute ones
    // ("https://mirror.example/00001.jpg")
    let url = dir_url.join(href).ok()?;

    // Only web links; mailto:, javascript: and friends are navigation chrome
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a real HTML parser instead of a regex?
//    - Listing pages are machine-generated but not uniform: attribute
//      order, quoting and nesting all vary between server versions
//    - scraper handles all of that and the selector reads like CSS
//
// 2. Why skip "#…" and "?…" hrefs before resolving?
//    - Both are self-references: fragments scroll, query links re-sort
//    - Resolved, they become the directory URL itself, and a fetch of
//      that would download the listing page as if it were a file
//
// 3. Why return Url values instead of Strings?
//    - Callers filter on paths and derive file names from segments
//    - Keeping the parsed form means nobody re-parses downstream
// -----------------------------------------------------------------------------

// =============================================================================
// TESTS
// =============================================================================
