// src/fetch/client.rs
// =============================================================================
// HTTP client construction
//
// One client is built per run and shared by every fetch, so connection
// pooling actually happens. The archive sits behind an anti-bot layer that
// rejects bare library user agents, so the default headers imitate a real
// browser visit: a desktop Chrome UA, an HTML-first Accept line, and a
// Referer pointing at the archive root.
//
// Timeouts are split on purpose. A total-request deadline would kill any
// image that legitimately takes minutes on a slow day; instead we bound
// how long a connection may take to open and how long a read may stall.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER, USER_AGENT};
use reqwest::redirect;
use reqwest::Client;

use crate::config::RunConfig;

/// Desktop Chrome user agent; the archive serves 403s to obvious scripts.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36";

/// Browser-style Accept header, HTML preferred.
const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// How long a TCP connection may take to establish.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long a single read may stall before the attempt is abandoned.
const READ_TIMEOUT: Duration = Duration::from_secs(120);

/// Redirect ceiling; listings occasionally bounce through one hop.
const MAX_REDIRECTS: usize = 5;

/// Build the shared HTTP client for a run.
pub fn build_client(config: &RunConfig) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));

    // Referer follows the configured base, so runs against a mirror don't
    // claim to come from the real archive
    let referer = HeaderValue::from_str(config.base_url.as_str())
        .context("base URL is not a valid Referer header value")?;
    headers.insert(REFERER, referer);

    let client = Client::builder()
        .default_headers(headers)
        .connect_timeout(CONNECT_TIMEOUT)
        .read_timeout(READ_TIMEOUT)
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
        .build()
        .context("building HTTP client")?;

    Ok(client)
}

// =============================================================================
// TESTS
// =============================================================================
