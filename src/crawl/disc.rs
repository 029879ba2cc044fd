// src/crawl/disc.rs
// =============================================================================
// One disc, start to finish
//
// A disc is one numbered directory on the archive with a fixed internal
// shape: an XML metadata export next to an images/ sub-directory. Crawling
// it means:
//
// 1. Make the local directories.
// 2. Fetch the metadata - from inside the disc if possible, from the
//    shared ALLXML/ directory when the disc itself doesn't carry it.
// 3. List images/ and keep the entries that are image files.
// 4. Work out which of those are already on disk, submit the rest all at
//    once, and drain completions as they land. The admission gate (not
//    the submission) is what bounds parallelism.
//
// Nothing in here aborts on a bad file. Failures go into the report and
// the disc finishes with whatever it could get.
// =============================================================================

use std::collections::HashSet;

use anyhow::{Context, Result};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::config::RunConfig;
use crate::fetch::{download_file, FetchOutcome};
use crate::listing;

/// Print a progress line after this many completions.
const PROGRESS_EVERY: usize = 30;

/// What one disc crawl accomplished.
#[derive(Debug, Serialize)]
pub struct DiscReport {
    /// Disc number.
    pub disc: u32,
    /// How the metadata fetch ended (after the fallback, if it came to that).
    pub metadata: FetchOutcome,
    /// Distinct image files the listing advertised.
    pub images_found: usize,
    /// Images actually fetched this run.
    pub downloaded: usize,
    /// Images that were already on disk.
    pub skipped: usize,
    /// File names that failed every attempt.
    pub failed: Vec<String>,
}

impl DiscReport {
    /// True when nothing on this disc was left behind.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.metadata != FetchOutcome::Failed
    }
}

/// Crawl one disc: metadata, discovery, then the missing images.
///
/// `gate` is the run-wide admission gate shared by every disc. Only local
/// filesystem problems (directory creation) are hard errors; remote
/// failures are tallied in the report.
pub async fn crawl_disc(
    client: &Client,
    gate: &Semaphore,
    config: &RunConfig,
    disc: u32,
) -> Result<DiscReport> {
    // images/ sits inside the disc directory, so this creates both
    let images_dir = config.images_dir(disc);
    fs::create_dir_all(&images_dir)
        .await
        .with_context(|| format!("creating {}", images_dir.display()))?;

    println!("\n💿 Disc {disc}");

    let metadata = fetch_metadata(client, config, disc).await?;

    // Discover what the disc holds
    let images_url = config.images_url(disc)?;
    let links = listing::list_directory(client, &images_url, config).await;
    if links.is_empty() {
        println!("  ⚠️  listing empty or unreachable: {images_url}");
        warn!("disc {disc}: empty or unreachable listing at {images_url}");
    }
    let images = listing::image_file_urls(&links);

    // Split the listing into already-have and still-need before spending
    // any bandwidth. Listings routinely name one file through several
    // anchors (icon column, name column, query-string variants); the first
    // anchor claims the destination, so no two workers ever share a .part
    // file.
    let mut claimed = HashSet::new();
    let mut pending = Vec::new();
    let mut already_present = 0usize;
    for url in images {
        let Some(name) = listing::file_name_of(&url) else {
            continue;
        };
        let dest = images_dir.join(&name);
        if !claimed.insert(dest.clone()) {
            continue;
        }
        if fs::try_exists(&dest).await.unwrap_or(false) {
            already_present += 1;
        } else {
            pending.push((name, url, dest));
        }
    }

    let mut report = DiscReport {
        disc,
        metadata,
        images_found: claimed.len(),
        downloaded: 0,
        skipped: already_present,
        failed: Vec::new(),
    };

    println!(
        "  🖼  {} images listed, {} already on disk, {} to fetch",
        report.images_found,
        report.skipped,
        pending.len()
    );

    // Submit everything at once; the gate decides how many actually run.
    // Draining as-completed means one slow image never blocks the tally.
    let total = pending.len();
    let mut tasks: FuturesUnordered<_> = pending
        .iter()
        .map(|(name, url, dest)| async move {
            let outcome = download_file(client, url, dest, gate, config).await;
            (name.as_str(), outcome)
        })
        .collect();

    let mut done = 0usize;
    while let Some((name, outcome)) = tasks.next().await {
        done += 1;
        match outcome {
            FetchOutcome::Downloaded => report.downloaded += 1,
            FetchOutcome::Skipped => report.skipped += 1,
            FetchOutcome::Failed => {
                println!("  ❌ {name}");
                report.failed.push(name.to_string());
            }
        }
        if done % PROGRESS_EVERY == 0 {
            println!("  📦 {done}/{total} handled");
        }
    }
    drop(tasks);

    println!(
        "  ✅ disc {disc} done: {} new, {} skipped, {} failed",
        report.downloaded,
        report.skipped,
        report.failed.len()
    );

    Ok(report)
}

/// Fetch the disc's XML export, falling back to the shared directory.
///
/// Discs burned later in the project stopped carrying their own XML; for
/// those the same file sits in ALLXML/ at the archive root. The local
/// destination is identical either way, so a file already on disk skips
/// both locations.
async fn fetch_metadata(client: &Client, config: &RunConfig, disc: u32) -> Result<FetchOutcome> {
    let (primary, fallback) = config.metadata_urls(disc)?;
    let dest = config.metadata_dest(disc);

    // Metadata is one small file; a gate of one keeps it out of the way
    // of the image transfers
    let gate = Semaphore::new(1);

    let outcome = download_file(client, &primary, &dest, &gate, config).await;
    if outcome != FetchOutcome::Failed {
        return Ok(outcome);
    }

    let outcome = download_file(client, &fallback, &dest, &gate, config).await;
    if outcome == FetchOutcome::Failed {
        println!("  ⚠️  no metadata for disc {disc} in either location");
        warn!("disc {disc}: metadata missing at {primary} and at {fallback}");
    }

    Ok(outcome)
}

// =============================================================================
// BEGINNER NOTES
// =============================================================================
//
// 1. Why FuturesUnordered instead of spawning tasks?
//    Every future here borrows `pending`, the client, and the config from
//    the enclosing function. tokio::spawn would demand 'static futures and
//    force Arc clones of all of it. FuturesUnordered polls the futures in
//    place, so plain references work and completions still arrive in
//    whatever order the network produces them.
//
// 2. Doesn't submitting everything at once hammer the server?
//    No - submission is cheap. Each future immediately parks on
//    gate.acquire() inside download_file, so at most `concurrency` of them
//    hold a connection at any moment. The submitted-but-waiting ones cost
//    a few hundred bytes each.
//
// 3. Why check for existing files here AND in download_file?
//    The check here gives an accurate "N to fetch" line before anything
//    starts. The one inside download_file is what makes the worker safe to
//    call from anywhere (metadata goes through it too, with no pre-check).
//
// 4. Why dedupe by destination path instead of by URL?
//    Two different URLs can name the same file - the icon and name columns
//    of a listing, or a plain href next to its query-string variant. What
//    has to be unique is the path on disk, so that is what gets claimed.
// =============================================================================
