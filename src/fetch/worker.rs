// src/fetch/worker.rs
// =============================================================================
// The fetch worker
//
// One call = one remote file brought to disk, end to end:
//
// 1. If the destination already exists, report Skipped. Presence on disk is
//    the whole resume story - no manifest, no database.
// 2. Take a token from the admission gate. The token is held for the entire
//    transfer, which is what "at most N in flight" actually means.
// 3. Stream the body into `<dest>.part`, then rename into place. A crash or
//    a dropped connection can only ever leave a .part behind, never a
//    truncated file under the real name.
// 4. On error: delete the .part, wait attempt * base, try again. After the
//    last attempt, report Failed and let the caller carry on.
// =============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Serialize;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

use crate::config::RunConfig;

/// What happened to one file. Failures are data here, not errors - a run
/// keeps going and tallies them up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    /// Destination already existed; no request was made.
    Skipped,
    /// Fetched, written, renamed into place.
    Downloaded,
    /// Every attempt failed; nothing exists under the destination name.
    Failed,
}

/// Fetch one remote file to `dest`, within the retry budget.
///
/// `gate` bounds how many transfers run at once; the token is acquired
/// after the skip check (a skip costs nothing) and held until the file is
/// in place or given up on.
pub async fn download_file(
    client: &Client,
    url: &Url,
    dest: &Path,
    gate: &Semaphore,
    config: &RunConfig,
) -> FetchOutcome {
    // A file already on disk is final - this is what makes reruns cheap
    if fs::try_exists(dest).await.unwrap_or(false) {
        debug!("already present: {}", dest.display());
        return FetchOutcome::Skipped;
    }

    if let Some(parent) = dest.parent() {
        if let Err(e) = fs::create_dir_all(parent).await {
            warn!("could not create {}: {e}", parent.display());
            return FetchOutcome::Failed;
        }
    }

    // Admission token; held across every attempt for this file
    let _permit = match gate.acquire().await {
        Ok(permit) => permit,
        Err(_) => return FetchOutcome::Failed, // gate closed, run is shutting down
    };

    for attempt in 1..=config.retry_budget {
        match attempt_download(client, url, dest, config.chunk_size).await {
            Ok(()) => {
                debug!("downloaded {}", dest.display());
                if !config.per_fetch_delay.is_zero() {
                    tokio::time::sleep(config.per_fetch_delay).await;
                }
                return FetchOutcome::Downloaded;
            }
            Err(e) => {
                debug!(
                    "attempt {}/{} for {} failed: {:#}",
                    attempt, config.retry_budget, url, e
                );
                if attempt < config.retry_budget {
                    tokio::time::sleep(backoff_delay(config.retry_base_delay, attempt)).await;
                }
            }
        }
    }

    warn!(
        "{} failed after {} attempts (source: {})",
        dest.display(),
        config.retry_budget,
        url
    );
    FetchOutcome::Failed
}

/// One attempt: GET, stream to `<dest>.part`, rename into place.
async fn attempt_download(
    client: &Client,
    url: &Url,
    dest: &Path,
    chunk_size: usize,
) -> Result<()> {
    let mut response = client.get(url.clone()).send().await?;

    let status = response.status();
    if !status.is_success() {
        bail!("HTTP {status}");
    }

    let part = part_path(dest);

    match write_body(&mut response, &part, chunk_size).await {
        Ok(()) => {
            // The rename is the commit point; until here the real name
            // does not exist
            fs::rename(&part, dest)
                .await
                .with_context(|| format!("moving {} into place", part.display()))?;
            Ok(())
        }
        Err(e) => {
            // A half-written .part must not outlive the attempt
            let _ = fs::remove_file(&part).await;
            Err(e)
        }
    }
}

/// Stream the response body to the temp file, chunk by chunk.
async fn write_body(
    response: &mut reqwest::Response,
    part: &Path,
    chunk_size: usize,
) -> Result<()> {
    let file = fs::File::create(part)
        .await
        .with_context(|| format!("creating {}", part.display()))?;
    let mut writer = BufWriter::with_capacity(chunk_size, file);

    while let Some(chunk) = response.chunk().await? {
        writer.write_all(&chunk).await?;
    }

    writer.flush().await?;
    Ok(())
}

/// Linear backoff: wait `base * attempt` before the next try, so a flaky
/// server sees 500ms, then 1s, then 1.5s between hits.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * attempt
}

/// The in-progress name for a destination: `<dest>.part`.
fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why is the permit bound to `_permit` and not `_`?
//    - Binding to a name keeps the value alive until the function returns
//    - A bare `_` drops it on the spot, releasing the slot immediately,
//      and the gate would bound nothing
//    - The leading underscore only silences the unused-variable warning
//
// 2. Why stream with chunk() instead of bytes()?
//    - bytes().await buffers the entire body in memory first
//    - chunk() hands over pieces as they arrive, so memory use stays flat
//      whether the file is 40 KB or 400 MB
//
// 3. Why write to `<dest>.part` and rename at the end?
//    - rename within a directory is atomic on every OS we care about
//    - Anything under the final name is therefore complete; a crash can
//      only ever leave a .part behind
//    - That is what lets the skip check trust bare file existence
//
// 4. Why does this return FetchOutcome instead of Result?
//    - A file that fails its attempts is an expected, countable event
//    - Returning data means no caller can accidentally abort a 10,000-file
//      run with a stray ?
// -----------------------------------------------------------------------------

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DiscSelection, RunConfig};
    use std::path::PathBuf;

    fn quick_config() -> RunConfig {
        let mut config = RunConfig::new(
            "http://127.0.0.1:9/",
            PathBuf::from("unused"),
            DiscSelection::Single(1),
            2,
            1,
            64 * 1024,
        )
        .unwrap();
        config.retry_base_delay = Duration::from_millis(1);
        config
    }

    #[test]
    fn test_backoff_grows_linearly_with_the_attempt_number() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(1500));
    }

    #[test]
    fn test_part_path_appends_to_the_full_name() {
        assert_eq!(
            part_path(Path::new("out/disc1/images/00001.jpg")),
            PathBuf::from("out/disc1/images/00001.jpg.part")
        );
        assert_eq!(
            part_path(Path::new("metadata_7")),
            PathBuf::from("metadata_7.part")
        );
    }

    #[test]
    fn test_outcome_serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_value(FetchOutcome::Downloaded).unwrap(),
            serde_json::json!("downloaded")
        );
        assert_eq!(
            serde_json::to_value(FetchOutcome::Skipped).unwrap(),
            serde_json::json!("skipped")
        );
    }

    #[tokio::test]
    async fn test_existing_destination_is_skipped_without_a_request() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("00001.jpg");
        fs::write(&dest, b"already here").await.unwrap();

        // Port 9 has no listener; if a request were made this would fail,
        // but the skip check runs first
        let client = Client::new();
        let gate = Semaphore::new(1);
        let url = Url::parse("http://127.0.0.1:9/images/00001.jpg").unwrap();

        let outcome = download_file(&client, &url, &dest, &gate, &quick_config()).await;

        assert_eq!(outcome, FetchOutcome::Skipped);
        assert_eq!(fs::read(&dest).await.unwrap(), b"already here");
    }

    #[tokio::test]
    async fn test_unreachable_server_yields_failed_and_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("00002.jpg");

        let client = Client::new();
        let gate = Semaphore::new(1);
        let url = Url::parse("http://127.0.0.1:9/images/00002.jpg").unwrap();

        let outcome = download_file(&client, &url, &dest, &gate, &quick_config()).await;

        assert_eq!(outcome, FetchOutcome::Failed);
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }
}
