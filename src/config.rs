// src/config.rs
// =============================================================================
// This file defines the run configuration: which discs to crawl, where the
// archive lives, where output goes, and the transfer tunables.
//
// Everything here is an explicit value built once from the CLI and passed down
// through the crawl. There are no global knobs - a run can never leak its
// parameters into another run.
//
// This module also owns the layout of the remote archive and of the output
// directory, so the URL/path derivations live in one place and stay
// collision-free: metadata lands in the disc directory, images in its
// images/ subdirectory.
// =============================================================================

use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Where the Pill Project archive lives. Overridable with --base-url
/// (useful for mirrors, required for the integration tests).
pub const DEFAULT_BASE_URL: &str = "https://data.lhncbc.nlm.nih.gov/public/Pills/";

/// Default output root directory.
pub const DEFAULT_OUT_ROOT: &str = "Pills_downloads";

/// How many image downloads may be in flight at once (12-24 works well).
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Attempts per file before giving up on it.
pub const DEFAULT_RETRY_BUDGET: u32 = 3;

/// Disk write granularity in bytes (256 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// The archive currently spans discs 1 through 110; crawl them all when the
/// user doesn't narrow the selection.
pub const DEFAULT_FIRST_DISC: u32 = 1;
pub const DEFAULT_LAST_DISC: u32 = 110;

/// Every disc directory is named PillProjectDisc<id> on the server, and we
/// mirror that name locally.
pub const DISC_DIR_PREFIX: &str = "PillProjectDisc";

/// The per-disc metadata document is MedicosConsultantsExport_<id>.xml.
pub const METADATA_PREFIX: &str = "MedicosConsultantsExport_";

/// Shared flat directory that mirrors every disc's metadata document.
/// Used as the fallback when a disc directory doesn't serve its own XML.
pub const ALLXML_DIR: &str = "ALLXML/";

// Which discs a run should crawl
//
// Exactly one selection is active per run; the CLI maps "no flag given" to
// the default inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscSelection {
    /// Crawl exactly one disc
    Single(u32),
    /// Crawl an inclusive range of discs, in ascending order
    Range(u32, u32),
}

// The full configuration for one run
//
// Built once in main from the CLI arguments, validated before any network
// activity, then threaded down: driver -> disc controller -> fetch worker.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Archive root, always ending with '/' so Url::join treats it as a
    /// directory
    pub base_url: Url,
    /// Local directory that receives the PillProjectDisc<id> trees
    pub out_root: PathBuf,
    /// Which discs to crawl
    pub selection: DiscSelection,
    /// Maximum simultaneous image downloads
    pub concurrency_limit: usize,
    /// Attempts per file (including the first)
    pub retry_budget: u32,
    /// Disk write granularity for streamed downloads, in bytes
    pub chunk_size: usize,
    /// Backoff grows as base * attempt index after each failed attempt
    pub retry_base_delay: Duration,
    /// Optional pause after each successful image fetch (politeness knob,
    /// off by default)
    pub per_fetch_delay: Duration,
}

impl RunConfig {
    // Builds a validated configuration
    //
    // This is the only place configuration errors can abort the run, and it
    // runs before any network activity.
    pub fn new(
        base_url: &str,
        out_root: PathBuf,
        selection: DiscSelection,
        concurrency_limit: usize,
        retry_budget: u32,
        chunk_size: usize,
    ) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;

        match selection {
            DiscSelection::Single(n) => {
                if n == 0 {
                    bail!("disc numbers start at 1, got 0");
                }
            }
            DiscSelection::Range(start, end) => {
                if start == 0 {
                    bail!("disc numbers start at 1, got 0");
                }
                if start > end {
                    bail!("invalid disc range: start {} is after end {}", start, end);
                }
            }
        }

        if concurrency_limit == 0 {
            bail!("concurrency must be at least 1");
        }
        if retry_budget == 0 {
            bail!("retry budget must be at least 1 attempt");
        }
        if chunk_size == 0 {
            bail!("chunk size must be at least 1 byte");
        }

        Ok(Self {
            base_url,
            out_root,
            selection,
            concurrency_limit,
            retry_budget,
            chunk_size,
            retry_base_delay: Duration::from_millis(500),
            per_fetch_delay: Duration::ZERO,
        })
    }

    // Expands the selection into the ordered list of disc ids to crawl
    pub fn discs(&self) -> Vec<u32> {
        match self.selection {
            DiscSelection::Single(n) => vec![n],
            DiscSelection::Range(start, end) => (start..=end).collect(),
        }
    }

    /// URL of the disc's directory on the server, e.g.
    /// `<base>/PillProjectDisc7/`
    pub fn disc_url(&self, disc: u32) -> Result<Url> {
        self.base_url
            .join(&format!("{}{}/", DISC_DIR_PREFIX, disc))
            .map_err(|e| anyhow!("bad disc URL for disc {}: {}", disc, e))
    }

    /// URL of the disc's images directory, e.g.
    /// `<base>/PillProjectDisc7/images/`
    pub fn images_url(&self, disc: u32) -> Result<Url> {
        self.disc_url(disc)?
            .join("images/")
            .map_err(|e| anyhow!("bad images URL for disc {}: {}", disc, e))
    }

    /// Name of the disc's metadata document
    pub fn metadata_name(&self, disc: u32) -> String {
        format!("{}{}.xml", METADATA_PREFIX, disc)
    }

    /// Primary metadata URL (inside the disc directory) and the ALLXML
    /// fallback URL, in the order they should be tried
    pub fn metadata_urls(&self, disc: u32) -> Result<(Url, Url)> {
        let name = self.metadata_name(disc);
        let primary = self
            .disc_url(disc)?
            .join(&name)
            .map_err(|e| anyhow!("bad metadata URL for disc {}: {}", disc, e))?;
        let fallback = self
            .base_url
            .join(ALLXML_DIR)
            .and_then(|u| u.join(&name))
            .map_err(|e| anyhow!("bad ALLXML URL for disc {}: {}", disc, e))?;
        Ok((primary, fallback))
    }

    /// Local directory for one disc, e.g. `Pills_downloads/PillProjectDisc7`
    pub fn disc_dir(&self, disc: u32) -> PathBuf {
        self.out_root.join(format!("{}{}", DISC_DIR_PREFIX, disc))
    }

    /// Local directory for one disc's images
    pub fn images_dir(&self, disc: u32) -> PathBuf {
        self.disc_dir(disc).join("images")
    }

    /// Local destination of the disc's metadata document
    pub fn metadata_dest(&self, disc: u32) -> PathBuf {
        self.disc_dir(disc).join(self.metadata_name(disc))
    }
}

// Parses the base URL and guarantees a trailing slash
//
// Url::join resolves relative to the last '/' - without the slash,
// "…/Pills".join("PillProjectDisc7/") would silently drop the "Pills"
// segment and crawl the wrong tree.
fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).map_err(|e| anyhow!("invalid base URL '{}': {}", raw, e))?;
    if url.cannot_be_a_base() {
        bail!("base URL '{}' cannot serve as a directory root", raw);
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why do the URL helpers return Result when the base was validated?
//    - Url::join can still fail, and --base-url puts user input in play
//    - Propagating with ? beats panicking three hours into a run
//
// 2. Why insist on a trailing slash?
//    - Url::join resolves against the last '/' in the path
//    - Without it, "…/Pills".join("PillProjectDisc7/") silently drops the
//      "Pills" segment and every disc URL points at the wrong tree
//
// 3. Why are the path helpers plain functions of (config, disc)?
//    - The crawler and the tests compute destinations the same way
//    - No stored state means no way for the mapping to drift mid-run
// -----------------------------------------------------------------------------
