// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// clap is a popular Rust library for parsing command-line arguments.
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// The crawler does exactly one thing, so there are no subcommands - just
// flags. The only rule clap can't express alone is disc selection: --disc
// and --range are mutually exclusive, and leaving both out means "crawl the
// whole archive".
// =============================================================================

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::config::{
    DiscSelection, RunConfig, DEFAULT_BASE_URL, DEFAULT_CHUNK_SIZE, DEFAULT_CONCURRENCY,
    DEFAULT_FIRST_DISC, DEFAULT_LAST_DISC, DEFAULT_OUT_ROOT, DEFAULT_RETRY_BUDGET,
};

// This struct represents our entire CLI application
//
// #[derive(Parser)] tells clap to automatically generate parsing code
// The #[command(...)] attributes configure how the CLI behaves
#[derive(Parser, Debug)]
#[command(
    name = "pill-crawler",
    version = "0.1.0",
    about = "Crawl the NIH Pill Project archive: per-disc metadata plus every listed image",
    long_about = "pill-crawler mirrors numbered PillProjectDisc directories from the NIH/NLM \
                  Pill Project archive. Each disc's XML metadata document and image files are \
                  downloaded with bounded concurrency; a re-run skips everything that already \
                  exists, so interrupted runs simply resume."
)]
pub struct Cli {
    /// Crawl a single disc number (e.g. --disc 7)
    ///
    /// Conflicts with --range. With neither, the default range 1-110 is
    /// crawled.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..),
          conflicts_with = "range")]
    pub disc: Option<u32>,

    /// Crawl an inclusive range of discs (e.g. --range 7 9)
    ///
    /// Takes exactly two numbers: START END
    #[arg(long, num_args = 2, value_names = ["START", "END"],
          value_parser = clap::value_parser!(u32).range(1..))]
    pub range: Option<Vec<u32>>,

    /// Output root directory
    ///
    /// Discs land as <out>/PillProjectDisc<N>/
    #[arg(long, default_value = DEFAULT_OUT_ROOT, value_name = "DIR")]
    pub out: PathBuf,

    /// How many images to download in parallel
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, value_name = "N")]
    pub concurrency: usize,

    /// Attempts per file before giving up on it
    #[arg(long, default_value_t = DEFAULT_RETRY_BUDGET, value_name = "N")]
    pub retry: u32,

    /// Disk write granularity in bytes for streamed downloads
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, value_name = "BYTES")]
    pub chunk_size: usize,

    /// Archive base URL (point this at a mirror if the NIH server is slow)
    #[arg(long, default_value = DEFAULT_BASE_URL, value_name = "URL")]
    pub base_url: String,

    /// Print the run summary as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    // Turns the parsed arguments into a validated RunConfig
    //
    // Configuration problems are the only errors that may abort a run, and
    // they all surface here - before any network activity.
    pub fn into_config(self) -> Result<RunConfig> {
        let selection = match (self.disc, &self.range) {
            (Some(n), None) => DiscSelection::Single(n),
            (None, Some(pair)) => {
                if pair.len() != 2 {
                    bail!("--range takes exactly two disc numbers");
                }
                DiscSelection::Range(pair[0], pair[1])
            }
            (None, None) => DiscSelection::Range(DEFAULT_FIRST_DISC, DEFAULT_LAST_DISC),
            // clap's conflicts_with already rejects this combination; keep a
            // readable error in case the CLI definition ever drifts
            (Some(_), Some(_)) => bail!("--disc and --range cannot be combined"),
        };

        RunConfig::new(
            &self.base_url,
            self.out,
            selection,
            self.concurrency,
            self.retry,
            self.chunk_size,
        )
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Option<u32> for --disc?
//    - The flag is optional; None means "the user didn't pass it"
//    - Selection logic then decides between single, range and default
//
// 2. What does conflicts_with do?
//    - clap rejects the command line when both flags appear
//    - The user gets a proper usage error instead of surprising behavior
//
// 3. What is value_parser!(u32).range(1..)?
//    - Parses the argument as u32 AND enforces a minimum of 1
//    - "disc 0" doesn't exist in the archive, so it's rejected up front
//
// 4. Why does into_config consume self?
//    - After conversion the Cli struct has served its purpose
//    - Taking ownership lets us move out of the fields without cloning
// -----------------------------------------------------------------------------
