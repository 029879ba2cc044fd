// src/main.rs
// =============================================================================
// This is the entry point of the pill-crawler CLI.
//
// What happens here:
// 1. Point diagnostics (tracing) at stderr, so stdout stays for output
// 2. Parse command-line arguments using clap and turn them into a RunConfig
// 3. Hand the config to the crawl driver and wait for the summary
// 4. Print the summary as a table or JSON
// 5. Exit with proper code (0 = complete, 1 = files failed, 2 = error)
//
// Rust concepts used:
// - async/await: The whole crawl is one big async call tree under tokio
// - Result<T, E>: Setup errors bubble up with ?; fetch failures don't -
//   they ride inside the summary as data
// =============================================================================

use clap::Parser; // Parser trait enables the parse() method

use anyhow::Result;

// The real work lives in the library crate; see src/lib.rs for the map
use pill_crawler::cli::Cli;
use pill_crawler::crawl::{self, RunSummary};
use pill_crawler::fetch::FetchOutcome;

// The #[tokio::main] attribute creates the runtime and runs our async code
#[tokio::main]
async fn main() {
    init_logging();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // Startup or filesystem errors land here; {:#} keeps the
            // whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = every file downloaded or already present
//   Ok(1) = the run finished but some files failed
//   Err   = could not even get started (bad config, unwritable disk, ...)
async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let json = cli.json;
    let config = cli.into_config()?;

    let summary = crawl::run(&config).await?;

    print_summary(&summary, json)?;

    if summary.all_clean() {
        Ok(0)
    } else {
        Ok(1)
    }
}

// Diagnostics go to stderr so they never interleave with the progress
// lines or the --json document on stdout. RUST_LOG overrides the default.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pill_crawler=warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

// Prints the summary either as a table or JSON
fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(summary)?;
        println!("{}", json_output);
    } else {
        print_table(summary);
    }
    Ok(())
}

// Prints the run summary as a human-readable table in the terminal
fn print_table(summary: &RunSummary) {
    println!();
    println!(
        "{:<8} {:<14} {:<10} {:<10} {:<10} {:<8}",
        "DISC", "METADATA", "LISTED", "NEW", "SKIPPED", "FAILED"
    );
    println!("{}", "=".repeat(64));

    for disc in &summary.discs {
        println!(
            "{:<8} {:<14} {:<10} {:<10} {:<10} {:<8}",
            disc.disc,
            format_outcome(disc.metadata),
            disc.images_found,
            disc.downloaded,
            disc.skipped,
            disc.failed.len()
        );
    }

    println!();
    println!("📊 Summary:");
    println!("   ⬇️  Downloaded: {}", summary.total_downloaded());
    println!("   ⏭️  Skipped: {}", summary.total_skipped());
    println!("   ❌ Failed: {}", summary.total_failed());
    println!("   ⏱️  Elapsed: {:.1}s", summary.elapsed_secs);
}

// Formats a metadata outcome for the table
fn format_outcome(outcome: FetchOutcome) -> String {
    match outcome {
        FetchOutcome::Downloaded => "✅ fetched".to_string(),
        FetchOutcome::Skipped => "⏭️  present".to_string(),
        FetchOutcome::Failed => "❌ missing".to_string(),
    }
}
