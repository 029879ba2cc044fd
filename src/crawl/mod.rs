// src/crawl/mod.rs
// =============================================================================
// This module runs the crawl itself.
//
// Layers:
// - disc: everything for ONE disc - metadata with its fallback, image
//   discovery, and the concurrent fetch of whatever is missing
// - driver: walks the selected discs in order, one at a time, and folds
//   the per-disc reports into a run summary
//
// Concurrency lives inside a disc, never across discs. Images of one disc
// download in parallel under the admission gate; discs themselves proceed
// sequentially so output stays readable and the archive sees one directory
// scan at a time.
// =============================================================================

mod disc;
mod driver;

// Re-export the crawl entry points
pub use disc::{crawl_disc, DiscReport};
pub use driver::{run, RunSummary};
