// src/fetch/mod.rs
// =============================================================================
// This module moves bytes: one shared HTTP client, and a worker that takes
// a URL plus a destination path and leaves a finished file behind (or
// doesn't, but never a half-written one).
//
// Submodules:
// - client: the configured reqwest client every fetch shares
// - worker: skip-if-present, admission gating, streaming to a temp file,
//   retries with linear backoff
// =============================================================================

mod client;
mod worker;

// Re-export public items from submodules
pub use client::build_client;
pub use worker::{download_file, FetchOutcome};
