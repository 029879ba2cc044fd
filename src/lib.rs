// src/lib.rs
// =============================================================================
// pill-crawler: bulk downloader for the pill image archive
//
// The archive publishes ~110 "disc" directories, each holding one XML
// metadata export and an images/ directory of pill photographs, browsable
// only through HTML listings. This crate discovers what each disc holds,
// fetches whatever is missing locally with bounded parallelism, and leaves
// a directory tree that mirrors the archive - rerunnable at any time,
// because a file on disk is never fetched again.
//
// Module map:
// - config: run settings plus the URL and local-path layout of a disc
// - listing: HTML directory listings -> lists of file URLs
// - fetch: the shared HTTP client and the streaming download worker
// - crawl: per-disc orchestration and the sequential run driver
// - cli: clap surface that produces a config
//
// The binary in main.rs is a thin wrapper; everything testable lives here.
// =============================================================================

pub mod cli;
pub mod config;
pub mod crawl;
pub mod fetch;
pub mod listing;
