// src/listing/mod.rs
// =============================================================================
// This module discovers what lives inside a remote directory.
//
// The archive exposes no machine-readable index - just HTML directory
// listings, and on some discs only a hand-placed index.html. Discovery is
// therefore: fetch the listing HTML (bare URL first, index.html second),
// scrape the anchor hrefs out of it, and resolve them to absolute URLs.
//
// Submodules:
// - scrape: pure HTML -> link extraction (scraper + url crates)
// - discover: fetching the listing with retries, the index.html fallback,
//   and the image-file filter
// =============================================================================

mod discover;
mod scrape;

// Re-export public items from submodules
// This lets callers write `listing::list_directory()` instead of
// `listing::discover::list_directory()`
pub use discover::{file_name_of, image_file_urls, list_directory, IMAGE_EXTENSIONS};
pub use scrape::extract_listing_links;
