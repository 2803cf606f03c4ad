//! harvester - Community media feeds into an image dataset
//!
//! Crawls a catalog of remote sources (subreddits), resolves each submission
//! into its media items and stores every image next to a JSON sidecar.
//!
//! # Architecture
//!
//! - Sources are crawled strictly one after another, in catalog order
//! - Within a source, submissions are processed concurrently (bounded)
//! - Every failure below configuration is contained to its submission or
//!   media item and logged; a run always completes
//! - Already-present items are skipped by file name prefix before any
//!   network request
//!
//! # Modules
//!
//! - `adapters`: Remote systems (Reddit listing client, HTTP media fetcher)
//! - `core`: Ingestion logic (SubmissionProcessor, Orchestrator, reports)
//! - `dataset`: Directory-backed image + sidecar store
//! - `domain`: Data structures (Source, Submission, MediaRef, ItemMetadata)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! export REDDIT_CLIENT_ID=... REDDIT_CLIENT_SECRET=...
//! harvester scrape ./dataset
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod dataset;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{FetchError, FetchedMedia, MediaFetcher, SourceClient, SourceError, SourceHandle};
pub use core::{Orchestrator, RunReport, SourceReport, SubmissionOutcome, SubmissionProcessor};
pub use dataset::{DatasetDirectory, DatasetStore, StoreError};
pub use domain::{ItemMetadata, MediaRef, Source, Submission};
