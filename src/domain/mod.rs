//! Domain types for the harvester.
//!
//! - Source: a crawlable remote feed and the ordered catalog of them
//! - Submission: one remote post and its resolved media references
//! - ItemMetadata: the sidecar document stored with each image

pub mod metadata;
pub mod source;
pub mod submission;

pub use metadata::ItemMetadata;
pub use source::{default_catalog, select_sources, Source};
pub use submission::{normalize_title, MediaRef, Submission};
