//! Core ingestion logic.
//!
//! This module contains:
//! - SubmissionProcessor: dedup, media resolution, fetch and persist for one submission
//! - Orchestrator: sequential catalog walk with per-source fan-out
//! - Outcomes and reports: what happened, per media item, submission, source and run

pub mod orchestrator;
pub mod outcome;
pub mod processor;
pub mod report;

// Re-export commonly used types
pub use orchestrator::{Orchestrator, RunPhase};
pub use outcome::{IngestError, MediaOutcome, SubmissionOutcome, SubmissionReport};
pub use processor::SubmissionProcessor;
pub use report::{RunReport, SourceReport};
