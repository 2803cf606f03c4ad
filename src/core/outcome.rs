//! Per-item outcomes of ingestion.
//!
//! Nothing below the submission processor escapes as an error; every
//! failure ends up as one of these values and a log line.

use std::time::Duration;

use thiserror::Error;

use crate::adapters::FetchError;
use crate::dataset::StoreError;

/// Why a single media item could not be ingested
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Timeout after {}s", .0.as_secs())]
    FetchTimeout(Duration),

    #[error("Transport error: {0}")]
    FetchTransport(String),

    #[error("HTTP status {0}")]
    FetchBadStatus(u16),

    #[error("Could not determine extension for content type {0:?}")]
    ExtensionUndetermined(Option<String>),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl IngestError {
    /// Map a fetcher error, attributing timeouts to the configured bound
    pub fn from_fetch(error: FetchError, timeout: Duration) -> Self {
        match error {
            FetchError::Timeout => Self::FetchTimeout(timeout),
            FetchError::Transport(reason) => Self::FetchTransport(reason),
            FetchError::BadStatus(status) => Self::FetchBadStatus(status),
        }
    }

    /// Whether the error happened while downloading (as opposed to after)
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            Self::FetchTimeout(_) | Self::FetchTransport(_) | Self::FetchBadStatus(_)
        )
    }
}

/// Result for one media item of a submission
#[derive(Debug)]
pub enum MediaOutcome {
    Saved { media_id: String, file_name: String },
    Skipped { media_id: String, reason: String },
    Failed { media_id: String, error: IngestError },
}

impl MediaOutcome {
    pub fn media_id(&self) -> &str {
        match self {
            Self::Saved { media_id, .. }
            | Self::Skipped { media_id, .. }
            | Self::Failed { media_id, .. } => media_id,
        }
    }
}

/// Summary result for a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// At least one media item was written; holds the new file names
    Saved(Vec<String>),

    /// Nothing was attempted or everything was already present
    Skipped(String),

    /// Every attempted media item failed
    Failed(String),
}

/// What happened to one submission
#[derive(Debug)]
pub struct SubmissionReport {
    pub submission_id: String,
    pub outcome: SubmissionOutcome,
    /// Per media item detail, in media order
    pub media: Vec<MediaOutcome>,
}

impl SubmissionReport {
    /// Report for a submission skipped before any media was looked at
    pub fn skipped(submission_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            submission_id: submission_id.into(),
            outcome: SubmissionOutcome::Skipped(reason.into()),
            media: Vec::new(),
        }
    }

    /// Aggregate media outcomes into a submission outcome
    pub fn from_media(submission_id: impl Into<String>, media: Vec<MediaOutcome>) -> Self {
        let saved: Vec<String> = media
            .iter()
            .filter_map(|m| match m {
                MediaOutcome::Saved { file_name, .. } => Some(file_name.clone()),
                _ => None,
            })
            .collect();

        let first_failure = media.iter().find_map(|m| match m {
            MediaOutcome::Failed { media_id, error } => Some(format!("{}: {}", media_id, error)),
            _ => None,
        });

        let outcome = if !saved.is_empty() {
            SubmissionOutcome::Saved(saved)
        } else if let Some(reason) = first_failure {
            SubmissionOutcome::Failed(reason)
        } else {
            SubmissionOutcome::Skipped("already exists".to_string())
        };

        Self {
            submission_id: submission_id.into(),
            outcome,
            media,
        }
    }

    pub fn saved_files(&self) -> &[String] {
        match &self.outcome {
            SubmissionOutcome::Saved(files) => files,
            _ => &[],
        }
    }

    pub fn failed_media(&self) -> usize {
        self.media
            .iter()
            .filter(|m| matches!(m, MediaOutcome::Failed { .. }))
            .count()
    }
}
