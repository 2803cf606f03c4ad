//! Adapter interfaces for remote systems.
//!
//! Two seams keep the ingestion core independent of the network:
//! - [`SourceClient`]: opens a source and lists its submissions
//! - [`MediaFetcher`]: downloads the bytes behind a media reference

pub mod http;
pub mod reddit;

use async_trait::async_trait;
use futures::future;
use futures::stream::{BoxStream, StreamExt};
use thiserror::Error;
use tracing::debug;

use crate::domain::{Source, Submission};

pub use http::{extension_for_content_type, HttpFetcher};
pub use reddit::RedditClient;

/// Errors raised by a source client
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source '{source_id}' unavailable: {reason}")]
    Unavailable { source_id: String, reason: String },

    #[error("Failed to load submission {id}: {reason}")]
    SubmissionLoad { id: String, reason: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// An opened source, ready to list submissions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceHandle {
    /// Catalog entry this handle was opened for
    pub source: Source,

    /// Canonical name reported by the remote (used in file names)
    pub name: String,
}

impl SourceHandle {
    /// Handle whose canonical name is the catalog id
    pub fn new(source: Source) -> Self {
        let name = source.id.clone();
        Self { source, name }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Trait for remote submission sources
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Remote system name recorded in item metadata
    fn name(&self) -> &str;

    /// Open a source; failure means the whole source is skipped
    async fn open(&self, source: &Source) -> Result<SourceHandle, SourceError>;

    /// Lazily list top submissions, unfiltered.
    ///
    /// Individual entries may fail without ending the stream.
    fn top_submissions<'a>(
        &'a self,
        handle: &'a SourceHandle,
        limit: usize,
    ) -> BoxStream<'a, Result<Submission, SourceError>>;

    /// Fetch full detail (gallery metadata) for one submission
    async fn load(
        &self,
        handle: &SourceHandle,
        submission: Submission,
    ) -> Result<Submission, SourceError>;
}

/// Top submissions with meme-flaired posts removed
pub fn list_top_submissions<'a>(
    client: &'a dyn SourceClient,
    handle: &'a SourceHandle,
    limit: usize,
) -> BoxStream<'a, Result<Submission, SourceError>> {
    client
        .top_submissions(handle, limit)
        .filter(|entry| {
            let keep = match entry {
                Ok(submission) if submission.is_meme() => {
                    debug!(submission = %submission.id, "Skipping meme-flaired submission");
                    false
                }
                _ => true,
            };
            future::ready(keep)
        })
        .boxed()
}

/// Bytes and declared type of a fetched media item
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub bytes: Vec<u8>,

    /// Raw `Content-Type` header value
    pub content_type: Option<String>,
}

/// Errors raised while fetching media bytes
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Bad status: {0}")]
    BadStatus(u16),
}

/// Trait for media downloaders
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia, FetchError>;
}
