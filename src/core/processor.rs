//! Per-submission unit of work.
//!
//! dedup → load → resolve media → (fetch → extension → metadata → persist)
//! for each media item, sequentially.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::adapters::{extension_for_content_type, MediaFetcher, SourceClient, SourceHandle};
use crate::config::{DedupMode, IngestSettings, MediaErrorPolicy};
use crate::dataset::DatasetStore;
use crate::domain::{ItemMetadata, MediaRef, Submission};

use super::outcome::{IngestError, MediaOutcome, SubmissionReport};

/// Processes one submission at a time; shared by all tasks of a source
pub struct SubmissionProcessor {
    /// Source client (for loading submission detail)
    client: Arc<dyn SourceClient>,

    /// Media downloader
    fetcher: Arc<dyn MediaFetcher>,

    /// Destination dataset
    store: Arc<dyn DatasetStore>,

    settings: IngestSettings,
}

impl SubmissionProcessor {
    pub fn new(
        client: Arc<dyn SourceClient>,
        fetcher: Arc<dyn MediaFetcher>,
        store: Arc<dyn DatasetStore>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            client,
            fetcher,
            store,
            settings,
        }
    }

    /// Ingest one submission. Never fails; problems end up in the report.
    pub async fn process(&self, handle: &SourceHandle, submission: Submission) -> SubmissionReport {
        let prefix = submission.dedup_prefix(&handle.name);
        if self.settings.dedup == DedupMode::Submission && self.store.exists_with_prefix(&prefix) {
            info!(submission = %submission.id, "Skipping '{}' because it already exists", submission.title);
            return SubmissionReport::skipped(submission.id, "already exists");
        }

        info!(submission = %submission.id, "Fetching {}", submission.title);

        let submission_id = submission.id.clone();
        let submission = match self.client.load(handle, submission).await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(submission = %submission_id, error = %e, "Failed to load submission");
                return SubmissionReport::skipped(submission_id, format!("load failed: {}", e));
            }
        };

        let media_refs = submission.resolve_media();
        if media_refs.is_empty() {
            info!(submission = %submission.id, "Skipping '{}' because it has no downloadable media", submission.title);
            return SubmissionReport::skipped(submission.id, "no downloadable media");
        }

        let mut outcomes = Vec::with_capacity(media_refs.len());

        for (idx, media) in media_refs.iter().enumerate() {
            let outcome = self.ingest_media(handle, &submission, media).await;

            let abort = matches!(&outcome, MediaOutcome::Failed { error, .. } if error.is_fetch_error())
                && self.settings.on_media_error == MediaErrorPolicy::AbortSubmission;
            outcomes.push(outcome);

            if abort {
                for rest in &media_refs[idx + 1..] {
                    outcomes.push(MediaOutcome::Skipped {
                        media_id: rest.media_id.clone(),
                        reason: "aborted after earlier fetch failure".to_string(),
                    });
                }
                break;
            }
        }

        SubmissionReport::from_media(submission.id, outcomes)
    }

    /// Fetch and persist a single media item
    async fn ingest_media(
        &self,
        handle: &SourceHandle,
        submission: &Submission,
        media: &MediaRef,
    ) -> MediaOutcome {
        if self.settings.dedup == DedupMode::Media
            && self
                .store
                .exists_with_prefix(&submission.media_prefix(&handle.name, media))
        {
            return MediaOutcome::Skipped {
                media_id: media.media_id.clone(),
                reason: "already exists".to_string(),
            };
        }

        match self.fetch_and_store(handle, submission, media).await {
            Ok(file_name) => {
                info!(submission = %submission.id, "Saved {}", file_name);
                MediaOutcome::Saved {
                    media_id: media.media_id.clone(),
                    file_name,
                }
            }
            Err(e) => {
                match &e {
                    IngestError::Storage(_) => {
                        error!(submission = %submission.id, media_id = %media.media_id, url = %submission.url, error = %e, "Error saving media")
                    }
                    _ => {
                        warn!(submission = %submission.id, media_id = %media.media_id, url = %submission.url, error = %e, "Skipping media item")
                    }
                }
                MediaOutcome::Failed {
                    media_id: media.media_id.clone(),
                    error: e,
                }
            }
        }
    }

    async fn fetch_and_store(
        &self,
        handle: &SourceHandle,
        submission: &Submission,
        media: &MediaRef,
    ) -> Result<String, IngestError> {
        let timeout = self.settings.fetch_timeout;

        let fetched = tokio::time::timeout(timeout, self.fetcher.fetch(&media.remote_url))
            .await
            .map_err(|_| IngestError::FetchTimeout(timeout))?
            .map_err(|e| IngestError::from_fetch(e, timeout))?;

        let extension = fetched
            .content_type
            .as_deref()
            .and_then(extension_for_content_type)
            .ok_or_else(|| IngestError::ExtensionUndetermined(fetched.content_type.clone()))?;

        let file_name = submission.file_name(&handle.name, media, &extension);
        let metadata =
            ItemMetadata::for_submission(self.client.name(), &handle.name, &handle.source, submission);

        self.store
            .create(fetched.bytes, &file_name, &metadata)
            .await?;

        Ok(file_name)
    }
}
