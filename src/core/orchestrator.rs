//! Ingestion orchestrator.
//!
//! Walks the catalog in order. For each source: open it, materialize the
//! filtered submission list, fan out one processor call per submission and
//! wait for all of them before touching the next source.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::adapters::{list_top_submissions, MediaFetcher, SourceClient, SourceError};
use crate::config::IngestSettings;
use crate::dataset::DatasetStore;
use crate::domain::Source;

use super::outcome::SubmissionReport;
use super::processor::SubmissionProcessor;
use super::report::{RunReport, SourceReport};

/// Phases a run moves through (logged at debug level)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    FetchingSubmissions,
    FanningOut,
    Done,
}

/// Main ingestion orchestrator
pub struct Orchestrator {
    /// Source client shared with the processor
    client: Arc<dyn SourceClient>,

    /// Per-submission worker
    processor: SubmissionProcessor,

    /// Submissions requested per source
    submission_limit: usize,

    /// Fan-out bound (0 = all at once)
    max_concurrent: usize,
}

impl Orchestrator {
    /// Create an orchestrator over the given collaborators
    pub fn new(
        client: Arc<dyn SourceClient>,
        fetcher: Arc<dyn MediaFetcher>,
        store: Arc<dyn DatasetStore>,
        settings: IngestSettings,
        submission_limit: usize,
    ) -> Self {
        let max_concurrent = settings.max_concurrent_submissions;
        let processor = SubmissionProcessor::new(client.clone(), fetcher, store, settings);

        Self {
            client,
            processor,
            submission_limit,
            max_concurrent,
        }
    }

    /// Crawl every source of the catalog, strictly in order
    pub async fn run(&self, catalog: &[Source]) -> RunReport {
        let mut report = RunReport::new();
        info!(run_id = %report.run_id, sources = catalog.len(), "Starting ingestion run");

        for source in catalog {
            let source_report = self.crawl_source(source).await;
            report.sources.push(source_report);
            transition(RunPhase::Idle);
        }

        transition(RunPhase::Done);
        report.finish();

        info!(
            run_id = %report.run_id,
            files = report.total_files(),
            failed = report.total_failed(),
            "Ingestion run finished"
        );

        report
    }

    /// Crawl a single source
    #[instrument(skip(self, source), fields(source = %source.id))]
    pub async fn crawl_source(&self, source: &Source) -> SourceReport {
        info!("Scraping {}", source.id);
        transition(RunPhase::FetchingSubmissions);

        let handle = match self.client.open(source).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "Skipping unavailable source");
                return SourceReport::unavailable(source.id.clone(), e.to_string());
            }
        };

        let entries: Vec<_> =
            list_top_submissions(self.client.as_ref(), &handle, self.submission_limit)
                .collect()
                .await;

        let mut reports = Vec::new();
        let mut seen = HashSet::new();
        let mut submissions = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                Ok(submission) if !seen.insert(submission.id.clone()) => {
                    debug!(submission = %submission.id, "Dropping repeated submission");
                }
                Ok(submission) => submissions.push(submission),
                Err(e) => {
                    warn!(error = %e, "Skipping submission that failed to load");
                    reports.push(SubmissionReport::skipped(failed_id(&e), e.to_string()));
                }
            }
        }

        transition(RunPhase::FanningOut);
        let concurrency = match self.max_concurrent {
            0 => submissions.len().max(1),
            n => n,
        };
        info!(submissions = submissions.len(), concurrency, "Processing submissions");

        let handle = &handle;
        let processed: Vec<SubmissionReport> = stream::iter(submissions)
            .map(|submission| self.processor.process(handle, submission))
            .buffer_unordered(concurrency)
            .collect()
            .await;
        reports.extend(processed);

        let report = SourceReport::new(source.id.clone(), reports);
        info!(
            saved = report.saved(),
            skipped = report.skipped(),
            failed = report.failed(),
            files = report.files(),
            "Finished source"
        );
        report
    }
}

fn transition(phase: RunPhase) {
    debug!(?phase, "Orchestrator phase");
}

fn failed_id(error: &SourceError) -> String {
    match error {
        SourceError::SubmissionLoad { id, .. } => id.clone(),
        _ => "<listing>".to_string(),
    }
}
