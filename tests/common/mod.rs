//! Shared fakes for ingestion integration tests.
//!
//! Nothing here touches the network: the source client serves canned
//! listings, the fetcher serves canned responses by URL and both record
//! what they were asked for.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;

use harvester::config::IngestSettings;
use harvester::{
    DatasetStore, FetchError, FetchedMedia, ItemMetadata, MediaFetcher, Orchestrator, Source,
    SourceClient, SourceError, SourceHandle, StoreError, Submission,
};

/// Ordered record of calls made against the fakes
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Source client serving fixed listings
#[derive(Default)]
pub struct FakeSourceClient {
    listings: HashMap<String, Vec<Submission>>,
    details: HashMap<String, Submission>,
    unavailable: HashSet<String>,
    load_failures: HashSet<String>,
    log: EventLog,
}

impl FakeSourceClient {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    /// Listing returned for `source_id`
    pub fn with_listing(mut self, source_id: &str, submissions: Vec<Submission>) -> Self {
        self.listings.insert(source_id.to_string(), submissions);
        self
    }

    /// Replace what `load` returns for a submission (e.g. to attach gallery media)
    pub fn with_detail(mut self, submission: Submission) -> Self {
        self.details.insert(submission.id.clone(), submission);
        self
    }

    pub fn with_unavailable(mut self, source_id: &str) -> Self {
        self.unavailable.insert(source_id.to_string());
        self
    }

    pub fn with_load_failure(mut self, submission_id: &str) -> Self {
        self.load_failures.insert(submission_id.to_string());
        self
    }
}

#[async_trait]
impl SourceClient for FakeSourceClient {
    fn name(&self) -> &str {
        "reddit"
    }

    async fn open(&self, source: &Source) -> Result<SourceHandle, SourceError> {
        self.log.lock().push(format!("open:{}", source.id));

        if self.unavailable.contains(&source.id) {
            return Err(SourceError::Unavailable {
                source_id: source.id.clone(),
                reason: "private".to_string(),
            });
        }
        Ok(SourceHandle::new(source.clone()))
    }

    fn top_submissions<'a>(
        &'a self,
        handle: &'a SourceHandle,
        limit: usize,
    ) -> BoxStream<'a, Result<Submission, SourceError>> {
        let entries = self
            .listings
            .get(&handle.source.id)
            .cloned()
            .unwrap_or_default();
        stream::iter(entries.into_iter().take(limit).map(Ok)).boxed()
    }

    async fn load(
        &self,
        _handle: &SourceHandle,
        submission: Submission,
    ) -> Result<Submission, SourceError> {
        self.log.lock().push(format!("load:{}", submission.id));

        if self.load_failures.contains(&submission.id) {
            return Err(SourceError::SubmissionLoad {
                id: submission.id,
                reason: "removed".to_string(),
            });
        }
        Ok(self
            .details
            .get(&submission.id)
            .cloned()
            .unwrap_or(submission))
    }
}

/// Canned response for one URL
#[derive(Debug, Clone)]
pub enum FakeResponse {
    Media {
        bytes: Vec<u8>,
        content_type: Option<String>,
    },
    Error(FetchError),
    /// Never completes
    Hang,
}

impl FakeResponse {
    pub fn image(content_type: &str) -> Self {
        FakeResponse::Media {
            bytes: b"not really an image".to_vec(),
            content_type: Some(content_type.to_string()),
        }
    }
}

/// Fetcher serving canned responses; unknown URLs answer 404
#[derive(Default)]
pub struct FakeFetcher {
    responses: HashMap<String, FakeResponse>,
    delay: Option<Duration>,
    log: EventLog,
}

impl FakeFetcher {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    pub fn with(mut self, url: &str, response: FakeResponse) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    /// Sleep this long before answering any request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia, FetchError> {
        self.log.lock().push(format!("fetch:{}", url));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = self
            .responses
            .get(url)
            .cloned()
            .unwrap_or(FakeResponse::Error(FetchError::BadStatus(404)));

        let result = match response {
            FakeResponse::Media {
                bytes,
                content_type,
            } => Ok(FetchedMedia {
                bytes,
                content_type,
            }),
            FakeResponse::Error(e) => Err(e),
            FakeResponse::Hang => std::future::pending().await,
        };

        self.log.lock().push(format!("fetched:{}", url));
        result
    }
}

/// Store that rejects every write
pub struct FailingStore;

#[async_trait]
impl DatasetStore for FailingStore {
    fn exists_with_prefix(&self, _prefix: &str) -> bool {
        false
    }

    async fn create(
        &self,
        _bytes: Vec<u8>,
        file_name: &str,
        _metadata: &ItemMetadata,
    ) -> Result<PathBuf, StoreError> {
        Err(StoreError::Persist {
            path: PathBuf::from(file_name),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        })
    }
}

/// Settings with a short fetch timeout for tests
pub fn test_settings() -> IngestSettings {
    IngestSettings {
        fetch_timeout: Duration::from_millis(200),
        ..Default::default()
    }
}

pub fn orchestrator(
    client: FakeSourceClient,
    fetcher: FakeFetcher,
    store: Arc<dyn DatasetStore>,
    settings: IngestSettings,
) -> Orchestrator {
    Orchestrator::new(Arc::new(client), Arc::new(fetcher), store, settings, 3000)
}

/// Names of all regular files directly under `dir`, sorted
pub fn file_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();
    names
}
