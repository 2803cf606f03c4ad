//! Run and per-source summaries.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::outcome::{SubmissionOutcome, SubmissionReport};

/// Summary of crawling one source
#[derive(Debug)]
pub struct SourceReport {
    /// Catalog id
    pub source_id: String,

    /// Set when the source could not be opened
    pub unavailable: Option<String>,

    /// One entry per listed submission (filtered entries excluded)
    pub submissions: Vec<SubmissionReport>,
}

impl SourceReport {
    pub fn new(source_id: impl Into<String>, submissions: Vec<SubmissionReport>) -> Self {
        Self {
            source_id: source_id.into(),
            unavailable: None,
            submissions,
        }
    }

    pub fn unavailable(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            unavailable: Some(reason.into()),
            submissions: Vec::new(),
        }
    }

    pub fn saved(&self) -> usize {
        self.count(|o| matches!(o, SubmissionOutcome::Saved(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, SubmissionOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, SubmissionOutcome::Failed(_)))
    }

    /// Files written for this source
    pub fn files(&self) -> usize {
        self.submissions.iter().map(|s| s.saved_files().len()).sum()
    }

    fn count(&self, predicate: impl Fn(&SubmissionOutcome) -> bool) -> usize {
        self.submissions
            .iter()
            .filter(|s| predicate(&s.outcome))
            .count()
    }
}

/// Summary of a whole run over the catalog
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// In catalog order
    pub sources: Vec<SourceReport>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            sources: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn total_files(&self) -> usize {
        self.sources.iter().map(SourceReport::files).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.sources.iter().map(SourceReport::failed).sum()
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
