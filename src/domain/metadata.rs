//! Sidecar metadata written next to each ingested image.

use serde::{Deserialize, Serialize};

use super::source::Source;
use super::submission::{normalize_title, Submission};

/// Metadata document stored as `<image>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// Normalized post title
    pub title: String,

    /// NSFW flag from the remote post
    pub nsfw: bool,

    /// Remote system name ("reddit")
    pub source: String,

    /// Community the item came from
    pub subreddit: String,

    /// Descriptive tag of the catalog source
    pub description: String,

    /// Post URL
    pub url: String,
}

impl ItemMetadata {
    /// Build the sidecar for one media item of a submission
    pub fn for_submission(
        system: &str,
        source_name: &str,
        source: &Source,
        submission: &Submission,
    ) -> Self {
        Self {
            title: normalize_title(&submission.title),
            nsfw: submission.nsfw,
            source: system.to_string(),
            subreddit: source_name.to_string(),
            description: source.description.clone(),
            url: submission.url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_from_submission() {
        let source = Source::new("itookapicture", "Photography");
        let submission = Submission::new("abc", "ITAP of a lake", "https://i.redd.it/abc.jpg")
            .with_nsfw(true);

        let metadata = ItemMetadata::for_submission("reddit", "itookapicture", &source, &submission);

        assert_eq!(metadata.title, "photo of a lake");
        assert!(metadata.nsfw);
        assert_eq!(metadata.source, "reddit");
        assert_eq!(metadata.subreddit, "itookapicture");
        assert_eq!(metadata.description, "Photography");
    }

    #[test]
    fn test_metadata_json_keys() {
        let source = Source::new("art", "Art");
        let submission = Submission::new("q", "Still life", "https://i.redd.it/q.png");
        let metadata = ItemMetadata::for_submission("reddit", "Art", &source, &submission);

        let value = serde_json::to_value(&metadata).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        for key in ["title", "nsfw", "source", "subreddit", "description", "url"] {
            assert!(keys.contains(&key.to_string()), "missing {}", key);
        }
    }
}
