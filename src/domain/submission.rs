//! Submissions and the media references resolved from them.

use serde::{Deserialize, Serialize};

/// One remote post returned by a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// Remote identifier (base36 on Reddit)
    pub id: String,

    /// Post title as published
    pub title: String,

    /// Whether the post is marked NSFW
    pub nsfw: bool,

    /// Link flair text, if any
    pub flair: Option<String>,

    /// Post URL (direct media link for single-image posts)
    pub url: String,

    /// Whether the post carries gallery metadata
    #[serde(default)]
    pub gallery: bool,

    /// Gallery entries with a usable URL, in gallery order
    #[serde(default)]
    pub media_items: Vec<MediaRef>,
}

/// One individually downloadable media attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Where the bytes live
    pub remote_url: String,

    /// Identifier used in the file name
    pub media_id: String,
}

impl MediaRef {
    pub fn new(remote_url: impl Into<String>, media_id: impl Into<String>) -> Self {
        Self {
            remote_url: remote_url.into(),
            media_id: media_id.into(),
        }
    }
}

impl Submission {
    /// Create a non-gallery submission
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            nsfw: false,
            flair: None,
            url: url.into(),
            gallery: false,
            media_items: Vec::new(),
        }
    }

    pub fn with_flair(mut self, flair: impl Into<String>) -> Self {
        self.flair = Some(flair.into());
        self
    }

    pub fn with_nsfw(mut self, nsfw: bool) -> Self {
        self.nsfw = nsfw;
        self
    }

    /// Mark as a gallery post with the given entries (possibly none)
    pub fn with_media(mut self, media: impl IntoIterator<Item = MediaRef>) -> Self {
        self.gallery = true;
        self.media_items.extend(media);
        self
    }

    /// Meme-flaired posts never enter the dataset
    pub fn is_meme(&self) -> bool {
        self.flair
            .as_deref()
            .is_some_and(|f| f.to_lowercase().contains("meme"))
    }

    /// Media items to download, in order.
    ///
    /// Galleries yield one reference per usable entry, which may be none.
    /// Anything else yields a single reference to the post URL keyed by the
    /// submission id.
    pub fn resolve_media(&self) -> Vec<MediaRef> {
        if self.gallery {
            self.media_items.clone()
        } else {
            vec![MediaRef::new(self.url.clone(), self.id.clone())]
        }
    }

    /// File name prefix shared by every item of this submission
    pub fn dedup_prefix(&self, source_name: &str) -> String {
        format!("{}{}", source_name, self.id)
    }

    /// File name prefix of a single media item, extension excluded
    pub fn media_prefix(&self, source_name: &str, media: &MediaRef) -> String {
        format!("{}{}_{}.", source_name, self.id, media.media_id)
    }

    /// Final file name: `{source}{submission}_{media}.{ext}`
    pub fn file_name(&self, source_name: &str, media: &MediaRef, extension: &str) -> String {
        format!("{}{}", self.media_prefix(source_name, media), extension)
    }
}

/// Title normalization applied before metadata is written
pub fn normalize_title(title: &str) -> String {
    title.replace("ITAP", "photo")
}
