//! Dataset storage for ingested images.
//!
//! A dataset is a directory of images, each paired with a JSON sidecar:
//!
//! ```text
//! <data_dir>/
//! ├── itookapicturexyz_xyz.jpg
//! ├── itookapicturexyz_xyz.jpg.json     # title, nsfw, source, subreddit, ...
//! └── <subfolder>/                      # scanned, never created by ingestion
//!     └── ...
//! ```
//!
//! The ingestion core only talks to the [`DatasetStore`] trait; the
//! directory-backed implementation lives in [`directory`].

pub mod directory;
pub mod image;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ItemMetadata;

pub use directory::DatasetDirectory;
pub use image::{DatasetImage, SidecarDocument};

/// File extensions recognised as dataset images
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Errors raised by dataset storage
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to persist {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Write task failed: {0}")]
    Task(String),
}

/// Storage seam used by the submission processor
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Whether any stored image name starts with `prefix`
    fn exists_with_prefix(&self, prefix: &str) -> bool;

    /// Atomically write an image and its sidecar.
    ///
    /// Either both files exist afterwards or neither does.
    async fn create(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        metadata: &ItemMetadata,
    ) -> Result<PathBuf, StoreError>;
}

/// Whether a file name has one of the dataset image extensions
pub fn is_image_name(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
