//! A single dataset image and its sidecar document.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::fs;

use super::StoreError;

/// An image found in (or written to) the dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetImage {
    /// Absolute path to the image file
    pub path: PathBuf,

    /// Folders between the dataset root and the image
    pub subfolders: Vec<String>,
}

impl DatasetImage {
    pub fn new(path: impl Into<PathBuf>, subfolders: Vec<String>) -> Self {
        Self {
            path: path.into(),
            subfolders,
        }
    }

    /// Image file name (used as the dedup key)
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Path of the `<image>.json` sidecar
    pub fn metadata_path(&self) -> PathBuf {
        sidecar_path(&self.path)
    }

    /// Read the sidecar document
    pub async fn load_metadata(&self) -> Result<SidecarDocument, StoreError> {
        let content = fs::read_to_string(self.metadata_path()).await?;
        let fields: Map<String, Value> = serde_json::from_str(&content)?;
        Ok(SidecarDocument(fields))
    }

    /// Overwrite the sidecar document
    pub async fn save_metadata(&self, document: &SidecarDocument) -> Result<(), StoreError> {
        let content = serde_json::to_string(&document.0)?;
        fs::write(self.metadata_path(), content).await?;
        Ok(())
    }
}

/// Path of the sidecar for an image path
pub fn sidecar_path(image_path: &Path) -> PathBuf {
    let mut name = image_path.as_os_str().to_owned();
    name.push(".json");
    PathBuf::from(name)
}

/// Loosely-typed sidecar contents.
///
/// Sidecars written by other tools carry arbitrary keys, so reading goes
/// through a JSON map rather than [`crate::domain::ItemMetadata`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SidecarDocument(pub Map<String, Value>);

impl SidecarDocument {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Tags stored under `"tags"` (non-string entries ignored)
    pub fn tags(&self) -> Vec<String> {
        self.0
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        let tags = tags.into_iter().map(Value::String).collect();
        self.0.insert("tags".to_string(), Value::Array(tags));
    }

    /// Add a tag unless already present
    pub fn add_tag(&mut self, tag: &str) {
        let mut tags = self.tags();
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
        self.set_tags(tags);
    }

    /// Remove a tag if present
    pub fn remove_tag(&mut self, tag: &str) {
        let mut tags = self.tags();
        if let Some(pos) = tags.iter().position(|t| t == tag) {
            tags.remove(pos);
        }
        self.set_tags(tags);
    }
}
