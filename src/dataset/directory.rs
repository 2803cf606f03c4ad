//! Directory-backed dataset store.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::debug;

use super::image::{sidecar_path, DatasetImage};
use super::{is_image_name, DatasetStore, StoreError};
use crate::domain::ItemMetadata;

/// A dataset rooted at a local directory.
///
/// Existing images are scanned once on open. The name index is kept current
/// as new items are created so concurrent tasks see each other's writes.
pub struct DatasetDirectory {
    /// Dataset root
    root: PathBuf,

    /// Images found on open plus those created since
    images: RwLock<Vec<DatasetImage>>,

    /// Sorted image file names for prefix lookups
    names: RwLock<BTreeSet<String>>,
}

impl DatasetDirectory {
    /// Open (and create if needed) a dataset directory
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;

        let images = scan_images(&root).await?;
        let names = images.iter().map(|i| i.file_name().to_string()).collect();

        debug!(root = %root.display(), count = images.len(), "Scanned dataset");

        Ok(Self {
            root,
            images: RwLock::new(images),
            names: RwLock::new(names),
        })
    }

    /// Dataset root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot of all known images
    pub fn images(&self) -> Vec<DatasetImage> {
        self.images.read().clone()
    }

    pub fn len(&self) -> usize {
        self.images.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.read().is_empty()
    }

    fn record(&self, path: PathBuf, file_name: &str) {
        self.names.write().insert(file_name.to_string());
        self.images.write().push(DatasetImage::new(path, Vec::new()));
    }
}

#[async_trait]
impl DatasetStore for DatasetDirectory {
    fn exists_with_prefix(&self, prefix: &str) -> bool {
        let names = self.names.read();
        names
            .range(prefix.to_string()..)
            .next()
            .is_some_and(|name| name.starts_with(prefix))
    }

    async fn create(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        metadata: &ItemMetadata,
    ) -> Result<PathBuf, StoreError> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.starts_with('.') {
            return Err(StoreError::InvalidName(file_name.to_string()));
        }

        let sidecar = serde_json::to_vec(metadata)?;
        let root = self.root.clone();
        let name = file_name.to_string();

        let path = tokio::task::spawn_blocking(move || write_pair(&root, &name, &bytes, &sidecar))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))??;

        self.record(path.clone(), file_name);
        Ok(path)
    }
}

/// Write image and sidecar through temp files, then move both into place.
///
/// The sidecar lands first; if the image rename fails the sidecar is removed
/// again so no half pair stays behind.
fn write_pair(
    root: &Path,
    file_name: &str,
    bytes: &[u8],
    sidecar: &[u8],
) -> Result<PathBuf, StoreError> {
    let image_path = root.join(file_name);
    let metadata_path = sidecar_path(&image_path);

    let mut image_tmp = NamedTempFile::new_in(root)?;
    image_tmp.write_all(bytes)?;
    image_tmp.as_file().sync_all()?;

    let mut metadata_tmp = NamedTempFile::new_in(root)?;
    metadata_tmp.write_all(sidecar)?;
    metadata_tmp.as_file().sync_all()?;

    metadata_tmp
        .persist(&metadata_path)
        .map_err(|e| StoreError::Persist {
            path: metadata_path.clone(),
            source: e.error,
        })?;

    if let Err(e) = image_tmp.persist(&image_path) {
        let _ = std::fs::remove_file(&metadata_path);
        return Err(StoreError::Persist {
            path: image_path,
            source: e.error,
        });
    }

    Ok(image_path)
}

/// Recursively collect images under `root`
async fn scan_images(root: &Path) -> Result<Vec<DatasetImage>, StoreError> {
    let mut images = Vec::new();
    let mut pending: Vec<(PathBuf, Vec<String>)> = vec![(root.to_path_buf(), Vec::new())];

    while let Some((dir, subfolders)) = pending.pop() {
        let mut entries = fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };

            if entry.file_type().await?.is_dir() {
                let mut nested = subfolders.clone();
                nested.push(name);
                pending.push((entry.path(), nested));
            } else if is_image_name(&name) {
                images.push(DatasetImage::new(entry.path(), subfolders.clone()));
            }
        }
    }

    images.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_metadata() -> ItemMetadata {
        ItemMetadata {
            title: "Lake".to_string(),
            nsfw: false,
            source: "reddit".to_string(),
            subreddit: "alpha".to_string(),
            description: "Photography".to_string(),
            url: "https://i.redd.it/xyz.webp".to_string(),
        }
    }

    #[tokio::test]
    async fn test_open_scans_recursively() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("kept/nested")).unwrap();
        std::fs::write(temp.path().join("a.jpg"), b"a").unwrap();
        std::fs::write(temp.path().join("a.jpg.json"), b"{}").unwrap();
        std::fs::write(temp.path().join("kept/nested/b.PNG"), b"b").unwrap();
        std::fs::write(temp.path().join("notes.txt"), b"x").unwrap();

        let dataset = DatasetDirectory::open(temp.path()).await.unwrap();
        let images = dataset.images();

        assert_eq!(images.len(), 2);
        let nested = images.iter().find(|i| i.file_name() == "b.PNG").unwrap();
        assert_eq!(nested.subfolders, vec!["kept", "nested"]);
        assert!(dataset.exists_with_prefix("a"));
        assert!(dataset.exists_with_prefix("b.P"));
        assert!(!dataset.exists_with_prefix("notes"));
    }

    #[tokio::test]
    async fn test_open_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("fresh");

        let dataset = DatasetDirectory::open(&root).await.unwrap();

        assert!(root.is_dir());
        assert!(dataset.is_empty());
    }

    #[tokio::test]
    async fn test_create_writes_pair_and_updates_index() {
        let temp = TempDir::new().unwrap();
        let dataset = DatasetDirectory::open(temp.path()).await.unwrap();

        assert!(!dataset.exists_with_prefix("alphaxyz"));

        let path = dataset
            .create(b"webp".to_vec(), "alphaxyz_xyz.webp", &sample_metadata())
            .await
            .unwrap();

        assert_eq!(path, temp.path().join("alphaxyz_xyz.webp"));
        assert_eq!(std::fs::read(&path).unwrap(), b"webp");

        let sidecar = std::fs::read_to_string(temp.path().join("alphaxyz_xyz.webp.json")).unwrap();
        let parsed: ItemMetadata = serde_json::from_str(&sidecar).unwrap();
        assert_eq!(parsed, sample_metadata());

        assert!(dataset.exists_with_prefix("alphaxyz"));
        assert!(!dataset.exists_with_prefix("alphaxy_"));
        assert_eq!(dataset.len(), 1);

        // Only the pair remains, no temp files
        let entries = std::fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(entries, 2);
    }

    #[tokio::test]
    async fn test_create_rejects_path_names() {
        let temp = TempDir::new().unwrap();
        let dataset = DatasetDirectory::open(temp.path()).await.unwrap();

        let result = dataset
            .create(b"x".to_vec(), "../escape.jpg", &sample_metadata())
            .await;

        assert!(matches!(result, Err(StoreError::InvalidName(_))));
        assert!(dataset.is_empty());
    }

    #[tokio::test]
    async fn test_failed_image_persist_leaves_no_sidecar() {
        let temp = TempDir::new().unwrap();
        let dataset = DatasetDirectory::open(temp.path()).await.unwrap();

        // A directory in the image's place makes the final rename fail
        std::fs::create_dir(temp.path().join("blocked.jpg")).unwrap();
        std::fs::write(temp.path().join("blocked.jpg").join("inner"), b"x").unwrap();

        let result = dataset
            .create(b"x".to_vec(), "blocked.jpg", &sample_metadata())
            .await;

        assert!(matches!(result, Err(StoreError::Persist { .. })));
        assert!(!temp.path().join("blocked.jpg.json").exists());
        assert!(!dataset.exists_with_prefix("blocked"));
    }

    #[tokio::test]
    async fn test_concurrent_creates_do_not_collide() {
        let temp = TempDir::new().unwrap();
        let dataset = std::sync::Arc::new(DatasetDirectory::open(temp.path()).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..16 {
            let dataset = dataset.clone();
            handles.push(tokio::spawn(async move {
                dataset
                    .create(vec![i as u8; 64], &format!("src{}_{}.jpg", i, i), &sample_metadata())
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(dataset.len(), 16);
        for i in 0..16 {
            let bytes = std::fs::read(temp.path().join(format!("src{}_{}.jpg", i, i))).unwrap();
            assert_eq!(bytes, vec![i as u8; 64]);
        }
    }
}
