//! JSON document on local disk, replaced atomically on every save.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::store::{ResumeStore, STORAGE_KEY};

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store at `<data_dir>/<STORAGE_KEY>.json`. The directory is created on first save.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(format!("{STORAGE_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResumeStore for FileStore {
    async fn load(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", self.path.display())),
        }
    }

    async fn save(&self, document: &str) -> Result<()> {
        let path = self.path.clone();
        let document = document.to_string();
        tokio::task::spawn_blocking(move || atomic_write(&path, &document))
            .await
            .context("spawn_blocking failed in file store save")??;
        debug!("Saved master resume to {}", self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file {}", self.path().display())
    }
}

/// Writes to a temp file beside `path`, then renames it over `path`, so readers
/// never see a partially-written document.
fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("Cannot determine parent directory for {}", path.display()))?;
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create {}", parent.display()))?;

    let mut temp_file = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
    temp_file
        .write_all(content.as_bytes())
        .with_context(|| format!("Failed to write temporary file for {}", path.display()))?;
    temp_file
        .flush()
        .with_context(|| format!("Failed to flush temporary file for {}", path.display()))?;
    temp_file
        .persist(path)
        .with_context(|| format!("Failed to persist temporary file to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        store.save("{\"version\":\"1.0\"}").await.unwrap();
        assert_eq!(
            store.load().await.unwrap().as_deref(),
            Some("{\"version\":\"1.0\"}")
        );

        store.save("{}").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("{}"));
        assert!(store.path().ends_with("resumecrafter_master_resume.json"));
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.save("{}").await.unwrap();
        store.save("{}").await.unwrap();
        let count = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 1);
    }
}
