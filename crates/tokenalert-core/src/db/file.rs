//! File-backed state store

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{parse_stored, StateStore};
use crate::error::{Error, Result};
use crate::models::Price;

/// Keeps the last price in a small text file
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Store at `path`; the file and its directories are created on first save
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Location of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<Option<Price>> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) => parse_stored(&raw).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::state_read(format!("{}: {e}", self.path.display()))),
        }
    }

    async fn save(&self, price: Price) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::state_write(format!("{}: {e}", parent.display())))?;
        }

        // Write then rename so readers never see a partial value
        let tmp = self.temp_path();
        fs::write(&tmp, price.to_string())
            .await
            .map_err(|e| Error::state_write(format!("{}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::state_write(format!("{}: {e}", self.path.display())))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_absent_file_is_no_prior_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state.txt"));

        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_creates_directories_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state-container").join("state.txt"));

        store.save(230_000).await.unwrap();
        store.save(235_000).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(235_000));
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.txt");
        std::fs::write(&path, "not a number").unwrap();

        let store = FileStateStore::new(&path);
        assert!(matches!(store.load().await, Err(Error::StateRead(_))));
    }
}
