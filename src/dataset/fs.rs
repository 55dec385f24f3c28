use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{read_records, write_records, DatasetError, DatasetStore};
use crate::models::ApplicationRecord;

/// Training dataset kept as a single CSV file.
///
/// Writes go to a sibling temp file that is then renamed over the target,
/// so a concurrent reader sees either the old or the new dataset in full.
/// Two overlapping writers still race: the last rename wins.
#[derive(Debug, Clone)]
pub struct FileDatasetStore {
    path: PathBuf,
}

impl FileDatasetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.tmp", std::process::id()));
        self.path.with_file_name(name)
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> DatasetError {
        DatasetError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[async_trait]
impl DatasetStore for FileDatasetStore {
    async fn load(&self) -> Result<Option<Vec<ApplicationRecord>>, DatasetError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(read_records(bytes.as_slice())?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(&self.path, e)),
        }
    }

    async fn save(&self, records: &[ApplicationRecord]) -> Result<(), DatasetError> {
        let bytes = write_records(records)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(parent, e))?;
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| self.io_error(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.io_error(&self.path, e));
        }

        tracing::info!(path = %self.path.display(), rows = records.len(), "Training dataset written");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::sample_record;

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDatasetStore::new(dir.path().join("training.csv"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDatasetStore::new(dir.path().join("nested").join("training.csv"));

        store.save(&[sample_record(1, Some(0))]).await.unwrap();
        let second = vec![sample_record(2, Some(1)), sample_record(3, Some(0))];
        store.save(&second).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(second));
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
