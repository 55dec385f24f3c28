pub mod fs;

use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::ApplicationRecord;

pub use fs::FileDatasetStore;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not flush CSV buffer: {0}")]
    Flush(String),
}

/// Durable home of the training dataset.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Current dataset, or `None` if nothing has been written yet.
    async fn load(&self) -> Result<Option<Vec<ApplicationRecord>>, DatasetError>;

    /// Replace the dataset with `records`.
    async fn save(&self, records: &[ApplicationRecord]) -> Result<(), DatasetError>;

    /// Human-readable location for logs.
    fn location(&self) -> String;
}

/// Parse CSV rows with a header line.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<ApplicationRecord>, DatasetError> {
    let mut reader = csv::Reader::from_reader(reader);
    let records = reader.deserialize().collect::<Result<Vec<ApplicationRecord>, _>>()?;
    Ok(records)
}

/// Serialize records as CSV with wire-name headers.
pub fn write_records(records: &[ApplicationRecord]) -> Result<Vec<u8>, DatasetError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| DatasetError::Flush(e.to_string()))
}

/// Read a CSV file into records.
pub async fn read_csv_file(path: &Path) -> Result<Vec<ApplicationRecord>, DatasetError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_records(bytes.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::sample_record;

    #[test]
    fn test_csv_roundtrip_keeps_labels() {
        let records = vec![sample_record(1, Some(1)), sample_record(2, Some(0)), sample_record(3, None)];
        let bytes = write_records(&records).unwrap();
        let parsed = read_records(bytes.as_slice()).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_malformed_csv_is_error() {
        let data = "SK_ID_CURR,TARGET\nnot-a-number,1\n";
        assert!(matches!(read_records(data.as_bytes()), Err(DatasetError::Csv(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let res = read_csv_file(Path::new("/definitely/not/here.csv")).await;
        assert!(matches!(res, Err(DatasetError::Io { .. })));
    }
}
