use card_template::Record;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordsError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Malformed import: {0}")]
    MalformedImport(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, RecordsError>;

/// An ordered batch of records plus the column order they came with
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

impl RecordSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keep only the first `count` records
    pub fn truncate(&mut self, count: usize) {
        self.records.truncate(count);
    }
}
