use tantivy::TantivyError;
use tantivy::directory::error::OpenDirectoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] TantivyError),

    /// Another writer held the index lock for every attempt.
    #[error(
        "Index write conflict: writer lock still busy after {attempts} attempts\nSuggestion: wait for the other build to finish and retry"
    )]
    WriteConflict { attempts: u32 },

    #[error("Invalid field value for {field}: {reason}")]
    InvalidFieldValue { field: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory error: {0}")]
    Directory(#[from] OpenDirectoryError),
}

pub type StorageResult<T> = Result<T, StorageError>;
