//! Error types for the translation-unit engine
//!
//! File-scoped failures (`ParseError`, `CacheError`, unreadable files) are
//! turned into diagnostics by the builder and never abort a batch.
//! Project-scoped failures surface as [`TuError`] and end the current
//! operation without a partial commit.

use crate::parsing::LanguageId;
use crate::storage::StorageError;
use crate::types::Diagnostic;
use crate::unit::TranslationUnit;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum TuError {
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration: {reason}")]
    ConfigError { reason: String },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("{0}")]
    General(String),
}

impl TuError {
    /// Stable identifier for JSON output.
    pub fn status_code(&self) -> String {
        match self {
            Self::FileRead { .. } => "FILE_READ_ERROR",
            Self::FileWrite { .. } => "FILE_WRITE_ERROR",
            Self::ConfigError { .. } => "CONFIG_ERROR",
            Self::Cache(CacheError::Corruption { .. }) => "CACHE_CORRUPTION",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Storage(StorageError::WriteConflict { .. }) => "INDEX_WRITE_CONFLICT",
            Self::Storage(_) => "INDEX_ERROR",
            Self::Query(QueryError::NotIndexed { .. }) => "NOT_INDEXED",
            Self::Query(QueryError::Cancelled) => "CANCELLED",
            Self::Query(_) => "QUERY_ERROR",
            Self::General(_) => "GENERAL_ERROR",
        }
        .to_string()
    }

    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Storage(StorageError::WriteConflict { .. }) => vec![
                "Another process is writing the symbol index, retry once it finishes",
                "Nothing was committed, the index is still consistent",
            ],
            Self::Storage(_) => vec![
                "Run 'tu build --force' to rebuild the symbol index",
                "Check disk space and permissions in the index directory",
            ],
            Self::Cache(_) => vec![
                "Run 'tu cache clear' and build again",
                "Check permissions of the cache directory",
            ],
            Self::Query(QueryError::NotIndexed { .. }) => {
                vec!["Run 'tu build' on the file before querying it"]
            }
            Self::FileRead { .. } => vec![
                "Check that the file exists and you have read permissions",
                "Ensure the file is not locked by another process",
            ],
            Self::ConfigError { .. } => {
                vec!["Run 'tu init --force' to regenerate .tu/settings.toml"]
            }
            _ => vec![],
        }
    }
}

/// Failures reported by a language parser
#[derive(Error, Debug)]
pub enum ParseError {
    /// The toolchain behind this language is missing or unreachable.
    #[error(
        "{language} parser unavailable for '{path}': {reason}\nSuggestion: install the toolchain or disable languages.{language} in .tu/settings.toml"
    )]
    ParserUnavailable {
        language: LanguageId,
        path: String,
        reason: String,
    },

    /// The toolchain ran but rejected the input. Whatever it produced is kept.
    #[error("{language} parser rejected '{path}': {reason}")]
    ParseExecution {
        language: LanguageId,
        path: String,
        reason: String,
        diagnostics: Vec<Diagnostic>,
        partial: Option<Box<TranslationUnit>>,
    },
}

impl ParseError {
    pub fn path(&self) -> &str {
        match self {
            Self::ParserUnavailable { path, .. } | Self::ParseExecution { path, .. } => path,
        }
    }
}

/// Failures of the on-disk cache store
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O failed for '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Unreadable or invalid entry; the builder treats it as missing.
    #[error("Cache entry for '{file}' is corrupted: {reason}")]
    Corruption { file: String, reason: String },

    #[error("Failed to encode cache entry for '{file}': {reason}")]
    Encode { file: String, reason: String },
}

/// Failures of read-only queries
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("'{path}' has not been built yet\nSuggestion: run 'tu build {path}' first")]
    NotIndexed { path: String },

    #[error("Query was cancelled")]
    Cancelled,

    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub type TuResult<T> = Result<T, TuError>;

pub type ParseResult<T> = Result<T, ParseError>;

pub type CacheResult<T> = Result<T, CacheError>;

pub type QueryResult<T> = Result<T, QueryError>;

/// Helper trait for attaching a path to I/O failures
pub trait ErrorContext<T> {
    fn with_read_path(self, path: &std::path::Path) -> Result<T, TuError>;

    fn with_write_path(self, path: &std::path::Path) -> Result<T, TuError>;
}

impl<T> ErrorContext<T> for Result<T, std::io::Error> {
    fn with_read_path(self, path: &std::path::Path) -> Result<T, TuError> {
        self.map_err(|source| TuError::FileRead {
            path: path.to_path_buf(),
            source,
        })
    }

    fn with_write_path(self, path: &std::path::Path) -> Result<T, TuError> {
        self.map_err(|source| TuError::FileWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_distinguish_taxonomy() {
        let conflict = TuError::Storage(StorageError::WriteConflict { attempts: 3 });
        assert_eq!(conflict.status_code(), "INDEX_WRITE_CONFLICT");
        assert!(!conflict.recovery_suggestions().is_empty());

        let corrupt = TuError::Cache(CacheError::Corruption {
            file: "a.py".into(),
            reason: "bad magic".into(),
        });
        assert_eq!(corrupt.status_code(), "CACHE_CORRUPTION");
        assert!(corrupt.to_string().contains("a.py"));
    }

    #[test]
    fn test_parse_errors_carry_file_context() {
        let err = ParseError::ParserUnavailable {
            language: LanguageId::new("cpp"),
            path: "src/main.cpp".into(),
            reason: "clang not found".into(),
        };
        assert_eq!(err.path(), "src/main.cpp");
        assert!(err.to_string().contains("src/main.cpp"));
        assert!(err.to_string().contains("Suggestion"));
    }
}
