// src/error.rs

use std::{fmt, io, path::PathBuf};
use thiserror::Error;

/// A raw field could not be coerced into its typed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed value {value:?}: {reason}")]
pub struct MalformedValueError {
    pub value: String,
    pub reason: String,
}

impl MalformedValueError {
    pub fn new(value: &str, reason: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failures raised by a `HistoricalStore` engine.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error at `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("glob error: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("year {0} is already committed")]
    AlreadyCommitted(i32),
    #[error("year {got} is out of order, next committable year is {expected}")]
    OutOfOrder { expected: i32, got: i32 },
    #[error("append rejected: {0}")]
    Rejected(String),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Everything that can stop one year from being loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("retrieval of {target} failed: {reason}")]
    Retrieval { target: String, reason: String },
    #[error("invalid archive: {reason}")]
    ArchiveFormat { reason: String },
    #[error("archive {target} holds no tabular entries")]
    EmptyArchive { target: String },
    #[error("table `{table}` column `{column}`: {reason}")]
    SchemaMismatch {
        table: String,
        column: String,
        reason: String,
    },
    #[error("table `{table}` row {row} column `{column}`: {source}")]
    MalformedValue {
        table: String,
        row: usize,
        column: String,
        #[source]
        source: MalformedValueError,
    },
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl LoadError {
    pub fn retrieval(target: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Retrieval {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    pub fn archive_format(reason: impl fmt::Display) -> Self {
        Self::ArchiveFormat {
            reason: reason.to_string(),
        }
    }

    pub fn schema_mismatch(table: &str, column: &str, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            table: table.to_string(),
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    /// Transport failures may succeed on a later attempt; nothing else will.
    pub fn is_transient(&self) -> bool {
        matches!(self, LoadError::Retrieval { .. })
    }
}

/// A run that stopped early. Years committed before `year` stay final.
#[derive(Debug)]
pub struct RunFailure {
    pub committed: usize,
    pub year: Option<i32>,
    pub source: LoadError,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(
                f,
                "load of year {} failed after committing {} year(s): {}",
                year, self.committed, self.source
            ),
            None => write!(f, "could not plan the load: {}", self.source),
        }
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
