//! Error types for the failures callers need to tell apart. Everything else
//! travels as `anyhow::Error` with context attached at stage boundaries.

use crate::table::DataType;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// First column that failed schema validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaMismatch {
    pub column: String,
    pub expected: DataType,
    /// `None` when the column is missing altogether.
    pub found: Option<DataType>,
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.found {
            Some(found) => write!(
                f,
                "column '{}' does not match expected type '{}'. Found: {}",
                self.column, self.expected, found
            ),
            None => write!(
                f,
                "column '{}' with expected type '{}' is missing",
                self.column, self.expected
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("schema validation failed: {0}")]
    SchemaValidation(SchemaMismatch),
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("row {row} has {found} cells, expected {expected}")]
    RowWidth { row: usize, expected: usize, found: usize },
    #[error("column '{column}' has {found} rows, expected {expected}")]
    ColumnLength { column: String, expected: usize, found: usize },
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("config value '{0}' is required")]
    Missing(&'static str),
}

#[derive(Debug, Error)]
#[error("invalid start date '{input}': expected YYYY-MM-DD")]
pub struct DateParseError {
    pub input: String,
    #[source]
    pub source: time::error::Parse,
}

/// A listing page request failed. Unlike a bad listing item this ends the
/// extraction: the feed can no longer say which posts exist.
#[derive(Debug, Error)]
#[error("listing request for r/{subreddit} failed: {reason}")]
pub struct ListingError {
    pub subreddit: String,
    /// Full error chain of the failed request.
    pub reason: String,
}
