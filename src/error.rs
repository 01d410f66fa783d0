// Error types for the agenda store

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error(transparent)]
    Database(rusqlite::Error),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Lookup requested a column that cannot be searched
    #[error("invalid column '{column}', expected one of: {}", .valid.join(", "))]
    InvalidLookupColumn { column: String, valid: Vec<String> },

    #[error("missing header column: {0}")]
    MissingHeader(String),

    #[error("row {row}: missing required field '{column}'")]
    MissingField { row: usize, column: String },

    #[error("row {row}: duplicate of row {first}")]
    DuplicateRow { row: usize, first: usize },

    #[error("row {row}: sub-session has no preceding session")]
    OrphanSubSession { row: usize },

    #[error("invalid row: {0}")]
    InvalidRow(String),

    #[error("workbook has no worksheets: {0}")]
    EmptyWorkbook(PathBuf),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::ConstraintViolation) => Error::ConstraintViolation(err.to_string()),
            _ => Error::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
