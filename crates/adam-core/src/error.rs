use polars::error::PolarsError;
use thiserror::Error;

/// Fatal derivation failures. Row-level problems never surface here; they are
/// skipped and reported through the observer instead.
#[derive(Debug, Error)]
pub enum DeriveError {
    #[error("{table} is missing required column {column}")]
    MissingColumn { table: String, column: String },

    #[error("{table} has {count} rows for subject {subject}; expected exactly one")]
    DuplicateSubject {
        table: String,
        subject: String,
        count: usize,
    },

    #[error("{table} row {row} has no subject identifier")]
    MissingSubjectKey { table: String, row: usize },

    #[error("join of {table} produced {actual} rows for {expected} subjects")]
    Cardinality {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, DeriveError>;
