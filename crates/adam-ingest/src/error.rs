//! Error types for input loading.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === CSV Errors ===
    #[error("failed to read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("CSV file has no header row: {path}")]
    EmptyCsv { path: PathBuf },

    #[error("duplicate column '{column}' in {path}")]
    DuplicateColumn { column: String, path: PathBuf },

    // === Discovery Errors ===
    #[error("both {first} and {second} provide input '{name}'")]
    AmbiguousInput {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    // === DataFrame Errors ===
    #[error("failed to build table from {path}: {source}")]
    DataFrame {
        path: PathBuf,
        #[source]
        source: polars::error::PolarsError,
    },
}

pub type Result<T> = std::result::Result<T, IngestError>;
