//! Error types for transport file operations.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum XptError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("invalid XPT file: {message}")]
    InvalidFormat { message: String },

    #[error("missing header: expected {expected}")]
    MissingHeader { expected: &'static str },

    #[error("invalid NAMESTR at index {index}: {message}")]
    InvalidNamestr { index: usize, message: String },

    #[error("dataset name '{name}' must be 1 to 8 characters")]
    InvalidDatasetName { name: String },

    #[error("dataset label exceeds 40 characters: {label}")]
    DatasetLabelTooLong { label: String },

    #[error("variable name '{name}' must be 1 to 8 characters")]
    InvalidVariableName { name: String },

    #[error("variable label for '{name}' exceeds 40 characters")]
    VariableLabelTooLong { name: String },

    #[error("duplicate variable name: {name}")]
    DuplicateVariable { name: String },

    #[error("variable {name} has zero length")]
    ZeroLength { name: String },

    #[error("row length mismatch: expected {expected}, got {actual}")]
    RowLengthMismatch { expected: usize, actual: usize },

    #[error("value in row {row} does not match the type of variable {name}")]
    TypeMismatch { name: String, row: usize },

    #[error("header timestamp '{value}' is not in ddMMMyy:hh:mm:ss form")]
    InvalidTimestamp { value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, XptError>;

impl XptError {
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    pub fn missing_header(expected: &'static str) -> Self {
        Self::MissingHeader { expected }
    }

    pub fn invalid_dataset_name(name: impl Into<String>) -> Self {
        Self::InvalidDatasetName { name: name.into() }
    }

    pub fn invalid_variable_name(name: impl Into<String>) -> Self {
        Self::InvalidVariableName { name: name.into() }
    }

    pub fn duplicate_variable(name: impl Into<String>) -> Self {
        Self::DuplicateVariable { name: name.into() }
    }

    pub fn zero_length(name: impl Into<String>) -> Self {
        Self::ZeroLength { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = XptError::invalid_format("test message");
        assert_eq!(format!("{err}"), "invalid XPT file: test message");

        let err = XptError::missing_header("LIBRARY HEADER");
        assert_eq!(format!("{err}"), "missing header: expected LIBRARY HEADER");
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let xpt_err: XptError = io_err.into();
        assert!(matches!(xpt_err, XptError::Io(_)));
    }
}
