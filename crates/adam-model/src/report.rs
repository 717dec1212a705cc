//! Per-run derivation accounting.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a row was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DefectKind {
    MissingSubject,
    MissingDate { column: String },
    UnparsableDate { column: String, value: String },
    InsufficientPrecision { column: String, value: String },
    InvalidNumber { column: String, value: String },
}

impl fmt::Display for DefectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSubject => write!(f, "missing subject identifier"),
            Self::MissingDate { column } => write!(f, "{column} is empty"),
            Self::UnparsableDate { column, value } => {
                write!(f, "{column} value '{value}' is not a valid date")
            }
            Self::InsufficientPrecision { column, value } => {
                write!(f, "{column} value '{value}' is too incomplete")
            }
            Self::InvalidNumber { column, value } => {
                write!(f, "{column} value '{value}' is not numeric")
            }
        }
    }
}

/// A skipped input row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDefect {
    pub source: String,
    /// Zero-based row index in the input table.
    pub row: usize,
    pub subject: Option<String>,
    pub kind: DefectKind,
}

/// Row accounting for one input table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub source: String,
    pub rows: usize,
    /// Rows that produced a candidate or output record.
    pub emitted: usize,
    /// Rows rejected by the validity rule.
    pub filtered: usize,
    /// Data defects reported against the table's rows.
    pub defects: usize,
}

/// Outcome of one dataset derivation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DerivationReport {
    pub dataset: String,
    pub records: usize,
    pub sources: Vec<SourceSummary>,
    pub defects: Vec<RowDefect>,
    /// Subjects with no evidence for the best-evidence date.
    pub unresolved_subjects: usize,
}

impl DerivationReport {
    pub fn new(dataset: &str) -> Self {
        Self {
            dataset: dataset.to_string(),
            ..Self::default()
        }
    }

    pub fn defect_count(&self) -> usize {
        self.defects.len()
    }

    pub fn has_defects(&self) -> bool {
        !self.defects.is_empty()
    }
}
