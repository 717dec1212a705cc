//! Best-evidence date resolution.
//!
//! Each [`EvidenceSource`] is run through the adapter to produce
//! [`Candidate`]s; the union of all candidates is reduced to one
//! [`ResolvedDate`] per subject.

pub mod adapter;
pub mod predicate;
pub mod reducer;
pub mod source;

use adam_model::DatePrecision;
use chrono::NaiveDate;

pub use adapter::{Extraction, extract};
pub use predicate::{evaluate, is_placebo, is_valid_dose};
pub use reducer::{ResolvedDate, reduce};
pub use source::{
    EXPOSURE_EVIDENCE_TAG, EvidenceSource, SourceRanking, ValidityRule, check_min_precision,
    last_alive_sources,
};

/// One usable dated record from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub subject: String,
    /// Imputed to the first day of the collected period.
    pub date: NaiveDate,
    pub precision: DatePrecision,
    pub source: String,
    pub variable: String,
    pub sequence: Option<i64>,
    /// Zero-based row in the source table.
    pub row: usize,
}
