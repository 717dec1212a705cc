//! Subject-level derivations for clinical trial datasets.
//!
//! The central piece is best-evidence date resolution: dated records from
//! several event sources are filtered by per-source validity rules and
//! reduced to the latest date per subject, with source provenance. Around it
//! sit the treatment exposure window, the subject-level (ADSL) join, the
//! disposition (DS) domain build and adverse event summaries.

pub mod adsl;
pub mod ae_query;
pub mod ae_summary;
pub mod datetime;
pub mod ds;
pub mod error;
pub mod evidence;
pub mod exposure;
pub mod frame;
pub mod observer;
pub mod subject;

pub use adsl::{ADSL, AdslInputs, AdslOutput, adsl_spec, derive_adsl};
pub use ae_query::{QueryPlan, QueryResult, execute, parse_question};
pub use ae_summary::{AeSummary, AeSummaryRow, ArmCount, summarize_ae};
pub use datetime::{
    DateTimeError, ImputedDateTime, PartialDateTime, TimeBound, parse_partial_datetime,
};
pub use ds::{DS, DsOutput, derive_ds, ds_spec};
pub use error::{DeriveError, Result};
pub use evidence::{Candidate, EvidenceSource, ResolvedDate, SourceRanking, ValidityRule};
pub use exposure::{ExposureWindow, derive_windows};
pub use observer::{CollectingObserver, DerivationObserver, TracingObserver};
pub use subject::AgeGroup;
