//! Derivation event reporting.
//!
//! Derivations never log row-level problems directly. They hand them to a
//! [`DerivationObserver`], so callers decide whether events go to `tracing`,
//! into a report, or both.

use adam_model::{RowDefect, SourceSummary};
use tracing::{debug, info, warn};

pub trait DerivationObserver {
    /// A row was skipped as a data defect.
    fn row_skipped(&mut self, defect: &RowDefect);

    /// A source finished extraction.
    fn source_extracted(&mut self, _summary: &SourceSummary) {}

    /// A subject ended up without any best-evidence candidate.
    fn subject_unresolved(&mut self, _subject: &str) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver {
    log_data: bool,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include subject identifiers in log events.
    pub fn with_log_data(mut self, enabled: bool) -> Self {
        self.log_data = enabled;
        self
    }

    fn subject<'a>(&self, subject: &'a str) -> &'a str {
        if self.log_data { subject } else { "[REDACTED]" }
    }
}

impl DerivationObserver for TracingObserver {
    fn row_skipped(&mut self, defect: &RowDefect) {
        warn!(
            source = %defect.source,
            row = defect.row,
            subject = self.subject(defect.subject.as_deref().unwrap_or("")),
            reason = %defect.kind,
            "skipped row"
        );
    }

    fn source_extracted(&mut self, summary: &SourceSummary) {
        info!(
            source = %summary.source,
            rows = summary.rows,
            emitted = summary.emitted,
            filtered = summary.filtered,
            defects = summary.defects,
            "source extracted"
        );
    }

    fn subject_unresolved(&mut self, subject: &str) {
        debug!(subject = self.subject(subject), "no best-evidence date");
    }
}

/// Records every event; used by tests and by callers that summarise runs.
#[derive(Debug, Clone, Default)]
pub struct CollectingObserver {
    pub defects: Vec<RowDefect>,
    pub sources: Vec<SourceSummary>,
    pub unresolved: Vec<String>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DerivationObserver for CollectingObserver {
    fn row_skipped(&mut self, defect: &RowDefect) {
        self.defects.push(defect.clone());
    }

    fn source_extracted(&mut self, summary: &SourceSummary) {
        self.sources.push(summary.clone());
    }

    fn subject_unresolved(&mut self, subject: &str) {
        self.unresolved.push(subject.to_string());
    }
}
