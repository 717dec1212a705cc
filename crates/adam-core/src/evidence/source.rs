//! Evidence source declarations.
//!
//! A source is plain data: which table columns carry the subject, the date and
//! the tie-break sequence, which rule decides a row is usable, and how complete
//! the date must be. Adding a source is a matter of adding a declaration.

use std::collections::BTreeSet;

use adam_model::{DatePrecision, EvidenceConfig};

use crate::error::{DeriveError, Result};

/// Row-level validity rule.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidityRule {
    /// Every row is usable.
    Always,
    /// The source's date column reaches the source's minimum precision by shape.
    DateShape,
    /// At least one of the two columns is non-missing.
    NotBothMissing { first: String, second: String },
    /// Dose strictly positive, or zero on a treatment whose label contains one
    /// of the placebo markers (case-insensitive).
    ValidDose {
        dose: String,
        treatment: String,
        placebo_markers: Vec<String>,
    },
    All(Vec<ValidityRule>),
}

impl ValidityRule {
    /// Columns the rule reads, excluding the source's date column.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Self::Always | Self::DateShape => Vec::new(),
            Self::NotBothMissing { first, second } => vec![first.as_str(), second.as_str()],
            Self::ValidDose {
                dose, treatment, ..
            } => vec![dose.as_str(), treatment.as_str()],
            Self::All(rules) => rules.iter().flat_map(Self::columns).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceSource {
    /// Short source tag, e.g. `VS`; reported as the winning domain.
    pub tag: String,
    pub subject_column: String,
    pub date_column: String,
    /// Intra-source tie-break; the row position is used when absent.
    pub sequence_column: Option<String>,
    pub rule: ValidityRule,
    pub min_precision: DatePrecision,
}

impl EvidenceSource {
    pub fn new(tag: &str, date_column: &str) -> Self {
        Self {
            tag: tag.to_string(),
            subject_column: "USUBJID".to_string(),
            date_column: date_column.to_string(),
            sequence_column: None,
            rule: ValidityRule::DateShape,
            min_precision: DatePrecision::Day,
        }
    }

    pub fn with_sequence(mut self, column: &str) -> Self {
        self.sequence_column = Some(column.to_string());
        self
    }

    pub fn with_rule(mut self, rule: ValidityRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_min_precision(mut self, precision: DatePrecision) -> Self {
        self.min_precision = precision;
        self
    }

    /// Every column that must exist in the source table.
    pub fn required_columns(&self) -> Vec<&str> {
        let mut columns = vec![self.subject_column.as_str(), self.date_column.as_str()];
        columns.extend(self.sequence_column.as_deref());
        columns.extend(self.rule.columns());
        columns
    }
}

/// Tag of the synthetic source carrying each subject's derived last exposure.
pub const EXPOSURE_EVIDENCE_TAG: &str = "ADSL";

/// The last-known-alive sources: vital signs with a result, adverse-event
/// onsets, disposition events, and the subject's own last exposure.
pub fn last_alive_sources(config: &EvidenceConfig) -> Vec<EvidenceSource> {
    let sources = vec![
        EvidenceSource::new("VS", "VSDTC")
            .with_sequence("VSSEQ")
            .with_rule(ValidityRule::All(vec![
                ValidityRule::DateShape,
                ValidityRule::NotBothMissing {
                    first: "VSSTRESN".to_string(),
                    second: "VSSTRESC".to_string(),
                },
            ])),
        EvidenceSource::new("AE", "AESTDTC").with_sequence("AESEQ"),
        EvidenceSource::new("DS", "DSSTDTC").with_sequence("DSSEQ"),
        EvidenceSource::new(EXPOSURE_EVIDENCE_TAG, "TRTEDTM"),
    ];
    sources
        .into_iter()
        .map(|source| match config.min_precision.get(&source.tag) {
            Some(precision) => source.with_min_precision(*precision),
            None => source,
        })
        .collect()
}

/// Rejects `min_precision` entries that name no declared source.
pub fn check_min_precision(config: &EvidenceConfig, sources: &[EvidenceSource]) -> Result<()> {
    for tag in config.min_precision.keys() {
        if !sources.iter().any(|source| &source.tag == tag) {
            return Err(DeriveError::InvalidConfig(format!(
                "min_precision names unknown evidence source '{tag}'"
            )));
        }
    }
    Ok(())
}

/// Tie-break rank of each source tag; lower ranks win ties.
#[derive(Debug, Clone)]
pub struct SourceRanking {
    order: Vec<String>,
}

impl SourceRanking {
    /// Tags listed in `priority` come first, in that order; remaining
    /// declared sources follow in declaration order.
    pub fn new<S: AsRef<str>>(priority: &[S], sources: &[EvidenceSource]) -> Result<Self> {
        let declared: BTreeSet<&str> = sources.iter().map(|s| s.tag.as_str()).collect();
        let mut order: Vec<String> = Vec::new();
        for tag in priority {
            let tag = tag.as_ref();
            if !declared.contains(tag) {
                return Err(DeriveError::InvalidConfig(format!(
                    "priority names unknown evidence source '{tag}'"
                )));
            }
            if order.iter().any(|existing| existing == tag) {
                return Err(DeriveError::InvalidConfig(format!(
                    "evidence source '{tag}' appears twice in priority"
                )));
            }
            order.push(tag.to_string());
        }
        for source in sources {
            if !order.contains(&source.tag) {
                order.push(source.tag.clone());
            }
        }
        Ok(Self { order })
    }

    pub fn rank(&self, tag: &str) -> usize {
        self.order
            .iter()
            .position(|candidate| candidate == tag)
            .unwrap_or(self.order.len())
    }

    pub fn tags(&self) -> &[String] {
        &self.order
    }
}
