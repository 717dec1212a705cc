//! Treatment exposure window derivation.
//!
//! First and last valid exposure per subject, from the exposure log's start
//! and end timestamps after time imputation.

use std::collections::BTreeMap;

use adam_common::parse_i64;
use adam_model::{DefectKind, ExposureConfig, RowDefect, SourceSummary};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::DataFrame;
use tracing::debug;

use crate::datetime::{ImputedDateTime, TimeBound, parse_partial_datetime};
use crate::error::Result;
use crate::evidence::{EvidenceSource, ValidityRule, evaluate};
use crate::frame::{RowRef, TableView, TextColumns};
use crate::observer::DerivationObserver;

pub const EXPOSURE_TAG: &str = "EX";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExposureWindow {
    pub start: Option<ImputedDateTime>,
    pub end: Option<ImputedDateTime>,
}

impl ExposureWindow {
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start.map(|start| start.date())
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end.map(|end| end.date())
    }

    /// Inclusive treatment duration in days.
    pub fn duration_days(&self) -> Option<i64> {
        let days = self
            .end_date()?
            .signed_duration_since(self.start_date()?)
            .num_days();
        Some(days + 1)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExposureDerivation {
    pub windows: BTreeMap<String, ExposureWindow>,
    pub summary: SourceSummary,
    pub defects: Vec<RowDefect>,
}

/// The exposure log as a declared source: dose validity decides usable rows.
pub fn exposure_source(config: &ExposureConfig) -> EvidenceSource {
    EvidenceSource::new(EXPOSURE_TAG, "EXSTDTC").with_rule(ValidityRule::ValidDose {
        dose: "EXDOSE".to_string(),
        treatment: "EXTRT".to_string(),
        placebo_markers: config.placebo_markers.clone(),
    })
}

const END_COLUMN: &str = "EXENDTC";
const SEQUENCE_COLUMN: &str = "EXSEQ";

/// Ordering key of one exposure timestamp: the timestamp, then the record
/// sequence (row position when there is none).
type Keyed = (NaiveDateTime, i64, ImputedDateTime);

pub fn derive_windows(
    ex: &DataFrame,
    config: &ExposureConfig,
    observer: &mut dyn DerivationObserver,
) -> Result<ExposureDerivation> {
    let source = exposure_source(config);
    let view = TableView::new(EXPOSURE_TAG, ex);
    let mut columns: Vec<&str> = source.required_columns();
    let has_end = view.has_column(END_COLUMN);
    if has_end {
        columns.push(END_COLUMN);
    }
    if view.has_column(SEQUENCE_COLUMN) {
        columns.push(SEQUENCE_COLUMN);
    }
    let rows = TextColumns::load(&view, &columns)?;

    let mut derivation = ExposureDerivation {
        summary: SourceSummary {
            source: EXPOSURE_TAG.to_string(),
            rows: rows.height(),
            ..SourceSummary::default()
        },
        ..ExposureDerivation::default()
    };
    let mut firsts: BTreeMap<String, Keyed> = BTreeMap::new();
    let mut lasts: BTreeMap<String, Keyed> = BTreeMap::new();

    for row in rows.rows() {
        let subject = row.text(&source.subject_column);
        if subject.is_empty() {
            report(&mut derivation, observer, &row, None, DefectKind::MissingSubject);
            continue;
        }
        if !evaluate(&source.rule, &source, &row) {
            derivation.summary.filtered += 1;
            continue;
        }

        // Each column stands alone: a malformed end keeps a usable start.
        let mut defective = false;
        let start = match impute(&row, &source.date_column, TimeBound::Start) {
            Ok(start) => start,
            Err(kind) => {
                report(&mut derivation, observer, &row, Some(subject), kind);
                defective = true;
                None
            }
        };
        let end = if has_end {
            match impute(&row, END_COLUMN, TimeBound::End) {
                Ok(end) => end,
                Err(kind) => {
                    report(&mut derivation, observer, &row, Some(subject), kind);
                    defective = true;
                    None
                }
            }
        } else {
            start
        };
        if start.is_none() && end.is_none() {
            if !defective {
                derivation.summary.filtered += 1;
            }
            continue;
        }

        let sequence = parse_i64(row.text(SEQUENCE_COLUMN)).unwrap_or(row.index() as i64);
        if let Some(start) = start {
            let keyed = (start.value, sequence, start);
            firsts
                .entry(subject.to_string())
                .and_modify(|current| {
                    if (keyed.0, keyed.1) < (current.0, current.1) {
                        *current = keyed;
                    }
                })
                .or_insert(keyed);
        }
        if let Some(end) = end {
            let keyed = (end.value, sequence, end);
            lasts
                .entry(subject.to_string())
                .and_modify(|current| {
                    if (keyed.0, keyed.1) > (current.0, current.1) {
                        *current = keyed;
                    }
                })
                .or_insert(keyed);
        }
        derivation.summary.emitted += 1;
    }

    for (subject, (_, _, start)) in firsts {
        derivation.windows.entry(subject).or_default().start = Some(start);
    }
    for (subject, (_, _, end)) in lasts {
        derivation.windows.entry(subject).or_default().end = Some(end);
    }

    debug!(
        subjects = derivation.windows.len(),
        has_end_column = has_end,
        "derived exposure windows"
    );
    observer.source_extracted(&derivation.summary);
    Ok(derivation)
}

/// Imputed timestamp of one column; blank and partial dates give `None`,
/// malformed values are defects.
fn impute(
    row: &RowRef<'_>,
    column: &str,
    bound: TimeBound,
) -> std::result::Result<Option<ImputedDateTime>, DefectKind> {
    let raw = row.text(column);
    if raw.is_empty() {
        return Ok(None);
    }
    let parsed = parse_partial_datetime(raw).map_err(|_| DefectKind::UnparsableDate {
        column: column.to_string(),
        value: raw.to_string(),
    })?;
    Ok(parsed.impute_time(bound))
}

fn report(
    derivation: &mut ExposureDerivation,
    observer: &mut dyn DerivationObserver,
    row: &RowRef<'_>,
    subject: Option<&str>,
    kind: DefectKind,
) {
    let defect = RowDefect {
        source: EXPOSURE_TAG.to_string(),
        row: row.index(),
        subject: subject.map(str::to_string),
        kind,
    };
    derivation.summary.defects += 1;
    observer.row_skipped(&defect);
    derivation.defects.push(defect);
}
