//! Event source adapter: turns one source table into candidate records.

use adam_common::parse_i64;
use adam_model::{DefectKind, RowDefect, SourceSummary};
use chrono::NaiveDate;
use polars::prelude::DataFrame;

use crate::datetime::parse_partial_datetime;
use crate::error::Result;
use crate::evidence::Candidate;
use crate::evidence::predicate::evaluate;
use crate::evidence::source::EvidenceSource;
use crate::frame::{RowRef, TableView, TextColumns};
use crate::observer::DerivationObserver;

/// Candidates from one source plus its row accounting.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub candidates: Vec<Candidate>,
    pub summary: SourceSummary,
    pub defects: Vec<RowDefect>,
}

/// Extracts candidates from `table` according to `source`.
///
/// A missing column fails the whole source. Row-level problems are skipped,
/// counted and reported to `observer`.
pub fn extract(
    table: &DataFrame,
    source: &EvidenceSource,
    observer: &mut dyn DerivationObserver,
) -> Result<Extraction> {
    let view = TableView::new(&source.tag, table);
    let rows = TextColumns::load(&view, &source.required_columns())?;

    let mut extraction = Extraction {
        summary: SourceSummary {
            source: source.tag.clone(),
            rows: rows.height(),
            ..SourceSummary::default()
        },
        ..Extraction::default()
    };

    for row in rows.rows() {
        match extract_row(source, &row) {
            RowOutcome::Emitted(candidate) => {
                extraction.summary.emitted += 1;
                extraction.candidates.push(candidate);
            }
            RowOutcome::Filtered => extraction.summary.filtered += 1,
            RowOutcome::Defect(defect) => {
                extraction.summary.defects += 1;
                observer.row_skipped(&defect);
                extraction.defects.push(defect);
            }
        }
    }

    observer.source_extracted(&extraction.summary);
    Ok(extraction)
}

enum RowOutcome {
    Emitted(Candidate),
    Filtered,
    Defect(RowDefect),
}

fn extract_row(source: &EvidenceSource, row: &RowRef<'_>) -> RowOutcome {
    let subject = row.text(&source.subject_column);
    let defect = |kind: DefectKind| {
        RowOutcome::Defect(RowDefect {
            source: source.tag.clone(),
            row: row.index(),
            subject: (!subject.is_empty()).then(|| subject.to_string()),
            kind,
        })
    };

    if subject.is_empty() {
        return defect(DefectKind::MissingSubject);
    }
    if !evaluate(&source.rule, source, row) {
        return RowOutcome::Filtered;
    }

    let raw_date = row.text(&source.date_column);
    if raw_date.is_empty() {
        return defect(DefectKind::MissingDate {
            column: source.date_column.clone(),
        });
    }
    let parsed = match parse_partial_datetime(raw_date) {
        Ok(parsed) => parsed,
        Err(_) => {
            return defect(DefectKind::UnparsableDate {
                column: source.date_column.clone(),
                value: raw_date.to_string(),
            });
        }
    };
    let precision = parsed.date_precision();
    let date: Option<NaiveDate> = parsed.first_date();
    let Some(date) = date.filter(|_| precision >= source.min_precision) else {
        return defect(DefectKind::InsufficientPrecision {
            column: source.date_column.clone(),
            value: raw_date.to_string(),
        });
    };

    let sequence = match source.sequence_column.as_deref().map(|c| row.text(c)) {
        None | Some("") => None,
        Some(text) => match parse_i64(text) {
            Some(sequence) => Some(sequence),
            None => {
                return defect(DefectKind::InvalidNumber {
                    column: source.sequence_column.clone().unwrap_or_default(),
                    value: text.to_string(),
                });
            }
        },
    };

    RowOutcome::Emitted(Candidate {
        subject: subject.to_string(),
        date,
        precision,
        source: source.tag.clone(),
        variable: source.date_column.clone(),
        sequence,
        row: row.index(),
    })
}

#[cfg(test)]
mod tests {
    use adam_model::DatePrecision;
    use polars::prelude::*;

    use super::*;
    use crate::evidence::source::ValidityRule;
    use crate::observer::CollectingObserver;

    fn ae_frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new(
                "USUBJID".into(),
                [Some("S1"), Some("S1"), None, Some("S2"), Some("S2"), Some("S3")],
            ),
            Column::new(
                "AESTDTC".into(),
                [
                    Some("2014-01-05"),
                    Some("2014-02"),
                    Some("2014-03-01"),
                    Some("2014-02-30"),
                    Some("2014-04-01"),
                    Some("2014-05-01"),
                ],
            ),
            Column::new(
                "AESEQ".into(),
                [Some("1"), Some("2"), Some("1"), Some("1"), None, Some("x")],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn emits_filters_and_reports_defects() {
        let source = EvidenceSource::new("AE", "AESTDTC").with_sequence("AESEQ");
        let mut observer = CollectingObserver::new();
        let extraction = extract(&ae_frame(), &source, &mut observer).unwrap();

        assert_eq!(extraction.summary.rows, 6);
        assert_eq!(extraction.summary.emitted, 2);
        assert_eq!(extraction.summary.filtered, 1);
        assert_eq!(extraction.summary.defects, 3);
        assert_eq!(observer.defects.len(), 3);
        assert_eq!(observer.sources, vec![extraction.summary.clone()]);

        let first = &extraction.candidates[0];
        assert_eq!(first.subject, "S1");
        assert_eq!(first.sequence, Some(1));
        assert_eq!(first.variable, "AESTDTC");
        let second = &extraction.candidates[1];
        assert_eq!(second.subject, "S2");
        assert_eq!(second.sequence, None);
        assert_eq!(second.row, 4);

        let kinds: Vec<&DefectKind> = extraction.defects.iter().map(|d| &d.kind).collect();
        assert_eq!(kinds[0], &DefectKind::MissingSubject);
        assert!(matches!(kinds[1], DefectKind::UnparsableDate { .. }));
        assert!(matches!(kinds[2], DefectKind::InvalidNumber { .. }));
    }

    #[test]
    fn partial_dates_kept_when_permitted() {
        let source = EvidenceSource::new("AE", "AESTDTC")
            .with_sequence("AESEQ")
            .with_min_precision(DatePrecision::Month);
        let mut observer = CollectingObserver::new();
        let extraction = extract(&ae_frame(), &source, &mut observer).unwrap();
        let partial = extraction
            .candidates
            .iter()
            .find(|c| c.precision == DatePrecision::Month)
            .unwrap();
        assert_eq!(partial.date, NaiveDate::from_ymd_opt(2014, 2, 1).unwrap());
    }

    #[test]
    fn precision_below_threshold_without_shape_rule_is_a_defect() {
        let source = EvidenceSource::new("AE", "AESTDTC").with_rule(ValidityRule::Always);
        let mut observer = CollectingObserver::new();
        let extraction = extract(&ae_frame(), &source, &mut observer).unwrap();
        assert!(
            extraction
                .defects
                .iter()
                .any(|d| matches!(d.kind, DefectKind::InsufficientPrecision { .. }))
        );
    }

    #[test]
    fn missing_column_fails_the_source() {
        let source = EvidenceSource::new("AE", "AEENDTC");
        let mut observer = CollectingObserver::new();
        let err = extract(&ae_frame(), &source, &mut observer).unwrap_err();
        assert_eq!(err.to_string(), "AE is missing required column AEENDTC");
    }
}
