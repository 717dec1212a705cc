//! Disposition (DS) domain derivation from raw disposition records.
//!
//! Each raw record becomes one DS record. Other-specify text takes precedence
//! over the collected term, categories follow from the standardized decode,
//! and dates are converted from the collection format to ISO 8601.

use std::collections::BTreeMap;
use std::time::Instant;

use adam_model::{
    DatasetSpec, DefectKind, DerivationConfig, DerivationReport, DsConfig, RowDefect,
    SourceSummary, Variable,
};
use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{info, info_span};

use crate::datetime::{
    format_date, parse_partial_datetime, parse_raw_date, parse_raw_time, study_day,
};
use crate::error::{DeriveError, Result};
use crate::frame::{RowRef, TableView, TextColumns, float_column, int_column, text_column};
use crate::observer::DerivationObserver;
use crate::subject::DM_TABLE;

pub const DS: &str = "DS";
const RAW_TABLE: &str = "DS_RAW";

pub const CATEGORY_MILESTONE: &str = "PROTOCOL MILESTONE";
pub const CATEGORY_DISPOSITION: &str = "DISPOSITION EVENT";
pub const CATEGORY_OTHER: &str = "OTHER EVENT";

pub fn ds_spec() -> DatasetSpec {
    DatasetSpec::new(
        DS,
        "Disposition",
        vec![
            Variable::char("STUDYID", "Study Identifier"),
            Variable::char("DOMAIN", "Domain Abbreviation").with_length(2),
            Variable::char("USUBJID", "Unique Subject Identifier"),
            Variable::num("DSSEQ", "Sequence Number"),
            Variable::char("DSTERM", "Reported Term for the Disposition Event"),
            Variable::char("DSDECOD", "Standardized Disposition Term"),
            Variable::char("DSCAT", "Category for Disposition Event"),
            Variable::num("VISITNUM", "Visit Number"),
            Variable::char("VISIT", "Visit Name"),
            Variable::char("DSDTC", "Date/Time of Collection"),
            Variable::char("DSSTDTC", "Start Date/Time of Disposition Event"),
            Variable::num("DSSTDY", "Study Day of Start of Disposition Event"),
        ],
    )
}

/// Category of a disposition record.
pub fn disposition_category(decode: &str, other_specified: bool) -> &'static str {
    if other_specified {
        CATEGORY_OTHER
    } else if decode.eq_ignore_ascii_case("RANDOMIZED") {
        CATEGORY_MILESTONE
    } else {
        CATEGORY_DISPOSITION
    }
}

#[derive(Debug, Clone)]
pub struct DsOutput {
    pub data: DataFrame,
    pub report: DerivationReport,
}

#[derive(Debug)]
struct DsRecord {
    input_row: usize,
    study: String,
    subject: String,
    term: String,
    decode: String,
    category: &'static str,
    visitnum: Option<f64>,
    visit: String,
    collected: String,
    start: String,
    study_day: Option<i64>,
}

/// Derives DS from the raw disposition table. `dm`, when given, supplies the
/// reference start dates for study days.
pub fn derive_ds(
    raw: &DataFrame,
    dm: Option<&DataFrame>,
    config: &DerivationConfig,
    observer: &mut dyn DerivationObserver,
) -> Result<DsOutput> {
    let _span = info_span!("derive_ds").entered();
    let start = Instant::now();
    let ds_config = &config.ds;
    let names = &ds_config.columns;
    let view = TableView::new(RAW_TABLE, raw);

    let mut required = vec![
        names.patient.as_str(),
        names.term.as_str(),
        names.decode.as_str(),
        names.start_date.as_str(),
    ];
    if config.study_id.is_none() {
        required.push(names.study.as_str());
    }
    let mut columns = required.clone();
    for optional in [
        &names.study,
        &names.instance,
        &names.other_specify,
        &names.collection_date,
        &names.collection_time,
    ] {
        if view.has_column(optional) {
            columns.push(optional.as_str());
        }
    }
    view.require(&required)?;
    let rows = TextColumns::load(&view, &columns)?;
    let reference_dates = reference_start_dates(dm)?;

    let mut report = DerivationReport::new(DS);
    let mut records = Vec::with_capacity(rows.height());
    for row in rows.rows() {
        let patient = row.text(&names.patient);
        if patient.is_empty() {
            skip(&mut report, observer, &row, None, DefectKind::MissingSubject);
            continue;
        }
        let study = match row.text(&names.study) {
            "" => config.study_id.clone().unwrap_or_default(),
            study => study.to_string(),
        };
        let subject = match &ds_config.subject_prefix {
            Some(prefix) => format!("{prefix}{patient}"),
            None if study.is_empty() => patient.to_string(),
            None => format!("{study}-{patient}"),
        };

        let other = row.text(&names.other_specify);
        let other_specified = !other.is_empty();
        let (term, decode) = if other_specified {
            (other.to_string(), other.to_uppercase())
        } else {
            let collected = row.text(&names.term);
            (collected.to_string(), ds_config.decode(row.text(&names.decode)))
        };
        let category = disposition_category(&decode, other_specified);

        let instance = row.text(&names.instance);
        let (visit, visitnum) = match ds_config.visit(instance) {
            Some(mapping) => (mapping.visit.clone(), mapping.visitnum),
            None => (instance.to_uppercase(), None),
        };

        let start_date = raw_date(
            &mut report,
            observer,
            &row,
            &subject,
            &names.start_date,
            ds_config,
        );
        let collected = raw_date(
            &mut report,
            observer,
            &row,
            &subject,
            &names.collection_date,
            ds_config,
        )
        .map(|date| {
            let time = parse_raw_time(row.text(&names.collection_time), &ds_config.time_formats);
            match time {
                Some(time) => format!("{}T{}", format_date(date), time.format("%H:%M")),
                None => format_date(date),
            }
        })
        .unwrap_or_default();

        let study_day = start_date.and_then(|date| {
            reference_dates
                .get(&subject)
                .map(|reference| study_day(date, *reference))
        });

        records.push(DsRecord {
            input_row: row.index(),
            study,
            subject,
            term,
            decode,
            category,
            visitnum,
            visit,
            collected,
            start: start_date.map(format_date).unwrap_or_default(),
            study_day,
        });
    }

    let summary = SourceSummary {
        source: RAW_TABLE.to_string(),
        rows: rows.height(),
        emitted: records.len(),
        filtered: 0,
        defects: report.defects.len(),
    };
    observer.source_extracted(&summary);
    report.sources.push(summary);

    // Missing start dates sort last within a subject.
    records.sort_by(|a, b| {
        (&a.subject, a.start.is_empty(), &a.start, a.input_row).cmp(&(
            &b.subject,
            b.start.is_empty(),
            &b.start,
            b.input_row,
        ))
    });
    let mut sequences = Vec::with_capacity(records.len());
    let mut previous: Option<&str> = None;
    let mut seq = 0i64;
    for record in &records {
        if previous != Some(record.subject.as_str()) {
            seq = 0;
            previous = Some(record.subject.as_str());
        }
        seq += 1;
        sequences.push(Some(seq));
    }

    let data = build_frame(&records, sequences)?;
    report.records = data.height();
    info!(
        records = report.records,
        defects = report.defect_count(),
        duration_ms = start.elapsed().as_millis(),
        "derived DS"
    );
    Ok(DsOutput { data, report })
}

fn build_frame(records: &[DsRecord], sequences: Vec<Option<i64>>) -> Result<DataFrame> {
    let text = |f: fn(&DsRecord) -> String| records.iter().map(f).collect::<Vec<_>>();
    Ok(DataFrame::new(vec![
        text_column("STUDYID", text(|r| r.study.clone())),
        text_column("DOMAIN", vec![DS.to_string(); records.len()]),
        text_column("USUBJID", text(|r| r.subject.clone())),
        int_column("DSSEQ", sequences),
        text_column("DSTERM", text(|r| r.term.clone())),
        text_column("DSDECOD", text(|r| r.decode.clone())),
        text_column("DSCAT", text(|r| r.category.to_string())),
        float_column("VISITNUM", records.iter().map(|r| r.visitnum).collect()),
        text_column("VISIT", text(|r| r.visit.clone())),
        text_column("DSDTC", text(|r| r.collected.clone())),
        text_column("DSSTDTC", text(|r| r.start.clone())),
        int_column("DSSTDY", records.iter().map(|r| r.study_day).collect()),
    ])?)
}

/// Parses a raw date column; a non-empty value that matches no configured
/// format is reported and treated as missing.
fn raw_date(
    report: &mut DerivationReport,
    observer: &mut dyn DerivationObserver,
    row: &RowRef<'_>,
    subject: &str,
    column: &str,
    config: &DsConfig,
) -> Option<NaiveDate> {
    let value = row.text(column);
    if value.is_empty() {
        return None;
    }
    let parsed = parse_raw_date(value, &config.date_formats);
    if parsed.is_none() {
        let kind = DefectKind::UnparsableDate {
            column: column.to_string(),
            value: value.to_string(),
        };
        skip(report, observer, row, Some(subject), kind);
    }
    parsed
}

fn skip(
    report: &mut DerivationReport,
    observer: &mut dyn DerivationObserver,
    row: &RowRef<'_>,
    subject: Option<&str>,
    kind: DefectKind,
) {
    let defect = RowDefect {
        source: RAW_TABLE.to_string(),
        row: row.index(),
        subject: subject.map(str::to_string),
        kind,
    };
    observer.row_skipped(&defect);
    report.defects.push(defect);
}

/// `RFSTDTC` per subject from demographics, when available.
fn reference_start_dates(dm: Option<&DataFrame>) -> Result<BTreeMap<String, NaiveDate>> {
    let Some(dm) = dm else {
        return Ok(BTreeMap::new());
    };
    let view = TableView::new(DM_TABLE, dm);
    if !view.has_column("RFSTDTC") {
        return Ok(BTreeMap::new());
    }
    view.require(&["USUBJID"])?;
    let subjects = view.texts("USUBJID")?;
    let starts = view.texts("RFSTDTC")?;
    let mut dates = BTreeMap::new();
    for (subject, start) in subjects.into_iter().zip(starts) {
        let date = parse_partial_datetime(&start)
            .ok()
            .and_then(|parsed| parsed.complete_date());
        if let Some(date) = date {
            if dates.insert(subject.clone(), date).is_some() {
                return Err(DeriveError::DuplicateSubject {
                    table: DM_TABLE.to_string(),
                    subject,
                    count: 2,
                });
            }
        }
    }
    Ok(dates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_decode() {
        assert_eq!(disposition_category("RANDOMIZED", false), CATEGORY_MILESTONE);
        assert_eq!(disposition_category("COMPLETED", false), CATEGORY_DISPOSITION);
        assert_eq!(disposition_category("RANDOMIZED", true), CATEGORY_OTHER);
    }

    #[test]
    fn spec_fits_transport_limits() {
        for variable in &ds_spec().variables {
            assert!(variable.name.len() <= 8);
            assert!(variable.label.len() <= 40, "{}", variable.label);
        }
    }
}
