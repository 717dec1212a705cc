//! Adverse event incidence by treatment arm.
//!
//! Unique-subject counts per body system and preferred term, with
//! percentages over each arm's subject count from ADSL.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::Result;
use crate::frame::{TableView, text_column};
use crate::subject::check_subject_keys;

pub const ADAE_TABLE: &str = "ADAE";
pub const ADSL_TABLE: &str = "ADSL";

/// Label of the row counting subjects with any event.
pub const ANY_EVENT: &str = "ANY TEAE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmCount {
    pub arm: String,
    pub subjects: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AeSummaryRow {
    pub soc: String,
    pub term: String,
    /// Subjects with the event, one entry per arm in [`AeSummary::arms`] order.
    pub counts: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AeSummary {
    pub arms: Vec<ArmCount>,
    /// The any-event row first, then terms ordered by body system and term.
    pub rows: Vec<AeSummaryRow>,
}

impl AeSummary {
    /// Formatted `n (x.x%)` cell.
    pub fn cell(&self, row: &AeSummaryRow, arm: usize) -> String {
        let count = row.counts.get(arm).copied().unwrap_or_default();
        let total = self.arms.get(arm).map_or(0, |arm| arm.subjects);
        format_count(count, total)
    }

    /// One row per summary row; arm columns are headed `<arm> (N=<n>)`.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = vec![
            text_column("AESOC", self.rows.iter().map(|r| r.soc.clone()).collect()),
            text_column("AEDECOD", self.rows.iter().map(|r| r.term.clone()).collect()),
        ];
        for (idx, arm) in self.arms.iter().enumerate() {
            let cells: Vec<String> = self.rows.iter().map(|row| self.cell(row, idx)).collect();
            columns.push(Column::new(arm_header(arm).into(), cells));
        }
        Ok(DataFrame::new(columns)?)
    }
}

pub fn arm_header(arm: &ArmCount) -> String {
    format!("{} (N={})", arm.arm, arm.subjects)
}

pub fn format_count(count: usize, total: usize) -> String {
    if total == 0 {
        return count.to_string();
    }
    let percent = count as f64 * 100.0 / total as f64;
    format!("{count} ({percent:.1}%)")
}

/// Summarises treatment-emergent events. Events of subjects absent from
/// ADSL, or without an arm there, are not counted.
pub fn summarize_ae(adae: &DataFrame, adsl: &DataFrame) -> Result<AeSummary> {
    let adsl_view = TableView::new(ADSL_TABLE, adsl);
    let arm_column = if adsl_view.has_column("ACTARM") {
        "ACTARM"
    } else {
        "ARM"
    };
    adsl_view.require(&["USUBJID", arm_column])?;
    let subjects = adsl_view.texts("USUBJID")?;
    check_subject_keys(ADSL_TABLE, &subjects)?;

    let mut subject_arm: BTreeMap<String, usize> = BTreeMap::new();
    let arm_names: BTreeSet<String> = adsl_view
        .texts(arm_column)?
        .into_iter()
        .filter(|arm| !arm.is_empty())
        .collect();
    let arm_names: Vec<String> = arm_names.into_iter().collect();
    let mut arms: Vec<ArmCount> = arm_names
        .iter()
        .map(|arm| ArmCount {
            arm: arm.clone(),
            subjects: 0,
        })
        .collect();
    for (subject, arm) in subjects.into_iter().zip(adsl_view.texts(arm_column)?) {
        if let Ok(idx) = arm_names.binary_search(&arm) {
            arms[idx].subjects += 1;
            subject_arm.insert(subject, idx);
        }
    }

    let ae_view = TableView::new(ADAE_TABLE, adae);
    ae_view.require(&["USUBJID", "AESOC", "AEDECOD"])?;
    let ae_subjects = ae_view.texts("USUBJID")?;
    let socs = ae_view.texts("AESOC")?;
    let terms = ae_view.texts("AEDECOD")?;
    let emergent: Vec<bool> = if ae_view.has_column("TRTEMFL") {
        ae_view
            .texts("TRTEMFL")?
            .iter()
            .map(|flag| flag.eq_ignore_ascii_case("Y"))
            .collect()
    } else {
        vec![true; ae_view.height()]
    };

    let mut any_event: Vec<BTreeSet<&str>> = vec![BTreeSet::new(); arms.len()];
    let mut by_term: BTreeMap<(&str, &str), Vec<BTreeSet<&str>>> = BTreeMap::new();
    let mut unmatched = 0usize;
    for idx in 0..ae_view.height() {
        if !emergent[idx] {
            continue;
        }
        let subject = ae_subjects[idx].as_str();
        let Some(&arm) = subject_arm.get(subject) else {
            unmatched += 1;
            continue;
        };
        any_event[arm].insert(subject);
        by_term
            .entry((socs[idx].as_str(), terms[idx].as_str()))
            .or_insert_with(|| vec![BTreeSet::new(); arms.len()])[arm]
            .insert(subject);
    }
    if unmatched > 0 {
        debug!(rows = unmatched, "adverse events without an ADSL arm");
    }

    let mut rows = vec![AeSummaryRow {
        soc: ANY_EVENT.to_string(),
        term: String::new(),
        counts: any_event.iter().map(BTreeSet::len).collect(),
    }];
    rows.extend(by_term.into_iter().map(|((soc, term), subjects)| AeSummaryRow {
        soc: soc.to_string(),
        term: term.to_string(),
        counts: subjects.iter().map(BTreeSet::len).collect(),
    }));

    info!(arms = arms.len(), terms = rows.len() - 1, "summarised adverse events");
    Ok(AeSummary { arms, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adsl() -> DataFrame {
        DataFrame::new(vec![
            Column::new("USUBJID".into(), ["S1", "S2", "S3", "S4"]),
            Column::new("ACTARM".into(), ["Placebo", "Placebo", "Active", "Active"]),
        ])
        .unwrap()
    }

    fn adae() -> DataFrame {
        DataFrame::new(vec![
            Column::new("USUBJID".into(), ["S1", "S1", "S2", "S3", "S3", "S9"]),
            Column::new(
                "AESOC".into(),
                ["Nervous", "Nervous", "Skin", "Nervous", "Skin", "Skin"],
            ),
            Column::new(
                "AEDECOD".into(),
                ["HEADACHE", "HEADACHE", "RASH", "HEADACHE", "RASH", "RASH"],
            ),
            Column::new("TRTEMFL".into(), ["Y", "Y", "Y", "Y", "N", "Y"]),
        ])
        .unwrap()
    }

    #[test]
    fn counts_unique_subjects_per_arm() {
        let summary = summarize_ae(&adae(), &adsl()).unwrap();
        assert_eq!(
            summary.arms,
            vec![
                ArmCount { arm: "Active".to_string(), subjects: 2 },
                ArmCount { arm: "Placebo".to_string(), subjects: 2 },
            ]
        );
        assert_eq!(summary.rows[0].soc, ANY_EVENT);
        assert_eq!(summary.rows[0].counts, vec![1, 2]);
        let headache = &summary.rows[1];
        assert_eq!(headache.term, "HEADACHE");
        assert_eq!(headache.counts, vec![1, 1]);
        let rash = &summary.rows[2];
        assert_eq!(rash.counts, vec![0, 1]);
        assert_eq!(summary.cell(headache, 1), "1 (50.0%)");
    }

    #[test]
    fn frame_has_one_column_per_arm() {
        let df = summarize_ae(&adae(), &adsl()).unwrap().to_dataframe().unwrap();
        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();
        assert_eq!(names, ["AESOC", "AEDECOD", "Active (N=2)", "Placebo (N=2)"]);
        assert_eq!(df.height(), 3);
    }

    #[test]
    fn formats_counts() {
        assert_eq!(format_count(1, 3), "1 (33.3%)");
        assert_eq!(format_count(0, 0), "0");
    }
}
