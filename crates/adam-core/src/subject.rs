//! Subject-level aggregation.
//!
//! Joins per-subject derivations onto the one-row-per-subject demographics
//! table and derives the categorical subject variables.

use std::collections::BTreeMap;

use adam_common::parse_f64;
use polars::prelude::*;

use crate::datetime::{format_date, format_datetime};
use crate::error::{DeriveError, Result};
use crate::evidence::ResolvedDate;
use crate::exposure::ExposureWindow;
use crate::frame::{TableView, float_column, int_column, optional_text_column, text_column};

/// Age grouping `<18`, `18-50`, `>50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgeGroup {
    Under18,
    From18To50,
    Over50,
    /// Age missing or not numeric; rendered as missing label and code.
    Unknown,
}

impl AgeGroup {
    pub fn from_age(age: Option<f64>) -> Self {
        match age {
            Some(age) if age < 18.0 => Self::Under18,
            Some(age) if age <= 50.0 => Self::From18To50,
            Some(age) if age > 50.0 => Self::Over50,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::Under18 => Some("<18"),
            Self::From18To50 => Some("18-50"),
            Self::Over50 => Some(">50"),
            Self::Unknown => None,
        }
    }

    pub fn code(self) -> Option<i64> {
        match self {
            Self::Under18 => Some(1),
            Self::From18To50 => Some(2),
            Self::Over50 => Some(3),
            Self::Unknown => None,
        }
    }
}

/// `Y` when the subject has a planned arm.
pub fn itt_flag(arm: &str) -> &'static str {
    if arm.trim().is_empty() { "N" } else { "Y" }
}

pub const DM_TABLE: &str = "DM";
pub const REQUIRED_DM_COLUMNS: &[&str] = &["USUBJID", "AGE", "ARM"];
const CARRIED_DM_COLUMNS: &[&str] = &[
    "SUBJID", "SITEID", "AGEU", "SEX", "RACE", "ARM", "ACTARM", "RFSTDTC", "RFENDTC",
];

/// Checks that every base row has a distinct, non-empty subject identifier.
pub fn check_subject_keys(table: &str, subjects: &[String]) -> Result<()> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for (row, subject) in subjects.iter().enumerate() {
        if subject.is_empty() {
            return Err(DeriveError::MissingSubjectKey {
                table: table.to_string(),
                row,
            });
        }
        *counts.entry(subject).or_default() += 1;
    }
    if let Some((subject, count)) = counts.into_iter().find(|(_, count)| *count > 1) {
        return Err(DeriveError::DuplicateSubject {
            table: table.to_string(),
            subject: subject.to_string(),
            count,
        });
    }
    Ok(())
}

/// Per-subject derivations joined onto the base table.
#[derive(Debug, Clone, Copy)]
pub struct SubjectDerivations<'a> {
    pub windows: &'a BTreeMap<String, ExposureWindow>,
    pub last_alive: &'a BTreeMap<String, ResolvedDate>,
}

/// Builds the subject-level table: one output row per base row, in base order.
pub fn aggregate(
    dm: &DataFrame,
    derivations: SubjectDerivations<'_>,
    study_id: Option<&str>,
) -> Result<DataFrame> {
    let view = TableView::new(DM_TABLE, dm);
    view.require(REQUIRED_DM_COLUMNS)?;

    let subjects = view.texts("USUBJID")?;
    check_subject_keys(DM_TABLE, &subjects)?;

    let studies: Vec<String> = view
        .texts_or_empty("STUDYID")?
        .into_iter()
        .map(|study| match (study.is_empty(), study_id) {
            (true, Some(fallback)) => fallback.to_string(),
            _ => study,
        })
        .collect();
    let mut carried = BTreeMap::new();
    for column in CARRIED_DM_COLUMNS {
        carried.insert(*column, view.texts_or_empty(column)?);
    }
    let ages: Vec<Option<f64>> = view.texts("AGE")?.iter().map(|a| parse_f64(a)).collect();
    let groups: Vec<AgeGroup> = ages.iter().map(|age| AgeGroup::from_age(*age)).collect();

    let window = |subject: &String| derivations.windows.get(subject).copied().unwrap_or_default();
    let windows: Vec<ExposureWindow> = subjects.iter().map(window).collect();
    let resolved: Vec<Option<&ResolvedDate>> = subjects
        .iter()
        .map(|subject| derivations.last_alive.get(subject))
        .collect();

    let carried_column = |name: &str| text_column(name, carried[name].clone());
    let columns = vec![
        text_column("STUDYID", studies),
        text_column("USUBJID", subjects.clone()),
        carried_column("SUBJID"),
        carried_column("SITEID"),
        float_column("AGE", ages),
        carried_column("AGEU"),
        carried_column("SEX"),
        carried_column("RACE"),
        carried_column("ARM"),
        carried_column("ACTARM"),
        carried_column("RFSTDTC"),
        carried_column("RFENDTC"),
        optional_text_column(
            "AGEGR9",
            groups.iter().map(|g| g.label().map(String::from)).collect(),
        ),
        int_column("AGEGR9N", groups.iter().map(|g| g.code()).collect()),
        text_column(
            "ITTFL",
            carried["ARM"].iter().map(|arm| itt_flag(arm).to_string()).collect(),
        ),
        optional_text_column(
            "TRTSDTM",
            windows.iter().map(|w| w.start.map(|s| format_datetime(s.value))).collect(),
        ),
        optional_text_column(
            "TRTSTMF",
            windows
                .iter()
                .map(|w| w.start.and_then(|s| s.flag).map(|f| f.code().to_string()))
                .collect(),
        ),
        optional_text_column(
            "TRTEDTM",
            windows.iter().map(|w| w.end.map(|e| format_datetime(e.value))).collect(),
        ),
        optional_text_column(
            "TRTETMF",
            windows
                .iter()
                .map(|w| w.end.and_then(|e| e.flag).map(|f| f.code().to_string()))
                .collect(),
        ),
        optional_text_column(
            "TRTSDT",
            windows.iter().map(|w| w.start_date().map(format_date)).collect(),
        ),
        optional_text_column(
            "TRTEDT",
            windows.iter().map(|w| w.end_date().map(format_date)).collect(),
        ),
        int_column("TRTDURD", windows.iter().map(ExposureWindow::duration_days).collect()),
        optional_text_column(
            "LSTALVDT",
            resolved.iter().map(|r| r.map(|r| format_date(r.date))).collect(),
        ),
        optional_text_column(
            "LALVDOM",
            resolved.iter().map(|r| r.map(|r| r.source.clone())).collect(),
        ),
        int_column("LALVSEQ", resolved.iter().map(|r| r.and_then(|r| r.sequence)).collect()),
        optional_text_column(
            "LALVVAR",
            resolved.iter().map(|r| r.map(|r| r.variable.clone())).collect(),
        ),
    ];

    let adsl = DataFrame::new(columns)?;
    if adsl.height() != subjects.len() {
        return Err(DeriveError::Cardinality {
            table: DM_TABLE.to_string(),
            expected: subjects.len(),
            actual: adsl.height(),
        });
    }
    Ok(adsl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_groups_at_the_boundaries() {
        let code = |age: Option<f64>| AgeGroup::from_age(age).code();
        assert_eq!(code(Some(17.0)), Some(1));
        assert_eq!(code(Some(18.0)), Some(2));
        assert_eq!(code(Some(50.0)), Some(2));
        assert_eq!(code(Some(50.5)), Some(3));
        assert_eq!(code(Some(51.0)), Some(3));
        assert_eq!(code(None), None);
        assert_eq!(AgeGroup::from_age(None), AgeGroup::Unknown);
        assert_eq!(AgeGroup::from_age(Some(17.0)).label(), Some("<18"));
        assert_eq!(AgeGroup::Unknown.label(), None);
    }

    #[test]
    fn itt_follows_arm_presence() {
        assert_eq!(itt_flag("Placebo"), "Y");
        assert_eq!(itt_flag("  "), "N");
        assert_eq!(itt_flag(""), "N");
    }

    #[test]
    fn subject_key_checks() {
        let keys = |values: &[&str]| values.iter().map(|v| v.to_string()).collect::<Vec<_>>();
        assert!(check_subject_keys("DM", &keys(&["S1", "S2"])).is_ok());
        assert!(matches!(
            check_subject_keys("DM", &keys(&["S1", "S2", "S1"])),
            Err(DeriveError::DuplicateSubject { count: 2, .. })
        ));
        assert!(matches!(
            check_subject_keys("DM", &keys(&["S1", ""])),
            Err(DeriveError::MissingSubjectKey { row: 1, .. })
        ));
    }
}
