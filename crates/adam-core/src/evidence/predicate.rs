//! Validity rule evaluation. Rules are pure: they read a row and never
//! modify it.

use crate::datetime::date_shape_precision;
use crate::evidence::source::{EvidenceSource, ValidityRule};
use crate::frame::RowRef;

/// Whether `row` is usable for `source`.
pub fn evaluate(rule: &ValidityRule, source: &EvidenceSource, row: &RowRef<'_>) -> bool {
    match rule {
        ValidityRule::Always => true,
        ValidityRule::DateShape => date_shape_precision(row.text(&source.date_column))
            .is_some_and(|precision| precision >= source.min_precision),
        ValidityRule::NotBothMissing { first, second } => {
            !(row.is_missing(first) && row.is_missing(second))
        }
        ValidityRule::ValidDose {
            dose,
            treatment,
            placebo_markers,
        } => is_valid_dose(row.number(dose), row.text(treatment), placebo_markers),
        ValidityRule::All(rules) => rules.iter().all(|rule| evaluate(rule, source, row)),
    }
}

/// A dose counts when it is strictly positive, or exactly zero on a placebo
/// treatment. Missing doses never count.
pub fn is_valid_dose<S: AsRef<str>>(dose: Option<f64>, treatment: &str, markers: &[S]) -> bool {
    match dose {
        Some(amount) if amount > 0.0 => true,
        Some(amount) if amount == 0.0 => is_placebo(treatment, markers),
        _ => false,
    }
}

pub fn is_placebo<S: AsRef<str>>(treatment: &str, markers: &[S]) -> bool {
    let treatment = treatment.to_uppercase();
    markers.iter().any(|marker| {
        let marker = marker.as_ref().trim().to_uppercase();
        !marker.is_empty() && treatment.contains(&marker)
    })
}

#[cfg(test)]
mod tests {
    use adam_model::DatePrecision;
    use polars::prelude::*;

    use super::*;
    use crate::frame::{TableView, TextColumns};

    const MARKERS: &[&str] = &["PLACEBO"];

    #[test]
    fn dose_validity() {
        assert!(is_valid_dose(Some(54.0), "Xanomeline", MARKERS));
        assert!(is_valid_dose(Some(0.0), "Placebo", MARKERS));
        assert!(is_valid_dose(Some(0.0), "matching placebo tablet", MARKERS));
        assert!(!is_valid_dose(Some(0.0), "Active", MARKERS));
        assert!(!is_valid_dose(Some(-1.0), "Placebo", MARKERS));
        assert!(!is_valid_dose(None, "Placebo", MARKERS));
    }

    #[test]
    fn vital_sign_rule_needs_date_and_a_result() {
        let df = DataFrame::new(vec![
            Column::new("USUBJID".into(), ["S1", "S1", "S1", "S1"]),
            Column::new(
                "VSDTC".into(),
                [Some("2014-01-02"), Some("2014-01"), Some("2014-01-03"), None],
            ),
            Column::new("VSSTRESN".into(), [Some("120"), Some("1"), None, Some("3")]),
            Column::new("VSSTRESC".into(), [Some("120"), None, None, None]),
        ])
        .unwrap();
        let source = EvidenceSource::new("VS", "VSDTC").with_rule(ValidityRule::All(vec![
            ValidityRule::DateShape,
            ValidityRule::NotBothMissing {
                first: "VSSTRESN".to_string(),
                second: "VSSTRESC".to_string(),
            },
        ]));
        let view = TableView::new("VS", &df);
        let rows = TextColumns::load(&view, &source.required_columns()).unwrap();
        let results: Vec<bool> = rows
            .rows()
            .map(|row| evaluate(&source.rule, &source, &row))
            .collect();
        assert_eq!(results, vec![true, false, false, false]);

        let partial = source.with_min_precision(DatePrecision::Month);
        assert!(evaluate(&partial.rule, &partial, &rows.row(1)));
    }
}
