use adam_common::{any_to_f64, any_to_i64, cell_text};
use adam_core::{CollectingObserver, DeriveError, derive_ds, ds_spec};
use adam_model::{DefectKind, DerivationConfig, SourceSummary};
use polars::prelude::{AnyValue, Column, DataFrame};

fn test_df(columns: Vec<(&str, Vec<&str>)>) -> DataFrame {
    let columns: Vec<Column> = columns
        .into_iter()
        .map(|(name, values)| {
            let values: Vec<Option<&str>> = values
                .into_iter()
                .map(|value| (!value.is_empty()).then_some(value))
                .collect();
            Column::new(name.into(), values)
        })
        .collect();
    DataFrame::new(columns).expect("df")
}

fn raw() -> DataFrame {
    test_df(vec![
        ("STUDY", vec!["CDISC01", "CDISC01", "CDISC01", "CDISC01", "CDISC01"]),
        ("PATNUM", vec!["701-1015", "701-1015", "701-1023", "", "701-1023"]),
        (
            "INSTANCE",
            vec!["Week 26", "Baseline", "Screening 1", "Baseline", "Unscheduled"],
        ),
        (
            "IT.DSTERM",
            vec!["Completed", "Randomized", "Withdrew consent", "Completed", "Adverse event"],
        ),
        (
            "IT.DSDECOD",
            vec!["Completed", "Randomized", "Withdrew Consent", "Completed", "Adverse Event"],
        ),
        ("OTHERSP", vec!["", "", "", "", "Moved away"]),
        (
            "DSDTCOL",
            vec!["07-02-2014", "01-02-2014", "12-20-2013", "", "not a date"],
        ),
        ("DSTMCOL", vec!["14:30", "", "", "", ""]),
        (
            "IT.DSSTDAT",
            vec!["07-02-2014", "01-02-2014", "12-21-2013", "01-02-2014", ""],
        ),
    ])
}

fn dm() -> DataFrame {
    test_df(vec![
        ("USUBJID", vec!["CDISC01-701-1015", "CDISC01-701-1023"]),
        ("RFSTDTC", vec!["2014-01-02", "2013-12-22"]),
    ])
}

fn float_cell(df: &DataFrame, column: &str, idx: usize) -> Option<f64> {
    let col = df.column(column).expect("column");
    any_to_f64(col.get(idx).unwrap_or(AnyValue::Null))
}

fn int_cell(df: &DataFrame, column: &str, idx: usize) -> Option<i64> {
    let col = df.column(column).expect("column");
    any_to_i64(col.get(idx).unwrap_or(AnyValue::Null))
}

#[test]
fn derives_disposition_records() {
    let dm = dm();
    let mut observer = CollectingObserver::new();
    let output =
        derive_ds(&raw(), Some(&dm), &DerivationConfig::default(), &mut observer).expect("DS");
    let df = &output.data;

    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(names, ds_spec().column_names());
    assert_eq!(df.height(), 4);

    // Sorted by subject, then start date.
    assert_eq!(cell_text(df, "USUBJID", 0), "CDISC01-701-1015");
    assert_eq!(cell_text(df, "DSDECOD", 0), "RANDOMIZED");
    assert_eq!(cell_text(df, "DSCAT", 0), "PROTOCOL MILESTONE");
    assert_eq!(cell_text(df, "VISIT", 0), "BASELINE");
    assert_eq!(float_cell(df, "VISITNUM", 0), Some(3.0));
    assert_eq!(cell_text(df, "DSSTDTC", 0), "2014-01-02");
    assert_eq!(int_cell(df, "DSSTDY", 0), Some(1));
    assert_eq!(int_cell(df, "DSSEQ", 0), Some(1));

    assert_eq!(cell_text(df, "DSDECOD", 1), "COMPLETED");
    assert_eq!(cell_text(df, "DSCAT", 1), "DISPOSITION EVENT");
    assert_eq!(cell_text(df, "DSDTC", 1), "2014-07-02T14:30");
    assert_eq!(int_cell(df, "DSSEQ", 1), Some(2));

    assert_eq!(cell_text(df, "DSDECOD", 2), "WITHDRAWAL BY SUBJECT");
    assert_eq!(int_cell(df, "DSSTDY", 2), Some(-1));
    assert_eq!(int_cell(df, "DSSEQ", 2), Some(1));

    // Other-specify wins; missing start dates sort last.
    assert_eq!(cell_text(df, "DSTERM", 3), "Moved away");
    assert_eq!(cell_text(df, "DSDECOD", 3), "MOVED AWAY");
    assert_eq!(cell_text(df, "DSCAT", 3), "OTHER EVENT");
    assert_eq!(cell_text(df, "VISIT", 3), "UNSCHEDULED");
    assert_eq!(float_cell(df, "VISITNUM", 3), None);
    assert_eq!(cell_text(df, "DSDTC", 3), "");
    assert_eq!(int_cell(df, "DSSEQ", 3), Some(2));
}

#[test]
fn reports_row_defects() {
    let mut observer = CollectingObserver::new();
    let output =
        derive_ds(&raw(), None, &DerivationConfig::default(), &mut observer).expect("DS");
    assert_eq!(output.report.defect_count(), 2);
    assert_eq!(observer.defects[0].kind, DefectKind::MissingSubject);
    assert!(matches!(
        observer.defects[1].kind,
        DefectKind::UnparsableDate { ref column, .. } if column == "DSDTCOL"
    ));
    assert_eq!(int_cell(&output.data, "DSSTDY", 0), None);
}

#[test]
fn raw_table_row_accounting_is_reported() {
    let mut observer = CollectingObserver::new();
    let output =
        derive_ds(&raw(), None, &DerivationConfig::default(), &mut observer).expect("DS");
    let expected = SourceSummary {
        source: "DS_RAW".to_string(),
        rows: 5,
        emitted: 4,
        filtered: 0,
        defects: 2,
    };
    assert_eq!(output.report.sources, vec![expected.clone()]);
    assert_eq!(observer.sources, vec![expected]);
}

#[test]
fn study_id_and_prefix_come_from_config() {
    let raw = raw().drop("STUDY").expect("drop");
    let mut config = DerivationConfig::default();
    config.study_id = Some("PILOT".to_string());
    config.ds.subject_prefix = Some("01-".to_string());
    let mut observer = CollectingObserver::new();
    let output = derive_ds(&raw, None, &config, &mut observer).expect("DS");
    assert_eq!(cell_text(&output.data, "STUDYID", 0), "PILOT");
    assert_eq!(cell_text(&output.data, "USUBJID", 0), "01-701-1015");
}

#[test]
fn missing_study_column_is_fatal_without_override() {
    let raw = raw().drop("STUDY").expect("drop");
    let mut observer = CollectingObserver::new();
    let err = derive_ds(&raw, None, &DerivationConfig::default(), &mut observer).unwrap_err();
    assert!(matches!(err, DeriveError::MissingColumn { ref column, .. } if column == "STUDY"));
}
