use adam_common::{any_to_i64, cell_text};
use adam_core::{AdslInputs, CollectingObserver, DeriveError, adsl_spec, derive_adsl};
use adam_model::{DatePrecision, DerivationConfig};
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

fn dm() -> DataFrame {
    test_df(vec![
        ("STUDYID", vec!["CDISCPILOT01", "CDISCPILOT01", "CDISCPILOT01"]),
        ("USUBJID", vec!["S1", "S2", "S3"]),
        ("AGE", vec!["17", "50", ""]),
        ("ARM", vec!["Placebo", "Xanomeline High Dose", ""]),
        ("ACTARM", vec!["Placebo", "Xanomeline High Dose", ""]),
    ])
}

fn ex() -> DataFrame {
    test_df(vec![
        ("USUBJID", vec!["S1", "S2", "S2"]),
        ("EXSEQ", vec!["1", "1", "2"]),
        ("EXTRT", vec!["PLACEBO", "XANOMELINE", "XANOMELINE"]),
        ("EXDOSE", vec!["0", "54", "81"]),
        ("EXSTDTC", vec!["2014-01-02T08:00", "2014-02-01", "2014-02-15"]),
        ("EXENDTC", vec!["2014-01-20", "2014-02-14", "2014-03-01T10:15"]),
    ])
}

fn vs() -> DataFrame {
    test_df(vec![
        ("USUBJID", vec!["S1", "S1", "S2"]),
        ("VSSEQ", vec!["3", "4", "1"]),
        ("VSDTC", vec!["2014-02-10", "2014-05-01", "2014-03-01"]),
        ("VSSTRESN", vec!["120", "", "80"]),
        ("VSSTRESC", vec!["120", "", "80"]),
    ])
}

fn ae() -> DataFrame {
    test_df(vec![
        ("USUBJID", vec!["S1", "S2"]),
        ("AESEQ", vec!["1", "5"]),
        ("AESTDTC", vec!["2014-02-10", "2014-03-01"]),
    ])
}

fn ds() -> DataFrame {
    test_df(vec![
        ("USUBJID", vec!["S2"]),
        ("DSSEQ", vec!["1"]),
        ("DSSTDTC", vec!["2014-02-15"]),
    ])
}

fn int_cell(df: &DataFrame, column: &str, idx: usize) -> Option<i64> {
    let col = df.column(column).expect("column");
    any_to_i64(col.get(idx).unwrap_or(AnyValue::Null))
}

fn derive(config: &DerivationConfig) -> adam_core::AdslOutput {
    let (dm, ex, vs, ae, ds) = (dm(), ex(), vs(), ae(), ds());
    let inputs = AdslInputs::new(&dm)
        .with_ex(&ex)
        .with_vs(&vs)
        .with_ae(&ae)
        .with_ds(&ds);
    let mut observer = CollectingObserver::new();
    derive_adsl(&inputs, config, &mut observer).expect("derive ADSL")
}

#[test]
fn one_row_per_subject_in_declared_order() {
    let output = derive(&DerivationConfig::default());
    assert_eq!(output.data.height(), 3);
    let names: Vec<String> = output
        .data
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(names, adsl_spec().column_names());
    assert_eq!(cell_text(&output.data, "USUBJID", 2), "S3");
}

#[test]
fn last_alive_is_latest_date_with_priority_tie_break() {
    let output = derive(&DerivationConfig::default());
    let df = &output.data;

    // VS and AE both fall on 2014-02-10; the filtered VS row is ignored.
    assert_eq!(cell_text(df, "LSTALVDT", 0), "2014-02-10");
    assert_eq!(cell_text(df, "LALVDOM", 0), "VS");
    assert_eq!(cell_text(df, "LALVVAR", 0), "VSDTC");
    assert_eq!(int_cell(df, "LALVSEQ", 0), Some(3));

    // VS, AE and the last exposure all fall on 2014-03-01.
    assert_eq!(cell_text(df, "LSTALVDT", 1), "2014-03-01");
    assert_eq!(cell_text(df, "LALVDOM", 1), "VS");

    assert_eq!(cell_text(df, "LSTALVDT", 2), "");
    assert_eq!(int_cell(df, "LALVSEQ", 2), None);
    assert_eq!(output.report.unresolved_subjects, 1);
}

#[test]
fn configured_priority_changes_the_tie_break() {
    let mut config = DerivationConfig::default();
    config.evidence.priority = vec!["ADSL".to_string(), "AE".to_string()];
    let output = derive(&config);
    assert_eq!(cell_text(&output.data, "LALVDOM", 0), "AE");
    assert_eq!(int_cell(&output.data, "LALVSEQ", 0), Some(1));
    assert_eq!(cell_text(&output.data, "LALVDOM", 1), "ADSL");
    assert_eq!(cell_text(&output.data, "LALVVAR", 1), "TRTEDTM");
}

#[test]
fn partial_dates_count_when_allowed() {
    let mut config = DerivationConfig::default();
    config
        .evidence
        .min_precision
        .insert("AE".to_string(), DatePrecision::Month);
    let (dm, ae) = (
        dm(),
        test_df(vec![
            ("USUBJID", vec!["S3"]),
            ("AESEQ", vec!["2"]),
            ("AESTDTC", vec!["2014-06"]),
        ]),
    );
    let inputs = AdslInputs::new(&dm).with_ae(&ae);
    let mut observer = CollectingObserver::new();
    let output = derive_adsl(&inputs, &config, &mut observer).expect("derive ADSL");
    assert_eq!(cell_text(&output.data, "LSTALVDT", 2), "2014-06-01");
    assert_eq!(output.last_alive["S3"].precision, DatePrecision::Month);
    assert_eq!(observer.unresolved, vec!["S1".to_string(), "S2".to_string()]);
}

#[test]
fn exposure_window_and_flags() {
    let output = derive(&DerivationConfig::default());
    let df = &output.data;
    assert_eq!(cell_text(df, "TRTSDTM", 0), "2014-01-02T08:00:00");
    assert_eq!(cell_text(df, "TRTSTMF", 0), "");
    assert_eq!(cell_text(df, "TRTEDTM", 0), "2014-01-20T23:59:59");
    assert_eq!(cell_text(df, "TRTETMF", 0), "H");
    assert_eq!(int_cell(df, "TRTDURD", 0), Some(19));

    assert_eq!(cell_text(df, "TRTSDT", 1), "2014-02-01");
    assert_eq!(cell_text(df, "TRTEDTM", 1), "2014-03-01T10:15:59");
    assert_eq!(cell_text(df, "TRTETMF", 1), "");
    assert_eq!(int_cell(df, "TRTDURD", 1), Some(29));

    assert_eq!(cell_text(df, "TRTSDTM", 2), "");
    assert_eq!(int_cell(df, "TRTDURD", 2), None);
}

#[test]
fn age_groups_and_itt() {
    let output = derive(&DerivationConfig::default());
    let df = &output.data;
    assert_eq!(cell_text(df, "AGEGR9", 0), "<18");
    assert_eq!(int_cell(df, "AGEGR9N", 0), Some(1));
    assert_eq!(cell_text(df, "AGEGR9", 1), "18-50");
    assert_eq!(int_cell(df, "AGEGR9N", 1), Some(2));
    assert_eq!(cell_text(df, "AGEGR9", 2), "");
    assert_eq!(int_cell(df, "AGEGR9N", 2), None);
    assert_eq!(cell_text(df, "ITTFL", 0), "Y");
    assert_eq!(cell_text(df, "ITTFL", 2), "N");
}

#[test]
fn duplicate_subject_is_fatal() {
    let dm = test_df(vec![
        ("USUBJID", vec!["S1", "S1"]),
        ("AGE", vec!["30", "31"]),
        ("ARM", vec!["Placebo", "Placebo"]),
    ]);
    let mut observer = CollectingObserver::new();
    let err = derive_adsl(
        &AdslInputs::new(&dm),
        &DerivationConfig::default(),
        &mut observer,
    )
    .unwrap_err();
    assert!(matches!(err, DeriveError::DuplicateSubject { count: 2, .. }));
}

#[test]
fn missing_source_column_is_fatal() {
    let dm = dm();
    let ae = test_df(vec![("USUBJID", vec!["S1"]), ("AESEQ", vec!["1"])]);
    let mut observer = CollectingObserver::new();
    let err = derive_adsl(
        &AdslInputs::new(&dm).with_ae(&ae),
        &DerivationConfig::default(),
        &mut observer,
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "AE is missing required column AESTDTC");
}

#[test]
fn unknown_priority_tag_is_rejected() {
    let mut config = DerivationConfig::default();
    config.evidence.priority = vec!["LB".to_string()];
    let dm = dm();
    let mut observer = CollectingObserver::new();
    let err = derive_adsl(&AdslInputs::new(&dm), &config, &mut observer).unwrap_err();
    assert!(matches!(err, DeriveError::InvalidConfig(_)));
}

#[test]
fn unknown_min_precision_tag_is_rejected() {
    let mut config = DerivationConfig::default();
    config
        .evidence
        .min_precision
        .insert("ae".to_string(), DatePrecision::Month);
    let (dm, ex, ae) = (dm(), ex(), ae());
    let inputs = AdslInputs {
        ex: Some(&ex),
        ae: Some(&ae),
        ..AdslInputs::new(&dm)
    };
    let mut observer = CollectingObserver::new();
    let err = derive_adsl(&inputs, &config, &mut observer).unwrap_err();
    assert!(
        matches!(err, DeriveError::InvalidConfig(ref message) if message.contains("'ae'")),
        "{err}"
    );
    // Rejected before any source is read.
    assert!(observer.sources.is_empty());
}
