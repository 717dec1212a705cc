use adam_xpt::{
    XptColumn, XptDataset, XptError, XptType, XptValue, XptWriterOptions, parse_xpt_bytes,
    read_xpt, write_xpt, write_xpt_bytes,
};
use tempfile::TempDir;

fn adsl() -> XptDataset {
    let mut dataset = XptDataset::with_columns(
        "ADSL",
        vec![
            XptColumn::character("USUBJID", 11).with_label("Unique Subject Identifier"),
            XptColumn::numeric("AGE").with_label("Age"),
            XptColumn::character("ITTFL", 1).with_label("Intent-To-Treat Population Flag"),
            XptColumn::numeric("TRTSDT")
                .with_label("Date of First Exposure to Treatment")
                .with_format_spec("DATE9."),
        ],
    )
    .with_label("Subject-Level Analysis Dataset");
    dataset.add_row(vec![
        XptValue::Char("01-701-1015".to_string()),
        XptValue::Num(Some(63.0)),
        XptValue::Char("Y".to_string()),
        XptValue::Num(Some(19725.0)),
    ]);
    dataset.add_row(vec![
        XptValue::Char("01-701-1023".to_string()),
        XptValue::Num(Some(64.5)),
        XptValue::Char(String::new()),
        XptValue::Num(None),
    ]);
    dataset
}

#[test]
fn writes_and_reads_back() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("adsl.xpt");
    write_xpt(&path, &adsl(), &XptWriterOptions::default()).expect("write xpt");

    let round = read_xpt(&path).expect("read back");
    assert_eq!(round.name, "ADSL");
    assert_eq!(round.label, "Subject-Level Analysis Dataset");
    assert_eq!(round.columns.len(), 4);
    assert_eq!(round.columns[3].format.as_deref(), Some("DATE"));
    assert_eq!(round.columns[3].format_length, 9);
    assert_eq!(round.columns[1].data_type, XptType::Num);
    assert_eq!(round.rows.len(), 2);
    assert_eq!(round.rows[0][0], XptValue::Char("01-701-1015".to_string()));
    assert_eq!(round.rows[1][1], XptValue::Num(Some(64.5)));
    assert_eq!(round.rows[1][2], XptValue::Char(String::new()));
    assert_eq!(round.rows[1][3], XptValue::Num(None));
}

#[test]
fn output_is_deterministic_for_a_fixed_timestamp() {
    let options = XptWriterOptions::default();
    let first = write_xpt_bytes(&adsl(), &options).expect("write");
    let second = write_xpt_bytes(&adsl(), &options).expect("write");
    assert_eq!(first, second);
    assert_eq!(first.len() % 80, 0);
    assert_eq!(&first[80 + 64..80 + 80], b"01JAN70:00:00:00");

    let stamped = options.with_timestamp("15MAR24:14:30:45").expect("timestamp");
    let third = write_xpt_bytes(&adsl(), &stamped).expect("write");
    assert_ne!(first, third);
    assert_eq!(parse_xpt_bytes(&third).expect("parse").rows, adsl().rows);
}

#[test]
fn empty_dataset_keeps_its_variables() {
    let mut dataset = adsl();
    dataset.rows.clear();
    let bytes = write_xpt_bytes(&dataset, &XptWriterOptions::default()).expect("write");
    let round = parse_xpt_bytes(&bytes).expect("parse");
    assert_eq!(round.columns.len(), 4);
    assert!(round.rows.is_empty());
}

#[test]
fn rejects_mismatched_rows() {
    let mut dataset = adsl();
    dataset.add_row(vec![XptValue::Num(Some(1.0))]);
    let err = write_xpt_bytes(&dataset, &XptWriterOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        XptError::RowLengthMismatch {
            expected: 4,
            actual: 1
        }
    ));
}
