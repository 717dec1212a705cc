//! CSV output.

use std::io::Write;

use anyhow::{Context, Result};
use polars::prelude::{AnyValue, DataFrame};

use adam_common::any_to_text;
use adam_model::DatasetSpec;

/// Writes `df` to any sink in the column order declared by `spec`.
///
/// Every declared variable must be present in `df`; extra frame columns are
/// not written.
pub fn write_csv_to<W: Write>(writer: W, spec: &DatasetSpec, df: &DataFrame) -> Result<()> {
    let names = spec.column_names();
    write_columns(writer, df, &names)
        .with_context(|| format!("dataset {}", spec.name))
}

/// Encodes a frame in its own column order; for report tables without a
/// declared variable set.
pub fn table_csv_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let names: Vec<&str> = df.get_column_names().into_iter().map(|n| n.as_str()).collect();
    let mut bytes = Vec::new();
    write_columns(&mut bytes, df, &names)?;
    Ok(bytes)
}

fn write_columns<W: Write>(writer: W, df: &DataFrame, names: &[&str]) -> Result<()> {
    let columns = names
        .iter()
        .map(|name| df.column(name).with_context(|| format!("missing column {name}")))
        .collect::<Result<Vec<_>>>()?;

    let mut out = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    out.write_record(names)?;
    let mut record = Vec::with_capacity(columns.len());
    for row_idx in 0..df.height() {
        record.clear();
        for column in &columns {
            let value = column.get(row_idx).unwrap_or(AnyValue::Null);
            record.push(any_to_text(value));
        }
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use polars::prelude::*;

    use adam_model::Variable;

    use super::*;

    fn spec() -> DatasetSpec {
        DatasetSpec::new(
            "ADSL",
            "Subject-Level Analysis Dataset",
            vec![
                Variable::char("USUBJID", "Unique Subject Identifier"),
                Variable::num("AGE", "Age"),
                Variable::num("TRTSDT", "Date of First Exposure to Treatment")
                    .with_format("DATE9."),
            ],
        )
    }

    #[test]
    fn writes_declared_order_and_blank_missing_values() {
        let df = df! {
            "TRTSDT" => [Some("2014-01-02"), None],
            "AGE" => [Some(63.0), None],
            "USUBJID" => ["01-701-1015", "01-701-1023, B"],
            "EXTRA" => ["x", "y"],
        }
        .unwrap();
        let mut buffer = Vec::new();
        write_csv_to(&mut buffer, &spec(), &df).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        insta::assert_snapshot!(text, @r#"
        USUBJID,AGE,TRTSDT
        01-701-1015,63,2014-01-02
        "01-701-1023, B",,
        "#);
    }

    #[test]
    fn missing_declared_column_is_an_error() {
        let df = df! { "USUBJID" => ["01-701-1015"] }.unwrap();
        let err = write_csv_to(Vec::new(), &spec(), &df).unwrap_err();
        assert!(format!("{err:#}").contains("missing column AGE"));
    }
}
