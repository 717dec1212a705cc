//! SAS transport output.

use anyhow::{Context, Result, anyhow};
use chrono::Local;
use polars::prelude::{AnyValue, Column, DataFrame};

use adam_common::{any_to_f64, any_to_text};
use adam_model::{DatasetSpec, Variable, VariableType};
use adam_xpt::{XptColumn, XptDataset, XptValue, XptWriterOptions, write_xpt_bytes};

use crate::sas_date::SasTemporal;

/// Longest character value a V5 transport file can hold.
const MAX_CHAR_LEN: u16 = 200;

/// Writer options for a configured header timestamp; `now` stamps the
/// current local time.
pub fn writer_options(timestamp: &str) -> Result<XptWriterOptions> {
    let options = XptWriterOptions::default();
    if timestamp.trim().eq_ignore_ascii_case("now") {
        return Ok(options.with_datetime(Local::now().naive_local()));
    }
    options
        .with_timestamp(timestamp)
        .with_context(|| format!("xpt timestamp '{timestamp}'"))
}

/// Encodes `df` as a transport file in memory.
pub fn xpt_bytes(
    spec: &DatasetSpec,
    df: &DataFrame,
    options: &XptWriterOptions,
) -> Result<Vec<u8>> {
    let dataset = build_xpt_dataset(spec, df)?;
    write_xpt_bytes(&dataset, options)
        .with_context(|| format!("encode {} transport file", spec.name))
}

/// Converts a frame to a transport dataset in declared column order.
///
/// Numeric variables with a date or datetime format are read as ISO 8601 text
/// and stored as SAS day or second counts; unparsable values become missing.
pub fn build_xpt_dataset(spec: &DatasetSpec, df: &DataFrame) -> Result<XptDataset> {
    let frame_columns = spec
        .variables
        .iter()
        .map(|variable| {
            df.column(variable.name.as_str())
                .with_context(|| format!("missing column {}", variable.name))
        })
        .collect::<Result<Vec<&Column>>>()?;

    let mut columns = Vec::with_capacity(spec.variables.len());
    for (variable, column) in spec.variables.iter().zip(&frame_columns) {
        columns.push(build_xpt_column(variable, column)?);
    }

    let temporal: Vec<Option<SasTemporal>> = spec.variables.iter().map(SasTemporal::of).collect();
    let mut dataset = XptDataset::with_columns(spec.name.to_uppercase(), columns)
        .with_label(spec.label.clone());
    for row_idx in 0..df.height() {
        let row = spec
            .variables
            .iter()
            .zip(&frame_columns)
            .zip(&temporal)
            .map(|((variable, column), temporal)| {
                let value = column.get(row_idx).unwrap_or(AnyValue::Null);
                match variable.data_type {
                    VariableType::Char => XptValue::Char(any_to_text(value)),
                    VariableType::Num => XptValue::Num(match temporal {
                        Some(kind) => kind.convert(&any_to_text(value)),
                        None => any_to_f64(value),
                    }),
                }
            })
            .collect();
        dataset.add_row(row);
    }
    Ok(dataset)
}

fn build_xpt_column(variable: &Variable, column: &Column) -> Result<XptColumn> {
    let xpt = match variable.data_type {
        VariableType::Num => XptColumn::numeric(variable.name.as_str()),
        VariableType::Char => {
            XptColumn::character(variable.name.as_str(), variable_length(variable, column)?)
        }
    };
    let xpt = xpt.with_label(variable.label.as_str());
    Ok(match variable.format.as_deref() {
        Some(format) => xpt.with_format_spec(format),
        None => xpt,
    })
}

/// Storage length of a character variable: the longer of the declared length
/// and the longest value, and at least 1.
pub fn variable_length(variable: &Variable, column: &Column) -> Result<u16> {
    let mut max_len = usize::from(variable.length.unwrap_or(1).max(1));
    for idx in 0..column.len() {
        let value = column.get(idx).unwrap_or(AnyValue::Null);
        max_len = max_len.max(any_to_text(value).trim_end().len());
    }
    u16::try_from(max_len)
        .ok()
        .filter(|len| *len <= MAX_CHAR_LEN)
        .ok_or_else(|| {
            anyhow!(
                "variable {} needs length {max_len}, above the transport limit of {MAX_CHAR_LEN}",
                variable.name
            )
        })
}
