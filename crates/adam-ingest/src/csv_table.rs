use std::collections::BTreeSet;
use std::path::Path;

use csv::ReaderBuilder;
use polars::prelude::*;
use tracing::debug;

use crate::error::{IngestError, Result};

/// Cells treated as missing in addition to blank ones.
pub const DEFAULT_NA_VALUES: &[&str] = &["NA"];

/// A CSV file read as text, header row first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name))
    }

    /// All columns become nullable string columns; blank cells are null.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns = self
            .headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                let values: Vec<Option<&str>> = self
                    .rows
                    .iter()
                    .map(|row| {
                        row.get(idx)
                            .map(String::as_str)
                            .filter(|value| !value.is_empty())
                    })
                    .collect();
                Column::new(header.as_str().into(), values)
            })
            .collect();
        DataFrame::new(columns)
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').trim().to_string()
}

fn normalize_cell(raw: &str, na_values: &[&str]) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    if na_values.contains(&trimmed) {
        String::new()
    } else {
        trimmed.to_string()
    }
}

pub fn read_csv_table(path: &Path) -> Result<CsvTable> {
    read_csv_table_with_na(path, DEFAULT_NA_VALUES)
}

/// Reads a CSV file; the first non-blank row is the header. Short rows are
/// padded and fully blank rows are dropped.
pub fn read_csv_table_with_na(path: &Path, na_values: &[&str]) -> Result<CsvTable> {
    let csv_error = |source| IngestError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        if record.iter().all(|value| value.trim().is_empty()) {
            continue;
        }
        let Some(headers) = headers.as_ref() else {
            headers = Some(record.iter().map(normalize_header).collect());
            continue;
        };
        let row = (0..headers.len())
            .map(|idx| normalize_cell(record.get(idx).unwrap_or(""), na_values))
            .collect();
        rows.push(row);
    }

    let headers = headers.ok_or_else(|| IngestError::EmptyCsv {
        path: path.to_path_buf(),
    })?;
    let mut seen = BTreeSet::new();
    for header in &headers {
        if !seen.insert(header.to_uppercase()) {
            return Err(IngestError::DuplicateColumn {
                column: header.clone(),
                path: path.to_path_buf(),
            });
        }
    }
    debug!(
        path = %path.display(),
        columns = headers.len(),
        rows = rows.len(),
        "read csv table"
    );
    Ok(CsvTable { headers, rows })
}

/// Reads a CSV file straight into a string-typed DataFrame.
pub fn read_csv_frame(path: &Path) -> Result<DataFrame> {
    read_csv_table(path)?
        .to_dataframe()
        .map_err(|source| IngestError::DataFrame {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_cell_blanks_na_markers() {
        assert_eq!(normalize_cell(" NA ", DEFAULT_NA_VALUES), "");
        assert_eq!(normalize_cell("NAUSEA", DEFAULT_NA_VALUES), "NAUSEA");
        assert_eq!(normalize_cell("\u{feff}STUDYID", &[]), "STUDYID");
    }

    #[test]
    fn to_dataframe_uses_nulls_for_blank_cells() {
        let table = CsvTable {
            headers: vec!["USUBJID".to_string(), "AGE".to_string()],
            rows: vec![
                vec!["S1".to_string(), "63".to_string()],
                vec!["S2".to_string(), String::new()],
            ],
        };
        let df = table.to_dataframe().unwrap();
        assert_eq!(df.height(), 2);
        let age = df.column("AGE").unwrap();
        assert_eq!(age.null_count(), 1);
        assert_eq!(table.column_index("age"), Some(1));
    }
}
