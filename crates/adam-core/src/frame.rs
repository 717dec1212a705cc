//! Column access for input tables.
//!
//! Inputs arrive with whatever header casing the source system used, so
//! every lookup here is case-insensitive.

use std::collections::BTreeMap;

use adam_common::{any_to_f64, any_to_text, parse_f64};
use polars::prelude::*;

use crate::error::{DeriveError, Result};

/// A named, read-only view over an input table.
#[derive(Clone, Copy)]
pub struct TableView<'a> {
    name: &'a str,
    df: &'a DataFrame,
}

impl<'a> TableView<'a> {
    pub fn new(name: &'a str, df: &'a DataFrame) -> Self {
        Self { name, df }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// Actual column name matching `column`, ignoring case.
    pub fn resolve(&self, column: &str) -> Option<&'a str> {
        self.df
            .get_column_names()
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(column))
            .map(PlSmallStr::as_str)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.resolve(column).is_some()
    }

    /// Fails on the first absent column.
    pub fn require<S: AsRef<str>>(&self, columns: &[S]) -> Result<()> {
        for column in columns {
            let column = column.as_ref();
            if !self.has_column(column) {
                return Err(DeriveError::MissingColumn {
                    table: self.name.to_string(),
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }

    fn column(&self, column: &str) -> Result<&'a Column> {
        let actual = self
            .resolve(column)
            .ok_or_else(|| DeriveError::MissingColumn {
                table: self.name.to_string(),
                column: column.to_string(),
            })?;
        Ok(self.df.column(actual)?)
    }

    /// Trimmed text of every row; nulls become empty strings.
    pub fn texts(&self, column: &str) -> Result<Vec<String>> {
        let col = self.column(column)?;
        (0..col.len())
            .map(|idx| -> Result<String> {
                Ok(any_to_text(col.get(idx)?).trim().to_string())
            })
            .collect()
    }

    /// Like [`texts`](Self::texts), but an absent column yields empty strings.
    pub fn texts_or_empty(&self, column: &str) -> Result<Vec<String>> {
        if self.has_column(column) {
            self.texts(column)
        } else {
            Ok(vec![String::new(); self.height()])
        }
    }

    /// Numeric view of every row; blanks and non-numeric text become `None`.
    pub fn numbers(&self, column: &str) -> Result<Vec<Option<f64>>> {
        let col = self.column(column)?;
        (0..col.len())
            .map(|idx| -> Result<Option<f64>> { Ok(any_to_f64(col.get(idx)?)) })
            .collect()
    }
}

/// Text of selected columns, loaded once and addressed by row.
#[derive(Debug, Clone, Default)]
pub struct TextColumns {
    columns: BTreeMap<String, Vec<String>>,
    height: usize,
}

impl TextColumns {
    /// Loads `columns` from `view`; every column must exist.
    pub fn load<S: AsRef<str>>(view: &TableView<'_>, columns: &[S]) -> Result<Self> {
        view.require(columns)?;
        let mut loaded = BTreeMap::new();
        for column in columns {
            let column = column.as_ref();
            let key = column.to_uppercase();
            if !loaded.contains_key(&key) {
                loaded.insert(key, view.texts(column)?);
            }
        }
        Ok(Self {
            columns: loaded,
            height: view.height(),
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn row(&self, index: usize) -> RowRef<'_> {
        RowRef {
            columns: self,
            index,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        (0..self.height).map(|index| self.row(index))
    }
}

/// One row of a [`TextColumns`].
#[derive(Clone, Copy)]
pub struct RowRef<'a> {
    columns: &'a TextColumns,
    index: usize,
}

impl<'a> RowRef<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Cell text; unloaded columns read as empty.
    pub fn text(&self, column: &str) -> &'a str {
        self.columns
            .columns
            .get(&column.to_uppercase())
            .and_then(|values| values.get(self.index))
            .map_or("", String::as_str)
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        parse_f64(self.text(column))
    }

    pub fn is_missing(&self, column: &str) -> bool {
        self.text(column).is_empty()
    }
}

/// Builds an optional-text column; empty strings become nulls.
pub fn text_column(name: &str, values: Vec<String>) -> Column {
    let values: Vec<Option<String>> = values
        .into_iter()
        .map(|value| (!value.is_empty()).then_some(value))
        .collect();
    Column::new(name.into(), values)
}

pub fn optional_text_column(name: &str, values: Vec<Option<String>>) -> Column {
    Column::new(name.into(), values)
}

pub fn float_column(name: &str, values: Vec<Option<f64>>) -> Column {
    Column::new(name.into(), values)
}

pub fn int_column(name: &str, values: Vec<Option<i64>>) -> Column {
    Column::new(name.into(), values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new("usubjid".into(), ["S1", "S2"]),
            Column::new("VsStresN".into(), [Some("120"), None]),
        ])
        .unwrap()
    }

    #[test]
    fn resolves_columns_ignoring_case() {
        let df = frame();
        let view = TableView::new("VS", &df);
        assert_eq!(view.resolve("USUBJID"), Some("usubjid"));
        assert!(view.require(&["USUBJID", "VSSTRESN"]).is_ok());
        let err = view.require(&["VSDTC"]).unwrap_err();
        assert_eq!(err.to_string(), "VS is missing required column VSDTC");
    }

    #[test]
    fn reads_text_and_numbers() {
        let df = frame();
        let view = TableView::new("VS", &df);
        assert_eq!(view.texts("USUBJID").unwrap(), vec!["S1", "S2"]);
        assert_eq!(view.numbers("vsstresn").unwrap(), vec![Some(120.0), None]);
        assert_eq!(view.texts_or_empty("VSSTRESC").unwrap(), vec!["", ""]);
    }

    #[test]
    fn text_columns_address_rows() {
        let df = frame();
        let view = TableView::new("VS", &df);
        let columns = TextColumns::load(&view, &["usubjid", "VSSTRESN"]).unwrap();
        assert_eq!(columns.height(), 2);
        let second = columns.row(1);
        assert_eq!(second.text("USUBJID"), "S2");
        assert!(second.is_missing("VSSTRESN"));
        assert_eq!(columns.row(0).number("vsstresn"), Some(120.0));
        assert_eq!(second.text("VSDTC"), "");
        assert!(TextColumns::load(&view, &["VSDTC"]).is_err());
    }
}
