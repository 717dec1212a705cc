//! Dataset and option types.

use chrono::NaiveDateTime;

use crate::error::{Result, XptError};

/// Header timestamp used when none is configured.
pub const DEFAULT_TIMESTAMP: &str = "01JAN70:00:00:00";

/// Variable storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XptType {
    Num,
    Char,
}

impl XptType {
    pub fn to_ntype(self) -> i16 {
        match self {
            Self::Num => 1,
            Self::Char => 2,
        }
    }

    pub fn from_ntype(ntype: i16) -> Option<Self> {
        match ntype {
            1 => Some(Self::Num),
            2 => Some(Self::Char),
            _ => None,
        }
    }
}

/// One variable definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XptColumn {
    pub name: String,
    pub label: String,
    pub data_type: XptType,
    /// Bytes per observation; 8 for numerics.
    pub length: u16,
    /// Display format name without width, e.g. `DATE`.
    pub format: Option<String>,
    pub format_length: u16,
    pub format_decimals: u16,
}

impl XptColumn {
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            data_type: XptType::Num,
            length: 8,
            format: None,
            format_length: 0,
            format_decimals: 0,
        }
    }

    pub fn character(name: impl Into<String>, length: u16) -> Self {
        Self {
            data_type: XptType::Char,
            length,
            ..Self::numeric(name)
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the display format from a SAS format spec such as `DATE9.` or
    /// `8.2`.
    pub fn with_format_spec(mut self, spec: &str) -> Self {
        let (name, length, decimals) = split_format_spec(spec);
        self.format = (!name.is_empty()).then(|| name.to_string());
        self.format_length = length;
        self.format_decimals = decimals;
        self
    }
}

/// Splits `DATETIME20.` into (`DATETIME`, 20, 0) and `8.2` into (``, 8, 2).
pub fn split_format_spec(spec: &str) -> (&str, u16, u16) {
    let spec = spec.trim();
    let name_end = spec
        .find(|c: char| c.is_ascii_digit() || c == '.')
        .unwrap_or(spec.len());
    let (name, rest) = spec.split_at(name_end);
    let (width, decimals) = rest.split_once('.').unwrap_or((rest, ""));
    (
        name,
        width.parse().unwrap_or(0),
        decimals.parse().unwrap_or(0),
    )
}

/// One observation value.
#[derive(Debug, Clone, PartialEq)]
pub enum XptValue {
    /// `None` is the standard missing value.
    Num(Option<f64>),
    Char(String),
}

impl XptValue {
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Num(value) => value.is_none(),
            Self::Char(value) => value.trim().is_empty(),
        }
    }
}

/// A single-member transport dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct XptDataset {
    pub name: String,
    pub label: String,
    pub columns: Vec<XptColumn>,
    pub rows: Vec<Vec<XptValue>>,
}

impl XptDataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn with_columns(name: impl Into<String>, columns: Vec<XptColumn>) -> Self {
        Self {
            columns,
            ..Self::new(name)
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn add_row(&mut self, row: Vec<XptValue>) {
        self.rows.push(row);
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Bytes per observation.
    pub fn observation_length(&self) -> usize {
        self.columns.iter().map(|c| usize::from(c.length)).sum()
    }
}

/// Writer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XptWriterOptions {
    pub sas_version: String,
    pub os_name: String,
    /// Created and modified stamp, `ddMMMyy:hh:mm:ss`.
    pub timestamp: String,
}

impl Default for XptWriterOptions {
    fn default() -> Self {
        Self {
            sas_version: "9.4".to_string(),
            os_name: "RUST".to_string(),
            timestamp: DEFAULT_TIMESTAMP.to_string(),
        }
    }
}

impl XptWriterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a fixed header stamp; it must be in `ddMMMyy:hh:mm:ss` form.
    pub fn with_timestamp(mut self, timestamp: &str) -> Result<Self> {
        let normalized = timestamp.trim().to_uppercase();
        if parse_xpt_datetime(&normalized).is_none() {
            return Err(XptError::InvalidTimestamp {
                value: timestamp.to_string(),
            });
        }
        self.timestamp = normalized;
        Ok(self)
    }

    pub fn with_datetime(mut self, datetime: NaiveDateTime) -> Self {
        self.timestamp = format_xpt_datetime(datetime);
        self
    }
}

/// Formats a header stamp, e.g. `15MAR24:14:30:45`.
pub fn format_xpt_datetime(datetime: NaiveDateTime) -> String {
    datetime.format("%d%b%y:%H:%M:%S").to_string().to_uppercase()
}

pub fn parse_xpt_datetime(value: &str) -> Option<NaiveDateTime> {
    if value.len() != 16 {
        return None;
    }
    NaiveDateTime::parse_from_str(value, "%d%b%y:%H:%M:%S").ok()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn format_specs() {
        assert_eq!(split_format_spec("DATE9."), ("DATE", 9, 0));
        assert_eq!(split_format_spec("DATETIME20."), ("DATETIME", 20, 0));
        assert_eq!(split_format_spec("8.2"), ("", 8, 2));
        assert_eq!(split_format_spec("$CHAR"), ("$CHAR", 0, 0));
    }

    #[test]
    fn timestamps() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(14, 30, 45)
            .unwrap();
        assert_eq!(format_xpt_datetime(dt), "15MAR24:14:30:45");
        assert_eq!(parse_xpt_datetime("15MAR24:14:30:45"), Some(dt));
        assert!(parse_xpt_datetime(DEFAULT_TIMESTAMP).is_some());

        let options = XptWriterOptions::new().with_timestamp("15mar24:14:30:45").unwrap();
        assert_eq!(options.timestamp, "15MAR24:14:30:45");
        assert!(XptWriterOptions::new().with_timestamp("2024-03-15").is_err());
    }

    #[test]
    fn observation_length_sums_columns() {
        let dataset = XptDataset::with_columns(
            "ADSL",
            vec![XptColumn::character("USUBJID", 20), XptColumn::numeric("AGE")],
        );
        assert_eq!(dataset.observation_length(), 28);
    }
}
