//! Date completeness levels and time-imputation flags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How much of a calendar date was collected.
///
/// Ordered from least to most complete, so `Day > Month > Year`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePrecision {
    Year,
    Month,
    Day,
}

impl DatePrecision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
        }
    }
}

impl fmt::Display for DatePrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Highest time component that had to be imputed.
///
/// Imputing only seconds is not flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeImputationFlag {
    /// Hour (and everything below it) imputed.
    #[serde(rename = "H")]
    Hour,
    /// Minute (and seconds) imputed.
    #[serde(rename = "M")]
    Minute,
}

impl TimeImputationFlag {
    pub fn code(self) -> &'static str {
        match self {
            Self::Hour => "H",
            Self::Minute => "M",
        }
    }
}
