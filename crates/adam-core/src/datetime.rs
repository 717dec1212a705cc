//! Partial ISO 8601 date/time handling.
//!
//! Collected dates are frequently incomplete (`2014`, `2014-03`,
//! `2014-03-12T08`). This module parses them without losing track of which
//! components were actually collected, and provides the two imputation
//! directions the derivations need:
//!
//! - date-level imputation to the first day of the collected period, used to
//!   order partial dates against complete ones;
//! - time-level imputation for exposure timestamps (`00:00:00` for starts,
//!   `23:59:59` for ends), with the imputation flag that goes with it.
//!
//! Raw (non-ISO) collection dates such as `01-02-2014` are handled by
//! [`parse_raw_date`] with configurable chrono formats.

use std::fmt;

use adam_model::{DatePrecision, TimeImputationFlag};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// A date with optional time, keeping only the components that were present.
///
/// Components are contiguous: a day is never set without a month, and time
/// is only present on a complete date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartialDateTime {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,
}

/// Which end of a period missing time components are imputed towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBound {
    /// `00:00:00`
    Start,
    /// `23:59:59`
    End,
}

/// A timestamp after time imputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImputedDateTime {
    pub value: NaiveDateTime,
    pub flag: Option<TimeImputationFlag>,
}

impl ImputedDateTime {
    pub fn date(&self) -> NaiveDate {
        self.value.date()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateTimeError {
    Empty,
    SpacesNotAllowed,
    InvalidYear,
    InvalidMonth,
    InvalidDay,
    InvalidHour,
    InvalidMinute,
    InvalidSecond,
    InvalidTimezone,
    /// Missing components in the middle (`2014---12`) or trailing separators.
    NonContiguous,
    /// A time part on a date without a day.
    TimeOnPartialDate,
}

impl fmt::Display for DateTimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty date"),
            Self::SpacesNotAllowed => write!(f, "spaces are not allowed in ISO 8601 values"),
            Self::InvalidYear => write!(f, "invalid year component"),
            Self::InvalidMonth => write!(f, "invalid month component (must be 01-12)"),
            Self::InvalidDay => write!(f, "invalid day component"),
            Self::InvalidHour => write!(f, "invalid hour component (must be 00-23)"),
            Self::InvalidMinute => write!(f, "invalid minute component (must be 00-59)"),
            Self::InvalidSecond => write!(f, "invalid second component (must be 00-59)"),
            Self::InvalidTimezone => write!(f, "invalid timezone offset"),
            Self::NonContiguous => write!(f, "date components must be contiguous"),
            Self::TimeOnPartialDate => write!(f, "time given on an incomplete date"),
        }
    }
}

impl std::error::Error for DateTimeError {}

impl PartialDateTime {
    pub fn date_precision(&self) -> DatePrecision {
        match (self.month, self.day) {
            (Some(_), Some(_)) => DatePrecision::Day,
            (Some(_), None) => DatePrecision::Month,
            _ => DatePrecision::Year,
        }
    }

    pub fn has_complete_date(&self) -> bool {
        self.day.is_some()
    }

    pub fn has_time(&self) -> bool {
        self.hour.is_some()
    }

    /// First calendar day of the collected period.
    pub fn first_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month.unwrap_or(1), self.day.unwrap_or(1))
    }

    pub fn complete_date(&self) -> Option<NaiveDate> {
        let day = self.day?;
        NaiveDate::from_ymd_opt(self.year, self.month?, day)
    }

    /// Imputes missing time components towards `bound`.
    ///
    /// Returns `None` for incomplete dates. The flag names the highest imputed
    /// component; seconds alone are imputed silently.
    pub fn impute_time(&self, bound: TimeBound) -> Option<ImputedDateTime> {
        let date = self.complete_date()?;
        let (fill_min, fill_sec) = match bound {
            TimeBound::Start => (0, 0),
            TimeBound::End => (59, 59),
        };
        let (hour, minute, second, flag) = match (self.hour, self.minute, self.second) {
            (None, _, _) => {
                let hour = if bound == TimeBound::Start { 0 } else { 23 };
                (hour, fill_min, fill_sec, Some(TimeImputationFlag::Hour))
            }
            (Some(h), None, _) => (h, fill_min, fill_sec, Some(TimeImputationFlag::Minute)),
            (Some(h), Some(m), None) => (h, m, fill_sec, None),
            (Some(h), Some(m), Some(s)) => (h, m, s, None),
        };
        let time = NaiveTime::from_hms_opt(hour, minute, second)?;
        Some(ImputedDateTime {
            value: date.and_time(time),
            flag,
        })
    }
}

impl fmt::Display for PartialDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        let components = [
            ("-", self.month),
            ("-", self.day),
            ("T", self.hour),
            (":", self.minute),
            (":", self.second),
        ];
        for (separator, value) in components {
            match value {
                Some(value) => write!(f, "{separator}{value:02}")?,
                None => break,
            }
        }
        Ok(())
    }
}

/// Parses an ISO 8601 extended-format date or datetime, possibly truncated.
///
/// Fractional seconds and timezone designators are accepted and dropped.
pub fn parse_partial_datetime(value: &str) -> Result<PartialDateTime, DateTimeError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DateTimeError::Empty);
    }
    if value.contains(char::is_whitespace) {
        return Err(DateTimeError::SpacesNotAllowed);
    }

    let (date_part, time_part) = match value.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (value, None),
    };

    let mut parsed = parse_date_part(date_part)?;
    if let Some(time) = time_part {
        if !parsed.has_complete_date() {
            return Err(DateTimeError::TimeOnPartialDate);
        }
        parse_time_part(time, &mut parsed)?;
    }
    Ok(parsed)
}

fn parse_number(text: &str, width: usize) -> Option<u32> {
    if text.len() != width || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_date_part(text: &str) -> Result<PartialDateTime, DateTimeError> {
    let parts: Vec<&str> = text.split('-').collect();
    if parts.len() > 3 || parts.iter().skip(1).any(|part| part.is_empty()) {
        return Err(DateTimeError::NonContiguous);
    }

    let year = parse_number(parts[0], 4).ok_or(DateTimeError::InvalidYear)?;
    let mut parsed = PartialDateTime {
        year: year as i32,
        month: None,
        day: None,
        hour: None,
        minute: None,
        second: None,
    };

    if let Some(month) = parts.get(1) {
        let month = parse_number(month, 2)
            .filter(|m| (1..=12).contains(m))
            .ok_or(DateTimeError::InvalidMonth)?;
        parsed.month = Some(month);
    }
    if let Some(day) = parts.get(2) {
        let day = parse_number(day, 2).ok_or(DateTimeError::InvalidDay)?;
        let month = parsed.month.unwrap_or(1);
        NaiveDate::from_ymd_opt(parsed.year, month, day).ok_or(DateTimeError::InvalidDay)?;
        parsed.day = Some(day);
    }
    Ok(parsed)
}

fn strip_timezone(text: &str) -> Result<&str, DateTimeError> {
    if let Some(rest) = text.strip_suffix('Z') {
        return Ok(rest);
    }
    let Some(pos) = text.rfind(['+', '-']) else {
        return Ok(text);
    };
    let offset = &text[pos + 1..];
    let valid = match offset.split_once(':') {
        Some((h, m)) => parse_number(h, 2).is_some() && parse_number(m, 2).is_some(),
        None => parse_number(offset, 2).is_some(),
    };
    if valid {
        Ok(&text[..pos])
    } else {
        Err(DateTimeError::InvalidTimezone)
    }
}

fn parse_time_part(text: &str, parsed: &mut PartialDateTime) -> Result<(), DateTimeError> {
    let text = strip_timezone(text)?;
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() > 3 || parts.iter().any(|part| part.is_empty()) {
        return Err(DateTimeError::NonContiguous);
    }

    let hour = parse_number(parts[0], 2)
        .filter(|h| *h <= 23)
        .ok_or(DateTimeError::InvalidHour)?;
    parsed.hour = Some(hour);

    if let Some(minute) = parts.get(1) {
        let minute = parse_number(minute, 2)
            .filter(|m| *m <= 59)
            .ok_or(DateTimeError::InvalidMinute)?;
        parsed.minute = Some(minute);
    }
    if let Some(second) = parts.get(2) {
        let whole = second.split_once('.').map_or(*second, |(whole, _)| whole);
        let second = parse_number(whole, 2)
            .filter(|s| *s <= 59)
            .ok_or(DateTimeError::InvalidSecond)?;
        parsed.second = Some(second);
    }
    Ok(())
}

/// Completeness of a value judged by its shape alone (`YYYY`, `YYYY-MM`,
/// `YYYY-MM-DD`, optionally followed by a time). Ranges are not checked.
pub fn date_shape_precision(value: &str) -> Option<DatePrecision> {
    let bytes = value.trim().as_bytes();
    let digits = |range: std::ops::Range<usize>| {
        bytes
            .get(range)
            .is_some_and(|slice| slice.iter().all(u8::is_ascii_digit))
    };
    if !digits(0..4) {
        return None;
    }
    if bytes.get(4) != Some(&b'-') || !digits(5..7) {
        return Some(DatePrecision::Year);
    }
    if bytes.get(7) != Some(&b'-') || !digits(8..10) {
        return Some(DatePrecision::Month);
    }
    Some(DatePrecision::Day)
}

/// Parses a raw collection date with the first matching chrono format.
pub fn parse_raw_date<S: AsRef<str>>(value: &str, formats: &[S]) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format.as_ref()).ok())
}

/// Parses a raw collection time with the first matching chrono format.
pub fn parse_raw_time<S: AsRef<str>>(value: &str, formats: &[S]) -> Option<NaiveTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    formats
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format.as_ref()).ok())
}

/// Study day relative to a reference date; the reference is day 1 and there
/// is no day 0.
pub fn study_day(date: NaiveDate, reference: NaiveDate) -> i64 {
    let delta = date.signed_duration_since(reference).num_days();
    if delta >= 0 { delta + 1 } else { delta }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_datetime(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S").to_string()
}
