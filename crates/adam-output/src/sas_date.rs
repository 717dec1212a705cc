//! ISO 8601 text to SAS date and datetime numerics.
//!
//! SAS counts days (dates) or seconds (datetimes) from 1960-01-01.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use adam_model::Variable;

/// How a numeric variable's text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SasTemporal {
    Date,
    DateTime,
}

impl SasTemporal {
    /// Classifies a variable by its display format; `None` for plain numerics.
    pub fn of(variable: &Variable) -> Option<Self> {
        let format = variable.format.as_deref()?.trim().to_uppercase();
        if format.starts_with("DATETIME") || format.starts_with("E8601DT") {
            Some(Self::DateTime)
        } else if format.starts_with("DATE")
            || format.starts_with("E8601DA")
            || format.starts_with("YYMMDD")
        {
            Some(Self::Date)
        } else {
            None
        }
    }

    pub fn convert(self, text: &str) -> Option<f64> {
        match self {
            Self::Date => iso_to_sas_date(text),
            Self::DateTime => iso_to_sas_datetime(text),
        }
    }
}

fn sas_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1960, 1, 1).expect("1960-01-01 is a valid date")
}

fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let date_part = text.split('T').next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    let (date_part, time_part) = match text.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (text, None),
    };
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    let time = match time_part {
        None => NaiveTime::MIN,
        Some(time) => ["%H:%M:%S", "%H:%M", "%H"]
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(time, format).ok())?,
    };
    Some(date.and_time(time))
}

/// Days since 1960-01-01 for a complete ISO date; a time part is ignored.
/// Partial and invalid dates yield `None`.
pub fn iso_to_sas_date(text: &str) -> Option<f64> {
    let date = parse_iso_date(text.trim())?;
    Some(date.signed_duration_since(sas_epoch()).num_days() as f64)
}

/// Seconds since 1960-01-01T00:00:00; a bare date is taken as midnight.
pub fn iso_to_sas_datetime(text: &str) -> Option<f64> {
    let value = parse_iso_datetime(text.trim())?;
    let epoch = sas_epoch().and_time(NaiveTime::MIN);
    Some(value.signed_duration_since(epoch).num_seconds() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_count_days_from_1960() {
        assert_eq!(iso_to_sas_date("1960-01-01"), Some(0.0));
        assert_eq!(iso_to_sas_date("1960-01-02"), Some(1.0));
        assert_eq!(iso_to_sas_date("1959-12-31"), Some(-1.0));
        assert_eq!(iso_to_sas_date("2014-01-02"), Some(19725.0));
        assert_eq!(iso_to_sas_date("2014-01-02T08:30:00"), Some(19725.0));
    }

    #[test]
    fn partial_or_invalid_dates_are_missing() {
        assert_eq!(iso_to_sas_date("2014-01"), None);
        assert_eq!(iso_to_sas_date("2014"), None);
        assert_eq!(iso_to_sas_date("2014-02-30"), None);
        assert_eq!(iso_to_sas_date(""), None);
    }

    #[test]
    fn datetimes_count_seconds_from_1960() {
        assert_eq!(iso_to_sas_datetime("1960-01-01T00:01:00"), Some(60.0));
        assert_eq!(iso_to_sas_datetime("1960-01-02"), Some(86_400.0));
        assert_eq!(
            iso_to_sas_datetime("2014-01-02T08:30"),
            Some(19725.0 * 86_400.0 + 8.0 * 3600.0 + 30.0 * 60.0)
        );
        assert_eq!(iso_to_sas_datetime("2014-01-02T25:00"), None);
    }

    #[test]
    fn classifies_by_format() {
        let date = Variable::num("TRTSDT", "").with_format("DATE9.");
        let datetime = Variable::num("TRTSDTM", "").with_format("DATETIME20.");
        assert_eq!(SasTemporal::of(&date), Some(SasTemporal::Date));
        assert_eq!(SasTemporal::of(&datetime), Some(SasTemporal::DateTime));
        assert_eq!(SasTemporal::of(&Variable::num("AGE", "")), None);
    }
}
