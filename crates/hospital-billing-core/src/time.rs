//! Duration and time-span helpers.
//!
//! Handles:
//! - Treatment durations (days/weeks/months) normalized to days
//! - Elapsed time between two timestamps for O2/ISO billing
//! - Inpatient stay length between admission and discharge dates

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Days in a billing month. Not calendar-aware.
pub const DAYS_PER_MONTH: u32 = 30;

/// Days in a week.
pub const DAYS_PER_WEEK: u32 = 7;

/// Time utility errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeError {
    #[error("End time {end} must be after start time {start}")]
    InvalidRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Unrecognized timestamp: {0}")]
    Parse(String),

    #[error("Unknown duration unit: {0}")]
    UnknownUnit(String),
}

pub type TimeResult<T> = Result<T, TimeError>;

/// Unit a treatment duration is entered in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    #[default]
    Days,
    Weeks,
    Months,
}

impl DurationUnit {
    fn multiplier(self) -> Decimal {
        match self {
            DurationUnit::Days => Decimal::ONE,
            DurationUnit::Weeks => Decimal::from(DAYS_PER_WEEK),
            DurationUnit::Months => Decimal::from(DAYS_PER_MONTH),
        }
    }
}

impl FromStr for DurationUnit {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" | "days" | "d" => Ok(DurationUnit::Days),
            "week" | "weeks" | "w" => Ok(DurationUnit::Weeks),
            "month" | "months" | "m" => Ok(DurationUnit::Months),
            other => Err(TimeError::UnknownUnit(other.to_string())),
        }
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DurationUnit::Days => "days",
            DurationUnit::Weeks => "weeks",
            DurationUnit::Months => "months",
        };
        f.write_str(s)
    }
}

/// Convert a duration to days (weeks ×7, months ×30). `None` on overflow.
pub fn to_days(value: Decimal, unit: DurationUnit) -> Option<Decimal> {
    value.checked_mul(unit.multiplier())
}

/// Granularity for [`elapsed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeGrain {
    Hours,
    Minutes,
}

/// Fractional hours or minutes between two timestamps.
pub fn elapsed(start: NaiveDateTime, end: NaiveDateTime, grain: TimeGrain) -> TimeResult<Decimal> {
    if end <= start {
        return Err(TimeError::InvalidRange { start, end });
    }
    let seconds = Decimal::from((end - start).num_seconds());
    let per = match grain {
        TimeGrain::Hours => dec!(3600),
        TimeGrain::Minutes => dec!(60),
    };
    Ok(seconds / per)
}

/// Whole days between admission and discharge; zero when discharge is not after admission.
pub fn stay_days(admission: NaiveDate, discharge: NaiveDate) -> u32 {
    let days = (discharge - admission).num_days();
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}

/// Parse `YYYY-MM-DDTHH:MM[:SS]` (the form a datetime-local input produces).
pub fn parse_datetime(s: &str) -> TimeResult<NaiveDateTime> {
    let trimmed = s.trim();
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| TimeError::Parse(trimmed.to_string()))
}

/// Parse `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> TimeResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| TimeError::Parse(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        parse_datetime(s).unwrap()
    }

    #[test]
    fn test_to_days() {
        assert_eq!(to_days(dec!(3), DurationUnit::Days), Some(dec!(3)));
        assert_eq!(to_days(dec!(2), DurationUnit::Weeks), Some(dec!(14)));
        assert_eq!(to_days(dec!(1), DurationUnit::Months), Some(dec!(30)));
        assert_eq!(to_days(dec!(1.5), DurationUnit::Weeks), Some(dec!(10.5)));
        assert_eq!(to_days(Decimal::MAX, DurationUnit::Months), None);
    }

    #[test]
    fn test_duration_unit_parsing() {
        assert_eq!("Weeks".parse::<DurationUnit>().unwrap(), DurationUnit::Weeks);
        assert_eq!(" month ".parse::<DurationUnit>().unwrap(), DurationUnit::Months);
        assert!("fortnight".parse::<DurationUnit>().is_err());
    }

    #[test]
    fn test_elapsed_hours_and_minutes() {
        let start = at("2024-01-01T00:00");
        let end = at("2024-01-01T02:30");
        assert_eq!(elapsed(start, end, TimeGrain::Hours).unwrap(), dec!(2.5));
        assert_eq!(elapsed(start, end, TimeGrain::Minutes).unwrap(), dec!(150));
    }

    #[test]
    fn test_elapsed_rejects_non_positive_range() {
        let start = at("2024-01-01T02:00");
        assert!(matches!(
            elapsed(start, start, TimeGrain::Hours),
            Err(TimeError::InvalidRange { .. })
        ));
        assert!(elapsed(start, at("2024-01-01T01:00"), TimeGrain::Minutes).is_err());
    }

    #[test]
    fn test_stay_days() {
        let admission = parse_date("2024-03-01").unwrap();
        assert_eq!(stay_days(admission, parse_date("2024-03-04").unwrap()), 3);
        assert_eq!(stay_days(admission, admission), 0);
        assert_eq!(stay_days(admission, parse_date("2024-02-28").unwrap()), 0);
    }

    #[test]
    fn test_parse_datetime_with_seconds() {
        let parsed = parse_datetime("2024-01-01T08:15:30").unwrap();
        assert_eq!(parsed.format("%H:%M:%S").to_string(), "08:15:30");
        assert!(parse_datetime("yesterday").is_err());
    }
}
