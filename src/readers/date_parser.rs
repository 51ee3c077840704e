use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ProcessingError;

const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
const ISO_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const ISO_OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

const DAY_FIRST_DATETIME_FORMATS: &[&str] = &["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"];
// Two-digit years first: `%Y` would also take `69` as the year 69
const DAY_FIRST_DATE_FORMATS: &[&str] = &[
    "%d/%m/%y",
    "%d-%m-%y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
];

/// Accepted layouts for a source's date column
///
/// Serialized as its snake_case name, or as the raw pattern for `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DateFormat {
    /// ISO, then year-month, then `%m/%d/%Y`, then `%Y%m%d`
    #[default]
    Auto,
    /// `%Y-%m-%d` with optional time, `T` separator or offset
    Iso,
    /// `%d/%m/%Y` and friends, falling back to ISO
    DayFirst,
    /// `%d-%b-%y`, e.g. `05-Jan-20`
    DayMonthAbbrev,
    /// `%m/%d/%Y`
    MonthDayYear,
    /// `%Y-%m`
    YearMonth,
    /// Any strftime pattern; day defaults to the 1st when absent
    Custom(String),
}

impl DateFormat {
    /// Parse a raw field; `None` when no accepted layout matches
    pub fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        let trimmed = raw.trim().trim_matches('"');
        if trimmed.is_empty() {
            return None;
        }

        match self {
            DateFormat::Auto => parse_iso(trimmed)
                .or_else(|| parse_year_month(trimmed))
                .or_else(|| parse_date(trimmed, "%m/%d/%Y"))
                .or_else(|| parse_date(trimmed, "%Y%m%d")),
            DateFormat::Iso => parse_iso(trimmed),
            DateFormat::DayFirst => parse_day_first(trimmed).or_else(|| parse_iso(trimmed)),
            DateFormat::DayMonthAbbrev => parse_date(trimmed, "%d-%b-%y"),
            DateFormat::MonthDayYear => parse_date(trimmed, "%m/%d/%Y"),
            DateFormat::YearMonth => parse_year_month(trimmed),
            DateFormat::Custom(pattern) => parse_custom(trimmed, pattern),
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DateFormat::Auto => "auto",
            DateFormat::Iso => "iso",
            DateFormat::DayFirst => "day_first",
            DateFormat::DayMonthAbbrev => "day_month_abbrev",
            DateFormat::MonthDayYear => "month_day_year",
            DateFormat::YearMonth => "year_month",
            DateFormat::Custom(pattern) => pattern,
        };
        f.write_str(name)
    }
}

impl FromStr for DateFormat {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auto" | "" => Ok(DateFormat::Auto),
            "iso" => Ok(DateFormat::Iso),
            "day_first" => Ok(DateFormat::DayFirst),
            "day_month_abbrev" => Ok(DateFormat::DayMonthAbbrev),
            "month_day_year" => Ok(DateFormat::MonthDayYear),
            "year_month" => Ok(DateFormat::YearMonth),
            pattern if pattern.contains('%') => Ok(DateFormat::Custom(pattern.to_string())),
            other => Err(ProcessingError::Config(format!(
                "Unknown date format '{}'. Use auto, iso, day_first, day_month_abbrev, month_day_year, year_month or a strftime pattern",
                other
            ))),
        }
    }
}

impl TryFrom<String> for DateFormat {
    type Error = ProcessingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DateFormat> for String {
    fn from(format: DateFormat) -> Self {
        format.to_string()
    }
}

fn parse_date(raw: &str, pattern: &str) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(raw, pattern).ok()?;
    let date = if pattern.contains("%y") {
        posix_century(date)?
    } else {
        date
    };
    date.and_hms_opt(0, 0, 0)
}

/// Two-digit years 69-99 are 19xx and 00-68 are 20xx
///
/// chrono only sends 70-99 to the 1900s, so `69` comes back as 2069.
fn posix_century(date: NaiveDate) -> Option<NaiveDate> {
    if date.year() == 2069 {
        date.with_year(1969)
    } else {
        Some(date)
    }
}

fn parse_iso(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for pattern in ISO_OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, pattern) {
            return Some(dt.naive_utc());
        }
    }
    for pattern in ISO_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(dt);
        }
    }
    ISO_DATE_FORMATS
        .iter()
        .find_map(|pattern| parse_date(raw, pattern))
}

fn parse_day_first(raw: &str) -> Option<NaiveDateTime> {
    for pattern in DAY_FIRST_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(dt);
        }
    }
    DAY_FIRST_DATE_FORMATS
        .iter()
        .find_map(|pattern| parse_date(raw, pattern))
}

fn parse_year_month(raw: &str) -> Option<NaiveDateTime> {
    parse_date(&format!("{}-01", raw), "%Y-%m-%d")
}

fn parse_custom(raw: &str, pattern: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
        if pattern.contains("%y") {
            return posix_century(dt.date()).map(|d| d.and_time(dt.time()));
        }
        return Some(dt);
    }
    if let Some(dt) = parse_date(raw, pattern) {
        return Some(dt);
    }
    let has_day = ["%d", "%e", "%j", "%F", "%D", "%x"]
        .iter()
        .any(|spec| pattern.contains(spec));
    if has_day {
        None
    } else {
        parse_date(&format!("{}|01", raw), &format!("{}|%d", pattern))
    }
}
