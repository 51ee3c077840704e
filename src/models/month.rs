use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{ProcessingError, Result};

/// A calendar month with no day or time component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ProcessingError::InvalidFormat(format!(
                "Month must be between 1 and 12, got: {}",
                month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month
    pub fn first_day(&self) -> NaiveDate {
        // month is range-checked on construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }
}

impl From<NaiveDate> for YearMonth {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl From<NaiveDateTime> for YearMonth {
    fn from(datetime: NaiveDateTime) -> Self {
        datetime.date().into()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let (year, month) = trimmed.split_once('-').ok_or_else(|| {
            ProcessingError::InvalidFormat(format!("Invalid month: '{}'. Expected 'YYYY-MM'", s))
        })?;

        let year = year
            .parse::<i32>()
            .map_err(|_| ProcessingError::InvalidFormat(format!("Invalid year in '{}'", s)))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| ProcessingError::InvalidFormat(format!("Invalid month in '{}'", s)))?;

        Self::new(year, month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
