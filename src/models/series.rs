use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::YearMonth;

/// One parsed row of a source table before resampling
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    /// `None` when the date failed every accepted format
    pub timestamp: Option<NaiveDateTime>,
    /// `None` when the value was empty or non-numeric
    pub value: Option<f64>,
}

impl RawObservation {
    pub fn new(timestamp: Option<NaiveDateTime>, value: Option<f64>) -> Self {
        Self { timestamp, value }
    }
}

/// A series resampled to exactly one averaged value per calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySeries {
    pub name: String,
    pub values: BTreeMap<YearMonth, f64>,
}

impl MonthlySeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn from_pairs(name: impl Into<String>, pairs: impl IntoIterator<Item = (YearMonth, f64)>) -> Self {
        Self {
            name: name.into(),
            values: pairs.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, month: &YearMonth) -> Option<f64> {
        self.values.get(month).copied()
    }

    pub fn months(&self) -> impl Iterator<Item = &YearMonth> {
        self.values.keys()
    }

    /// The series as raw observations stamped at the first day of each month
    pub fn observations(&self) -> Vec<RawObservation> {
        self.values
            .iter()
            .map(|(month, value)| {
                RawObservation::new(month.first_day().and_hms_opt(0, 0, 0), Some(*value))
            })
            .collect()
    }
}
