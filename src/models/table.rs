use std::collections::BTreeMap;

use super::{MonthlySeries, YearMonth};

/// Monthly series outer-joined on month
///
/// Rows are keyed by month so iteration is always ascending and each month
/// appears exactly once. Every row holds one slot per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnifiedTable {
    columns: Vec<String>,
    rows: BTreeMap<YearMonth, Vec<Option<f64>>>,
}

impl UnifiedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&YearMonth, &[Option<f64>])> {
        self.rows.iter().map(|(month, values)| (month, values.as_slice()))
    }

    pub fn row(&self, month: &YearMonth) -> Option<&[Option<f64>]> {
        self.rows.get(month).map(Vec::as_slice)
    }

    pub fn value(&self, month: &YearMonth, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.rows.get(month).and_then(|row| row[idx])
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Outer-join one series into the table
    ///
    /// A series whose name is already a column replaces that column: its
    /// previous values are cleared before the new ones are written. Months
    /// already in the table are kept either way.
    pub fn outer_join(&mut self, series: &MonthlySeries) {
        let idx = match self.column_index(&series.name) {
            Some(idx) => {
                for row in self.rows.values_mut() {
                    row[idx] = None;
                }
                idx
            }
            None => {
                self.columns.push(series.name.clone());
                for row in self.rows.values_mut() {
                    row.push(None);
                }
                self.columns.len() - 1
            }
        };

        let width = self.columns.len();
        for (month, value) in &series.values {
            let row = self.rows.entry(*month).or_insert_with(|| vec![None; width]);
            row[idx] = Some(*value);
        }
    }
}
