use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Result;
use crate::models::{MonthlySeries, RawObservation, SourceSpec, YearMonth};
use crate::readers::SourceReader;

/// Resamples raw observations to one mean value per calendar month
pub struct MonthlyNormalizer {
    reader: SourceReader,
}

impl MonthlyNormalizer {
    pub fn new() -> Self {
        Self {
            reader: SourceReader::new(),
        }
    }

    pub fn with_reader(reader: SourceReader) -> Self {
        Self { reader }
    }

    /// Group by month and average
    ///
    /// Rows without a timestamp are dropped. Missing values are ignored in
    /// the mean, and a month whose values are all missing is left out.
    pub fn normalize(&self, name: &str, observations: &[RawObservation]) -> MonthlySeries {
        let mut sums: BTreeMap<YearMonth, (f64, usize)> = BTreeMap::new();
        let mut undated = 0usize;

        for observation in observations {
            let Some(timestamp) = observation.timestamp else {
                undated += 1;
                continue;
            };
            let Some(value) = observation.value else {
                continue;
            };
            let entry = sums.entry(YearMonth::from(timestamp)).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }

        if undated > 0 {
            debug!(source = name, undated, "dropped rows with unparseable dates");
        }

        MonthlySeries::from_pairs(
            name,
            sums.into_iter()
                .map(|(month, (sum, count))| (month, sum / count as f64)),
        )
    }

    /// Read a source and normalize it under the source's name
    pub fn load(&self, spec: &SourceSpec) -> Result<MonthlySeries> {
        let observations = self.reader.read(spec)?;
        let series = self.normalize(&spec.name, &observations);
        debug!(
            source = %spec.name,
            rows = observations.len(),
            months = series.len(),
            "normalized source"
        );
        Ok(series)
    }
}

impl Default for MonthlyNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
