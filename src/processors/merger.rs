use tracing::info;

use crate::error::Result;
use crate::models::{MonthlySeries, SourceSpec, UnifiedTable};
use crate::processors::normalizer::MonthlyNormalizer;

/// Folds monthly series into one month-keyed table
pub struct SeriesMerger {
    normalizer: MonthlyNormalizer,
}

impl SeriesMerger {
    pub fn new() -> Self {
        Self {
            normalizer: MonthlyNormalizer::new(),
        }
    }

    pub fn with_normalizer(normalizer: MonthlyNormalizer) -> Self {
        Self { normalizer }
    }

    /// Outer-join every series in order
    ///
    /// Column order follows input order. A repeated name replaces the
    /// earlier column.
    pub fn merge(&self, series: &[MonthlySeries]) -> UnifiedTable {
        series.iter().fold(UnifiedTable::new(), |mut table, s| {
            table.outer_join(s);
            table
        })
    }

    /// Load, normalize and merge a list of sources
    pub fn unify(&self, sources: &[SourceSpec]) -> Result<UnifiedTable> {
        let mut series = Vec::with_capacity(sources.len());
        for spec in sources {
            let loaded = self.normalizer.load(spec)?;
            info!("Loaded {} months for {}", loaded.len(), spec.name);
            series.push(loaded);
        }

        let table = self.merge(&series);
        info!(
            "Unified {} sources into {} monthly rows",
            table.columns().len(),
            table.row_count()
        );
        Ok(table)
    }
}

impl Default for SeriesMerger {
    fn default() -> Self {
        Self::new()
    }
}
