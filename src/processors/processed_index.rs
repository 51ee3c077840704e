use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::Result;
use crate::models::{GranuleRef, Observation};
use crate::readers::DateFormat;

/// Dates already present in a collection's output CSV
///
/// Built from the first column of every data row. A granule is skipped
/// when its embedded date is in the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedIndex {
    dates: BTreeSet<NaiveDate>,
}

impl ProcessedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index an existing CSV; a missing file gives an empty index
    ///
    /// Anything at `path` that is not a regular file also reads as empty
    /// and is rejected when the writer opens it.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::new());
        }
        let index = Self::from_reader(File::open(path)?)?;
        debug!(path = %path.display(), dates = index.len(), "loaded processed index");
        Ok(index)
    }

    /// Rows whose first field is not a date are ignored
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut dates = BTreeSet::new();
        for record in csv_reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(_) => continue,
            };
            if let Some(time) = record.get(0).and_then(|field| DateFormat::Iso.parse(field)) {
                dates.insert(time.date());
            }
        }

        Ok(Self { dates })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    /// True when the granule's date is indexed; undated granules never are
    pub fn covers(&self, granule: &GranuleRef) -> bool {
        granule.date.is_some_and(|date| self.contains(date))
    }

    pub fn insert(&mut self, date: NaiveDate) -> bool {
        self.dates.insert(date)
    }

    pub fn record(&mut self, observations: &[Observation]) {
        for observation in observations {
            self.dates.insert(observation.time.date());
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}
