use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ProcessingError, Result};
use crate::models::{Observation, UnifiedTable};
use crate::utils::constants::{DEFAULT_BUFFER_SIZE, MONTH_COLUMN};

/// Render a value the way the output CSVs expect
///
/// Whole numbers keep one decimal (`15.0`); everything else uses the
/// shortest round-trip form.
pub fn format_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map(format_value).unwrap_or_default()
}

/// Appends extracted rows to a per-collection CSV
///
/// The header `time,lat,lon,<variable>` is written only when the file is
/// new or empty.
pub struct ObservationWriter {
    writer: csv::Writer<BufWriter<File>>,
    path: PathBuf,
    needs_header: bool,
}

impl ObservationWriter {
    /// Open for append, creating the file and its directory as needed
    pub fn open(path: &Path) -> Result<Self> {
        let unavailable = |source| ProcessingError::OutputUnavailable {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(unavailable)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(unavailable)?;
        let needs_header = file.metadata().map_err(unavailable)?.len() == 0;

        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            needs_header,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append rows and flush; returns the number of rows written
    pub fn append(&mut self, variable: &str, observations: &[Observation]) -> Result<usize> {
        if observations.is_empty() {
            return Ok(0);
        }

        if self.needs_header {
            self.writer.write_record(["time", "lat", "lon", variable])?;
            self.needs_header = false;
        }

        for observation in observations {
            self.writer.write_record([
                observation.time_field(),
                format_value(observation.lat),
                format_value(observation.lon),
                format_optional(observation.value),
            ])?;
        }
        self.writer.flush()?;

        debug!(path = %self.path.display(), rows = observations.len(), "appended rows");
        Ok(observations.len())
    }
}

/// Writes a unified table as `month,<col>,...` with one row per month
pub struct UnifiedTableWriter {
    month_column: String,
}

impl UnifiedTableWriter {
    pub fn new() -> Self {
        Self {
            month_column: MONTH_COLUMN.to_string(),
        }
    }

    pub fn with_month_column(mut self, name: &str) -> Self {
        self.month_column = name.to_string();
        self
    }

    pub fn write_table(&self, table: &UnifiedTable, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        self.write_to(table, BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file))?;
        debug!(path = %path.display(), rows = table.row_count(), "wrote unified table");
        Ok(())
    }

    pub fn write_to<W: Write>(&self, table: &UnifiedTable, writer: W) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        let mut header = Vec::with_capacity(table.columns().len() + 1);
        header.push(self.month_column.as_str());
        header.extend(table.columns().iter().map(String::as_str));
        csv_writer.write_record(&header)?;

        for (month, values) in table.rows() {
            let mut record = Vec::with_capacity(values.len() + 1);
            record.push(month.to_string());
            record.extend(values.iter().map(|v| format_optional(*v)));
            csv_writer.write_record(&record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

impl Default for UnifiedTableWriter {
    fn default() -> Self {
        Self::new()
    }
}
