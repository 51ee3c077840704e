use crate::error::{ProcessingError, Result};
use crate::models::{ColumnRef, RawObservation, SourceSpec};
use std::borrow::Cow;
use std::fs;
use tracing::debug;

/// Reads one CSV source into raw (timestamp, value) observations
pub struct SourceReader {
    trim_fields: bool,
}

impl SourceReader {
    pub fn new() -> Self {
        Self { trim_fields: true }
    }

    pub fn with_trim_fields(trim_fields: bool) -> Self {
        Self { trim_fields }
    }

    /// Read the file named by `spec`
    pub fn read(&self, spec: &SourceSpec) -> Result<Vec<RawObservation>> {
        let bytes = fs::read(&spec.path)?;
        let text = decode_text(&bytes);
        let observations = self.read_str(spec, &text).map_err(|e| match e {
            ProcessingError::MissingData(msg) => {
                ProcessingError::MissingData(format!("{} ({})", msg, spec.path.display()))
            }
            other => other,
        })?;

        debug!(
            source = %spec.name,
            path = %spec.path.display(),
            rows = observations.len(),
            "read source"
        );

        Ok(observations)
    }

    /// Read CSV text already in memory
    pub fn read_str(&self, spec: &SourceSpec, text: &str) -> Result<Vec<RawObservation>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(spec.has_header)
            .flexible(true)
            .trim(if self.trim_fields {
                csv::Trim::All
            } else {
                csv::Trim::None
            })
            .from_reader(text.as_bytes());

        let headers = if spec.has_header {
            Some(reader.headers()?.clone())
        } else {
            None
        };

        let date_idx = resolve_column(&spec.date_column, headers.as_ref())?;
        let value_idx = resolve_column(&spec.value_column, headers.as_ref())?;

        let mut observations = Vec::new();
        for record in reader.records().skip(spec.skip_rows) {
            let record = record?;
            let timestamp = record
                .get(date_idx)
                .and_then(|field| spec.date_format.parse(field));
            let value = record.get(value_idx).and_then(parse_value);
            observations.push(RawObservation::new(timestamp, value));
        }

        Ok(observations)
    }
}

impl Default for SourceReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Numeric field, or `None` for empty, non-numeric and NaN
pub fn parse_value(field: &str) -> Option<f64> {
    field
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| !v.is_nan())
}

/// UTF-8 with BOM stripped, or Windows-1252 when the bytes are not UTF-8
fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text
        }
    }
}

fn resolve_column(column: &ColumnRef, headers: Option<&csv::StringRecord>) -> Result<usize> {
    match (column, headers) {
        (ColumnRef::Index(idx), _) => Ok(*idx),
        (ColumnRef::Name(name), Some(headers)) => headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| {
                ProcessingError::MissingData(format!(
                    "column '{}' not found; available: {:?}",
                    name,
                    headers.iter().collect::<Vec<_>>()
                ))
            }),
        (ColumnRef::Name(name), None) => Err(ProcessingError::MissingData(format!(
            "column '{}' referenced by name but the source has no header",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::date_parser::DateFormat;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ymd(y: i32, m: u32, d: u32) -> Option<chrono::NaiveDateTime> {
        NaiveDate::from_ymd_opt(y, m, d).and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    #[test]
    fn test_read_named_columns() {
        let spec = SourceSpec::new("sss_anomaly", "unused.csv", "datetime", "SSS_anomaly");
        let text = "datetime,SSS_anomaly,other\n2020-01-05,0.25,x\nbad,0.5,y\n2020-02-01,,z\n";

        let rows = SourceReader::new().read_str(&spec, text).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], RawObservation::new(ymd(2020, 1, 5), Some(0.25)));
        assert_eq!(rows[1].timestamp, None);
        assert_eq!(rows[2].value, None);
    }

    #[test]
    fn test_read_positional_columns() {
        // sst, date, col3, col4
        let spec = SourceSpec::new("sst", "unused.csv", 1usize, 0usize).headerless();
        let text = "27.1,2020-01-15,a,b\n27.9,2020-02-15,a,b\n";

        let rows = SourceReader::new().read_str(&spec, text).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], RawObservation::new(ymd(2020, 2, 15), Some(27.9)));
    }

    #[test]
    fn test_skip_rows_after_header() {
        let spec = SourceSpec::new("d18O", "unused.csv", 0usize, 1usize)
            .headerless()
            .with_skip_rows(1)
            .with_date_format(DateFormat::DayMonthAbbrev);
        let text = "Date,d18O,notes\n05-Jan-20,-4.1,ok\n20-Jan-20,n/a,ok\n";

        let rows = SourceReader::new().read_str(&spec, text).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], RawObservation::new(ymd(2020, 1, 5), Some(-4.1)));
        assert_eq!(rows[1].value, None);
    }

    #[test]
    fn test_missing_named_column_lists_headers() {
        let spec = SourceSpec::new("x", "unused.csv", "Date", "Salinity");
        let err = SourceReader::new()
            .read_str(&spec, "Time,Salinity\n2020-01,36.1\n")
            .unwrap_err();
        assert!(err.to_string().contains("Time"));
    }

    #[test]
    fn test_name_without_header_is_error() {
        let spec = SourceSpec::new("x", "unused.csv", "time", 1usize).headerless();
        assert!(SourceReader::new().read_str(&spec, "2020-01,36.1\n").is_err());
    }

    #[test]
    fn test_short_rows_become_missing() {
        let spec = SourceSpec::new("x", "unused.csv", 0usize, 4usize).headerless();
        let rows = SourceReader::new()
            .read_str(&spec, "2020-01-01,1,2,3,36.5\n2020-01-02,1\n")
            .unwrap();
        assert_eq!(rows[0].value, Some(36.5));
        assert_eq!(rows[1].value, None);
    }

    #[test]
    fn test_read_latin1_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"Date_MSUD,d18O_MSUD,Site\n05/01/2020,-4.2,Sanganeb \xB0N\n")?;

        let spec = SourceSpec::new("d18O_MSUD", file.path(), "Date_MSUD", "d18O_MSUD")
            .with_date_format(DateFormat::DayFirst);
        let rows = SourceReader::new().read(&spec)?;

        assert_eq!(rows, vec![RawObservation::new(ymd(2020, 1, 5), Some(-4.2))]);
        Ok(())
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value(" 36.25 "), Some(36.25));
        assert_eq!(parse_value("NaN"), None);
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("n/a"), None);
    }
}
