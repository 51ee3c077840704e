use std::fs;
use std::io;
use std::path::Path;

use chrono::{NaiveDateTime, Utc};
use tracing::{debug, warn};

use crate::error::{ProcessingError, Result};
use crate::models::Observation;
use crate::readers::granule::{find_containing, Axis, GriddedDataset, Lookup};
use crate::utils::constants::{SALINITY_PATTERN, TIME_NAME};
use crate::utils::{embedded_date, nearest_index, normalize_longitude};

/// Requested extraction point in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointTarget {
    pub latitude: f64,
    pub longitude: f64,
}

impl PointTarget {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Where the timestamps of an extraction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    Dataset,
    FileName,
    WallClock,
}

/// Rows pulled from one granule
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Name of the data variable the values came from
    pub variable: String,
    pub observations: Vec<Observation>,
    pub time_source: TimeSource,
}

/// Selects the nearest grid cell to a point and flattens what remains
pub struct PointExtractor {
    variable_pattern: String,
}

impl PointExtractor {
    pub fn new() -> Self {
        Self {
            variable_pattern: SALINITY_PATTERN.to_string(),
        }
    }

    pub fn with_variable_pattern(pattern: impl Into<String>) -> Self {
        Self {
            variable_pattern: pattern.into(),
        }
    }

    /// Extract the point from an open dataset
    ///
    /// `source_name` supplies the fallback date when the dataset has no
    /// decodable time axis.
    pub fn extract<D: GriddedDataset + ?Sized>(
        &self,
        dataset: &D,
        source_name: &str,
        target: PointTarget,
    ) -> Result<Extraction> {
        let variable = match find_containing(&self.variable_pattern, &dataset.data_variable_names()) {
            Lookup::Found(name) => name,
            Lookup::NotFound(available) => {
                return Err(ProcessingError::VariableNotFound {
                    pattern: self.variable_pattern.clone(),
                    available,
                })
            }
        };

        let lat = select_axis(dataset, Axis::Latitude, target.latitude)?;
        let lon = select_axis(dataset, Axis::Longitude, target.longitude)?;

        let dims = dataset.dimensions(&variable)?;
        let position_of = |selection: &AxisSelection| {
            dims.iter()
                .position(|(name, _)| *name == selection.dimension)
                .ok_or_else(|| {
                    ProcessingError::InvalidFormat(format!(
                        "Variable '{}' is not indexed by '{}'",
                        variable, selection.dimension
                    ))
                })
        };
        let lat_pos = position_of(&lat)?;
        let lon_pos = position_of(&lon)?;

        let times = resolve_times(dataset, source_name);

        // Every dimension left after the point selection yields its own rows
        let free: Vec<usize> = (0..dims.len())
            .filter(|&i| i != lat_pos && i != lon_pos)
            .collect();
        let time_slot = times
            .dimension
            .as_ref()
            .and_then(|dim| free.iter().position(|&i| dims[i].0 == *dim));
        let total: usize = free.iter().map(|&i| dims[i].1).product();

        let mut index = vec![0usize; dims.len()];
        index[lat_pos] = lat.index;
        index[lon_pos] = lon.index;
        let mut counters = vec![0usize; free.len()];
        let mut observations = Vec::with_capacity(total);

        for _ in 0..total {
            for (slot, &dim) in free.iter().enumerate() {
                index[dim] = counters[slot];
            }
            let value = dataset.read_value(&variable, &index)?;
            let time = times.at(time_slot.map(|slot| counters[slot]));
            observations.push(Observation::new(time, lat.value, lon.value, value));

            for slot in (0..counters.len()).rev() {
                counters[slot] += 1;
                if counters[slot] < dims[free[slot]].1 {
                    break;
                }
                counters[slot] = 0;
            }
        }

        debug!(
            source = source_name,
            variable = %variable,
            lat = lat.value,
            lon = lon.value,
            rows = observations.len(),
            "extracted point"
        );

        Ok(Extraction {
            variable,
            observations,
            time_source: times.source,
        })
    }

    /// Open a local file, extract, and delete the file whatever the outcome
    pub fn extract_file<D, F>(&self, path: &Path, target: PointTarget, open: F) -> Result<Extraction>
    where
        D: GriddedDataset,
        F: FnOnce(&Path) -> Result<D>,
    {
        let _discard = DiscardOnDrop::new(path);
        let source_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();

        let dataset = open(path)?;
        let extraction = self.extract(&dataset, source_name, target);
        // Close before the guard removes the file
        drop(dataset);
        extraction
    }
}

impl Default for PointExtractor {
    fn default() -> Self {
        Self::new()
    }
}

struct AxisSelection {
    dimension: String,
    index: usize,
    value: f64,
}

fn select_axis<D: GriddedDataset + ?Sized>(
    dataset: &D,
    axis: Axis,
    target: f64,
) -> Result<AxisSelection> {
    let name = match dataset.locate_axis(axis) {
        Lookup::Found(name) => name,
        Lookup::NotFound(searched) => {
            return Err(ProcessingError::CoordinateNotFound {
                axis: axis.label().to_string(),
                searched,
            })
        }
    };

    let dims = dataset.dimensions(&name)?;
    if dims.len() != 1 {
        return Err(ProcessingError::InvalidFormat(format!(
            "{} coordinate '{}' must be one-dimensional, has {} dimensions",
            axis.label(),
            name,
            dims.len()
        )));
    }

    let values = dataset.read_axis(&name)?;
    let target = match axis {
        Axis::Longitude => normalize_longitude(target, &values),
        Axis::Latitude => target,
    };
    let index = nearest_index(&values, target)?;

    Ok(AxisSelection {
        dimension: dims[0].0.clone(),
        index,
        value: values[index],
    })
}

struct TimeAxis {
    source: TimeSource,
    /// Dimension the values run along; `None` for a single timestamp
    dimension: Option<String>,
    first: NaiveDateTime,
    values: Vec<NaiveDateTime>,
}

impl TimeAxis {
    fn single(source: TimeSource, time: NaiveDateTime) -> Self {
        Self {
            source,
            dimension: None,
            first: time,
            values: vec![time],
        }
    }

    fn at(&self, position: Option<usize>) -> NaiveDateTime {
        position
            .and_then(|i| self.values.get(i))
            .copied()
            .unwrap_or(self.first)
    }
}

/// Dataset time axis, then the date in the file name, then now
fn resolve_times<D: GriddedDataset + ?Sized>(dataset: &D, source_name: &str) -> TimeAxis {
    let name = dataset
        .coordinate_names()
        .into_iter()
        .find(|name| name == TIME_NAME)
        .or_else(|| {
            dataset
                .variable_names()
                .into_iter()
                .find(|name| name == TIME_NAME)
        });

    if let Some(name) = name {
        match dataset.decode_time(&name) {
            Ok(values) if !values.is_empty() => {
                let dimension = dataset
                    .dimensions(&name)
                    .ok()
                    .filter(|dims| dims.len() == 1)
                    .map(|dims| dims[0].0.clone());
                return TimeAxis {
                    source: TimeSource::Dataset,
                    dimension,
                    first: values[0],
                    values,
                };
            }
            Ok(_) => debug!(source = source_name, "time variable is empty"),
            Err(e) => warn!("Could not decode '{}' in {}: {}", name, source_name, e),
        }
    }

    if let Some(time) = embedded_date(source_name).and_then(|date| date.and_hms_opt(0, 0, 0)) {
        return TimeAxis::single(TimeSource::FileName, time);
    }

    warn!(
        "No time information in {}; stamping rows with the current time",
        source_name
    );
    TimeAxis::single(TimeSource::WallClock, Utc::now().naive_utc())
}

/// Removes a file when dropped
struct DiscardOnDrop<'a> {
    path: &'a Path,
}

impl<'a> DiscardOnDrop<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path }
    }
}

impl Drop for DiscardOnDrop<'_> {
    fn drop(&mut self) {
        match fs::remove_file(self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed granule"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::MemoryDataset;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    const NAME: &str = "RSS_smap_SSS_L3_8day_running_20210315_FNL_v06.0.nc";

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn red_sea() -> PointTarget {
        PointTarget::new(20.875, 37.625)
    }

    fn grid_without_time() -> MemoryDataset {
        MemoryDataset::new()
            .with_axis("lat", vec![20.625, 20.875, 21.125])
            .with_axis("lon", vec![37.375, 37.625, 37.875])
            .with_variable(
                "sss_smap",
                &[("lat", 3), ("lon", 3)],
                vec![1.0, 2.0, 3.0, 4.0, 39.5, 6.0, 7.0, 8.0, 9.0],
            )
    }

    #[test]
    fn test_single_time_yields_one_row() {
        let grid = MemoryDataset::new()
            .with_axis("time", vec![2.0])
            .with_attribute("time", "units", "days since 2021-03-13 00:00:00")
            .with_axis("lat", vec![20.625, 20.875])
            .with_axis("lon", vec![37.375, 37.625])
            .with_variable("nobs", &[("lat", 2), ("lon", 2)], vec![0.0; 4])
            .with_variable(
                "sss_smap",
                &[("time", 1), ("lat", 2), ("lon", 2)],
                vec![1.0, 2.0, 3.0, 39.25],
            );

        let extraction = PointExtractor::new().extract(&grid, NAME, red_sea()).unwrap();

        assert_eq!(extraction.variable, "sss_smap");
        assert_eq!(extraction.time_source, TimeSource::Dataset);
        assert_eq!(
            extraction.observations,
            vec![Observation::new(day(2021, 3, 15), 20.875, 37.625, Some(39.25))]
        );
    }

    #[test]
    fn test_nearest_cell_selected() {
        let extraction = PointExtractor::new()
            .extract(&grid_without_time(), NAME, PointTarget::new(20.9, 37.7))
            .unwrap();
        let row = &extraction.observations[0];
        assert_eq!((row.lat, row.lon, row.value), (20.875, 37.625, Some(39.5)));
    }

    #[test]
    fn test_time_from_file_name() {
        let extraction = PointExtractor::new()
            .extract(&grid_without_time(), NAME, red_sea())
            .unwrap();
        assert_eq!(extraction.time_source, TimeSource::FileName);
        assert_eq!(extraction.observations[0].time, day(2021, 3, 15));
    }

    #[test]
    fn test_time_falls_back_to_wall_clock() {
        let before = Utc::now().naive_utc();
        let extraction = PointExtractor::new()
            .extract(&grid_without_time(), "sss_monthly.nc", red_sea())
            .unwrap();
        assert_eq!(extraction.time_source, TimeSource::WallClock);
        assert!(extraction.observations[0].time >= before);
    }

    #[test]
    fn test_time_axis_expands_rows() {
        let grid = MemoryDataset::new()
            .with_axis("time", vec![0.0, 31.0, 60.0])
            .with_attribute("time", "units", "days since 2020-01-01")
            .with_axis("lat", vec![20.875])
            .with_axis("lon", vec![37.625])
            .with_variable(
                "sss",
                &[("time", 3), ("lat", 1), ("lon", 1)],
                vec![36.0, f64::NAN, 36.5],
            );

        let extraction = PointExtractor::new().extract(&grid, NAME, red_sea()).unwrap();

        let rows: Vec<_> = extraction
            .observations
            .iter()
            .map(|o| (o.time, o.value))
            .collect();
        assert_eq!(
            rows,
            vec![
                (day(2020, 1, 1), Some(36.0)),
                (day(2020, 2, 1), None),
                (day(2020, 3, 1), Some(36.5)),
            ]
        );
    }

    #[test]
    fn test_extra_dimension_without_time() {
        let grid = MemoryDataset::new()
            .with_axis("depth", vec![1.0, 5.0])
            .with_axis("lat", vec![20.875])
            .with_axis("lon", vec![37.625])
            .with_variable("sss", &[("depth", 2), ("lat", 1), ("lon", 1)], vec![36.0, 37.0]);

        let extraction = PointExtractor::new().extract(&grid, NAME, red_sea()).unwrap();

        assert_eq!(extraction.observations.len(), 2);
        assert!(extraction
            .observations
            .iter()
            .all(|o| o.time == day(2021, 3, 15)));
        assert_eq!(extraction.observations[1].value, Some(37.0));
    }

    #[test]
    fn test_longitude_convention_matched() {
        let grid = MemoryDataset::new()
            .with_axis("latitude", vec![0.0])
            .with_axis("longitude", vec![0.0, 90.0, 180.0, 270.0, 340.0])
            .with_variable(
                "SSS",
                &[("latitude", 1), ("longitude", 5)],
                vec![1.0, 2.0, 3.0, 4.0, 5.0],
            );

        let extraction = PointExtractor::new()
            .extract(&grid, NAME, PointTarget::new(0.0, -20.0))
            .unwrap();

        assert_eq!(extraction.observations[0].lon, 340.0);
        assert_eq!(extraction.observations[0].value, Some(5.0));
    }

    #[test]
    fn test_missing_variable_lists_data_variables() {
        let grid = MemoryDataset::new()
            .with_axis("lat", vec![0.0])
            .with_axis("lon", vec![0.0])
            .with_variable("sst", &[("lat", 1), ("lon", 1)], vec![1.0]);

        match PointExtractor::new().extract(&grid, NAME, red_sea()) {
            Err(ProcessingError::VariableNotFound { pattern, available }) => {
                assert_eq!(pattern, "sss");
                assert_eq!(available, vec!["sst"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_coordinate() {
        let grid = MemoryDataset::new()
            .with_axis("lat", vec![0.0])
            .with_axis("x", vec![0.0])
            .with_variable("sss", &[("lat", 1), ("x", 1)], vec![1.0]);

        match PointExtractor::new().extract(&grid, NAME, red_sea()) {
            Err(ProcessingError::CoordinateNotFound { axis, searched }) => {
                assert_eq!(axis, "longitude");
                assert!(searched.contains(&"x".to_string()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_extract_file_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(NAME);
        fs::write(&path, b"granule").unwrap();

        let extraction = PointExtractor::new()
            .extract_file(&path, red_sea(), |_| Ok(grid_without_time()))
            .unwrap();

        assert_eq!(extraction.observations.len(), 1);
        assert!(!path.exists());
    }

    #[test]
    fn test_extract_file_removes_file_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(NAME);
        fs::write(&path, b"not netcdf").unwrap();

        let result = PointExtractor::new().extract_file(&path, red_sea(), |_| {
            Err::<MemoryDataset, _>(ProcessingError::InvalidFormat("unreadable".into()))
        });

        assert!(result.is_err());
        assert!(!path.exists());
    }
}
