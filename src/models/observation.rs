use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::utils::filename::{embedded_date, file_name_from_url};

/// A remote granule and the date its name carries, if any
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GranuleRef {
    pub url: String,
    pub date: Option<NaiveDate>,
}

impl GranuleRef {
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let date = embedded_date(&url);
        Self { url, date }
    }

    pub fn file_name(&self) -> Option<&str> {
        file_name_from_url(&self.url)
    }

    /// Inclusive date-range check
    ///
    /// Granules with no embedded date always pass, as does everything when
    /// neither bound is set.
    pub fn in_range(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
        let Some(date) = self.date else {
            return true;
        };
        if start.is_some_and(|s| date < s) {
            return false;
        }
        if end.is_some_and(|e| date > e) {
            return false;
        }
        true
    }
}

/// One extracted grid-point value, written as one CSV row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub time: NaiveDateTime,
    pub lat: f64,
    pub lon: f64,
    pub value: Option<f64>,
}

impl Observation {
    pub fn new(time: NaiveDateTime, lat: f64, lon: f64, value: Option<f64>) -> Self {
        Self {
            time,
            lat,
            lon,
            value,
        }
    }

    /// `YYYY-MM-DD` at midnight, `YYYY-MM-DD HH:MM:SS` otherwise
    pub fn time_field(&self) -> String {
        if self.time.num_seconds_from_midnight() == 0 {
            self.time.format("%Y-%m-%d").to_string()
        } else {
            self.time.format("%Y-%m-%d %H:%M:%S").to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granule_date_from_url() {
        let granule = GranuleRef::from_url(
            "https://archive.podaac.earthdata.nasa.gov/RSS_smap_SSS_L3_8day_running_20150505_FNL_v06.0.nc",
        );
        assert_eq!(granule.date, NaiveDate::from_ymd_opt(2015, 5, 5));
        assert_eq!(
            granule.file_name(),
            Some("RSS_smap_SSS_L3_8day_running_20150505_FNL_v06.0.nc")
        );
    }

    #[test]
    fn test_in_range() {
        let granule = GranuleRef::from_url("https://host/sss_20200115.nc");
        let jan1 = NaiveDate::from_ymd_opt(2020, 1, 1);
        let jan15 = NaiveDate::from_ymd_opt(2020, 1, 15);
        let feb1 = NaiveDate::from_ymd_opt(2020, 2, 1);

        assert!(granule.in_range(None, None));
        assert!(granule.in_range(jan1, feb1));
        assert!(granule.in_range(jan15, jan15));
        assert!(!granule.in_range(feb1, None));
        assert!(!granule.in_range(None, jan1));
    }

    #[test]
    fn test_undated_granule_always_in_range() {
        let granule = GranuleRef::from_url("https://host/sss_monthly_2020_01.nc");
        assert!(granule.date.is_none());
        assert!(granule.in_range(NaiveDate::from_ymd_opt(2030, 1, 1), None));
    }

    #[test]
    fn test_time_field() {
        let midnight = NaiveDate::from_ymd_opt(2021, 3, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let noon = midnight + chrono::Duration::hours(12);
        assert_eq!(Observation::new(midnight, 0.0, 0.0, None).time_field(), "2021-03-15");
        assert_eq!(
            Observation::new(noon, 0.0, 0.0, None).time_field(),
            "2021-03-15 12:00:00"
        );
    }
}
