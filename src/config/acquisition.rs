use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::{Validate, ValidationError};

use crate::error::{ProcessingError, Result};
use crate::processors::PointTarget;
use crate::utils::constants::{
    CATALOG_TIMEOUT_SECS, CMR_SEARCH_URL, DEFAULT_LATITUDE, DEFAULT_LONGITUDE, DEFAULT_PAGE_SIZE,
    DOWNLOAD_TIMEOUT_SECS, SMAP_8DAY_CONCEPT_ID, SMAP_MONTHLY_CONCEPT_ID,
};
use crate::utils::filename::collection_csv_name;

/// A catalog collection and where its files and rows go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CollectionConfig {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub concept_id: String,
    /// Download directory
    pub out_dir: PathBuf,
    /// Per-collection output CSV
    pub csv: PathBuf,
}

impl CollectionConfig {
    pub fn new(name: &str, concept_id: &str, out_dir: impl Into<PathBuf>, csv: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            concept_id: concept_id.to_string(),
            out_dir: out_dir.into(),
            csv: csv.into(),
        }
    }
}

/// The two SMAP RSS L3 V6 products, named after the extraction point
pub fn default_collections(latitude: f64, longitude: f64) -> Vec<CollectionConfig> {
    vec![
        CollectionConfig::new(
            "8day",
            SMAP_8DAY_CONCEPT_ID,
            "data_8day",
            collection_csv_name("8day", latitude, longitude),
        ),
        CollectionConfig::new(
            "monthly",
            SMAP_MONTHLY_CONCEPT_ID,
            "data_monthly",
            collection_csv_name("monthly", latitude, longitude),
        ),
    ]
}

/// Settings for the granule acquisition run, resolved once at startup
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_date_range"))]
pub struct AcquisitionConfig {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 360.0))]
    pub longitude: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(length(min = 1))]
    pub catalog_url: String,
    #[validate(range(min = 1))]
    pub page_size: u32,
    pub catalog_timeout: Duration,
    pub download_timeout: Duration,
    #[validate(nested)]
    pub collections: Vec<CollectionConfig>,
}

fn validate_date_range(config: &AcquisitionConfig) -> std::result::Result<(), ValidationError> {
    match (config.start_date, config.end_date) {
        (Some(start), Some(end)) if start > end => Err(ValidationError::new("start_after_end")),
        _ => Ok(()),
    }
}

/// Keys as they appear in the environment (lowercased) or the settings file
#[derive(Debug, Deserialize)]
struct RawSettings {
    edl_token: Option<String>,
    smap_lat: f64,
    smap_lon: f64,
    start_date: Option<String>,
    end_date: Option<String>,
    catalog_url: String,
    page_size: u32,
    catalog_timeout_secs: u64,
    download_timeout_secs: u64,
    #[serde(default)]
    collections: Vec<CollectionConfig>,
}

impl AcquisitionConfig {
    /// Defaults, then the optional settings file, then the process environment
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        Self::from_sources(config_file, Environment::default().try_parsing(true))
    }

    pub fn from_sources(config_file: Option<&Path>, environment: Environment) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("smap_lat", DEFAULT_LATITUDE)?
            .set_default("smap_lon", DEFAULT_LONGITUDE)?
            .set_default("catalog_url", CMR_SEARCH_URL)?
            .set_default("page_size", i64::from(DEFAULT_PAGE_SIZE))?
            .set_default("catalog_timeout_secs", CATALOG_TIMEOUT_SECS as i64)?
            .set_default("download_timeout_secs", DOWNLOAD_TIMEOUT_SECS as i64)?;

        if let Some(path) = config_file {
            debug!(path = %path.display(), "reading settings file");
            builder = builder.add_source(File::from(path).required(true));
        }

        let raw: RawSettings = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        let config = Self::from_raw(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn from_raw(raw: RawSettings) -> Result<Self> {
        let token = raw
            .edl_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ProcessingError::Config(
                    "EDL_TOKEN not set. Run: export EDL_TOKEN=\"<your token>\"".to_string(),
                )
            })?;

        let collections = if raw.collections.is_empty() {
            default_collections(raw.smap_lat, raw.smap_lon)
        } else {
            raw.collections
        };

        Ok(Self {
            token,
            latitude: raw.smap_lat,
            longitude: raw.smap_lon,
            start_date: parse_optional_date("START_DATE", raw.start_date)?,
            end_date: parse_optional_date("END_DATE", raw.end_date)?,
            catalog_url: raw.catalog_url,
            page_size: raw.page_size,
            catalog_timeout: Duration::from_secs(raw.catalog_timeout_secs),
            download_timeout: Duration::from_secs(raw.download_timeout_secs),
            collections,
        })
    }

    pub fn target(&self) -> PointTarget {
        PointTarget::new(self.latitude, self.longitude)
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionConfig> {
        self.collections.iter().find(|c| c.name == name)
    }
}

fn parse_optional_date(key: &str, value: Option<String>) -> Result<Option<NaiveDate>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ProcessingError::Config(format!("{} must be YYYY-MM-DD, got '{}'", key, raw))),
    }
}
