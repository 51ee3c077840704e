/// Earthdata CMR search endpoint
pub const CMR_SEARCH_URL: &str = "https://cmr.earthdata.nasa.gov/search";

/// Catalog paging
pub const DEFAULT_PAGE_SIZE: u32 = 2000;
pub const FIRST_PAGE: u32 = 1;

/// Request ceilings in seconds
pub const CATALOG_TIMEOUT_SECS: u64 = 60;
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 180;
pub const MAX_REDIRECTS: usize = 5;

pub const USER_AGENT: &str = "smap-cmr-fetch/1.0";

/// Default extraction point (Red Sea, off the Sudanese coast)
pub const DEFAULT_LATITUDE: f64 = 20.875;
pub const DEFAULT_LONGITUDE: f64 = 37.625;

/// SMAP RSS L3 SSS V6 collections
pub const SMAP_8DAY_CONCEPT_ID: &str = "C2832227567-POCLOUD";
pub const SMAP_MONTHLY_CONCEPT_ID: &str = "C2832226365-POCLOUD";

/// Granule link filters
pub const SECURE_SCHEME: &str = "https://";
pub const GRANULE_SUFFIX: &str = ".nc";

/// Substring identifying the salinity variable
pub const SALINITY_PATTERN: &str = "sss";

/// Coordinate aliases, matched case-insensitively
pub const LATITUDE_ALIASES: &[&str] = &["lat", "latitude"];
pub const LONGITUDE_ALIASES: &[&str] = &["lon", "longitude"];
pub const TIME_NAME: &str = "time";

/// IAP gridded salinity archive
pub const IAP_URL_PREFIX: &str = "http://www.ocean.iap.ac.cn/ftp/cheng/CZ16_v0_IAP_Salinity_0p5_gridded_1month_netcdf/IAP_05_2000m_salinity_";
pub const IAP_FIRST_YEAR: i32 = 1960;
pub const IAP_LAST_YEAR: i32 = 2023;
pub const IAP_OUTPUT_DIR: &str = "salinity_data";

/// Unification defaults
pub const DEFAULT_DATA_DIR: &str = "d18O_correlation";
pub const MONTH_COLUMN: &str = "month";

/// I/O
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB
pub const PARTIAL_SUFFIX: &str = "part";
