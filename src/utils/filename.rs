use chrono::NaiveDate;

/// Last path segment of a URL, ignoring any query string or fragment
pub fn file_name_from_url(url: &str) -> Option<&str> {
    let without_query = url.split(|c: char| c == '?' || c == '#').next().unwrap_or(url);
    without_query
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
}

/// Date embedded in a name as the first run of eight digits (`YYYYMMDD`)
///
/// Returns `None` when no run exists or the first run is not a calendar date.
pub fn embedded_date(name: &str) -> Option<NaiveDate> {
    let bytes = name.as_bytes();
    let start = (0..bytes.len().saturating_sub(7))
        .find(|&i| bytes[i..i + 8].iter().all(u8::is_ascii_digit))?;
    NaiveDate::parse_from_str(&name[start..start + 8], "%Y%m%d").ok()
}

/// Output CSV name for a SMAP collection at a given point
pub fn collection_csv_name(product: &str, latitude: f64, longitude: f64) -> String {
    format!(
        "SMAP_RSS_L3_SSS_{}_V6_{:.3}E_{:.3}N.csv",
        product.to_uppercase(),
        longitude,
        latitude
    )
}

/// Local name of one IAP monthly grid file
pub fn grid_file_name(year: i32, month: u32) -> String {
    format!("IAP_Salinity_{}_{:02}.nc", year, month)
}
