use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{error, info};

use crate::acquisition::client::HttpClient;
use crate::acquisition::download::download_to;
use crate::error::{ProcessingError, Result};
use crate::utils::constants::{IAP_FIRST_YEAR, IAP_LAST_YEAR, IAP_OUTPUT_DIR, IAP_URL_PREFIX};
use crate::utils::filename::grid_file_name;
use crate::utils::ProgressReporter;

/// One monthly file to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRequest {
    pub year: i32,
    pub month: u32,
    pub url: String,
    pub path: PathBuf,
}

/// Outcome of a bulk grid run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridSummary {
    pub downloaded: usize,
    /// URLs that could not be fetched
    pub failed: Vec<String>,
}

impl GridSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fetches every month of the IAP gridded salinity product for a year range
pub struct GridDownloader {
    url_prefix: String,
    output_dir: PathBuf,
    first_year: i32,
    last_year: i32,
}

impl GridDownloader {
    pub fn new() -> Self {
        Self {
            url_prefix: IAP_URL_PREFIX.to_string(),
            output_dir: PathBuf::from(IAP_OUTPUT_DIR),
            first_year: IAP_FIRST_YEAR,
            last_year: IAP_LAST_YEAR,
        }
    }

    pub fn with_url_prefix(mut self, prefix: &str) -> Self {
        self.url_prefix = prefix.to_string();
        self
    }

    pub fn with_output_dir(mut self, dir: &Path) -> Self {
        self.output_dir = dir.to_path_buf();
        self
    }

    /// Inclusive year range
    pub fn with_years(mut self, first_year: i32, last_year: i32) -> Result<Self> {
        if first_year > last_year {
            return Err(ProcessingError::Config(format!(
                "Start year {} is after end year {}",
                first_year, last_year
            )));
        }
        self.first_year = first_year;
        self.last_year = last_year;
        Ok(self)
    }

    /// Year-major, month-minor
    pub fn requests(&self) -> Vec<GridRequest> {
        (self.first_year..=self.last_year)
            .flat_map(|year| (1..=12).map(move |month| (year, month)))
            .map(|(year, month)| GridRequest {
                year,
                month,
                url: format!("{}year_{}_month_{:02}.nc", self.url_prefix, year, month),
                path: self.output_dir.join(grid_file_name(year, month)),
            })
            .collect()
    }

    /// Fetch every request, continuing past failures
    pub async fn run(&self, http: &HttpClient, timeout: Duration, quiet: bool) -> Result<GridSummary> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let requests = self.requests();
        let progress = ProgressReporter::new(requests.len() as u64, "Downloading grids", quiet);
        let mut summary = GridSummary::default();

        for request in &requests {
            progress.set_message(&format!("{}-{:02}", request.year, request.month));
            match download_to(http, &request.url, &request.path, timeout).await {
                Ok(_) => {
                    summary.downloaded += 1;
                    progress.println(&format!("Downloaded: {}", request.path.display()));
                }
                Err(e) => {
                    error!("Failed to download {}: {}", request.url, e);
                    summary.failed.push(request.url.clone());
                }
            }
            progress.increment(1);
        }

        progress.finish_with_message("Grid download complete");
        info!(
            "Downloaded {} of {} grid files ({} failed)",
            summary.downloaded,
            requests.len(),
            summary.failed.len()
        );
        Ok(summary)
    }
}

impl Default for GridDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_cover_every_month() {
        let downloader = GridDownloader::new()
            .with_output_dir(Path::new("salinity_data"))
            .with_years(1960, 1961)
            .unwrap();
        let requests = downloader.requests();

        assert_eq!(requests.len(), 24);
        assert_eq!(
            requests[0].url,
            format!("{}year_1960_month_01.nc", IAP_URL_PREFIX)
        );
        assert_eq!(
            requests[23].path,
            Path::new("salinity_data").join("IAP_Salinity_1961_12.nc")
        );
    }

    #[test]
    fn test_default_range() {
        assert_eq!(GridDownloader::new().requests().len(), 64 * 12);
    }

    #[test]
    fn test_inverted_years_rejected() {
        assert!(GridDownloader::new().with_years(2000, 1999).is_err());
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_run() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = GridDownloader::new()
            .with_url_prefix("http://127.0.0.1:9/IAP_")
            .with_output_dir(dir.path())
            .with_years(2000, 2000)
            .unwrap();
        let http = HttpClient::anonymous().unwrap();

        let summary = downloader
            .run(&http, Duration::from_millis(200), true)
            .await
            .unwrap();

        assert_eq!(summary.downloaded, 0);
        assert_eq!(summary.failed.len(), 12);
        assert!(!summary.is_complete());
    }
}
