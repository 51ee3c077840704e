use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::acquisition::catalog::CatalogClient;
use crate::acquisition::client::HttpClient;
use crate::acquisition::download::{download_with_skip, DownloadStatus};
use crate::config::{AcquisitionConfig, CollectionConfig};
use crate::error::{ProcessingError, Result};
use crate::models::GranuleRef;
use crate::processors::{Extraction, PointExtractor, ProcessedIndex};
use crate::readers::NetcdfGranule;
use crate::utils::ProgressReporter;
use crate::writers::ObservationWriter;

/// Counts for one collection run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSummary {
    pub name: String,
    pub candidates: usize,
    pub downloaded: usize,
    /// Already in the CSV, or already on disk
    pub skipped: usize,
    pub failed: usize,
    pub rows_appended: usize,
}

impl CollectionSummary {
    pub fn new(name: &str, candidates: usize) -> Self {
        Self {
            name: name.to_string(),
            candidates,
            ..Self::default()
        }
    }
}

/// Granules inside the date range, ordered by URL
///
/// Undated granules always pass the range filter.
pub fn select_granules(
    urls: Vec<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<GranuleRef> {
    let mut granules: Vec<GranuleRef> = urls
        .into_iter()
        .map(GranuleRef::from_url)
        .filter(|g| g.in_range(start, end))
        .collect();
    granules.sort_by(|a, b| a.url.cmp(&b.url));
    granules
}

/// A collection's output CSV and the dates already in it
///
/// The writer is opened on first use, so a run where every granule is
/// already processed never touches the file.
pub struct CollectionOutput {
    path: PathBuf,
    index: ProcessedIndex,
    writer: Option<ObservationWriter>,
}

impl CollectionOutput {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            index: ProcessedIndex::load(path)?,
            writer: None,
        })
    }

    pub fn already_processed(&self, granule: &GranuleRef) -> bool {
        self.index.covers(granule)
    }

    /// Confirm the CSV can be appended to
    pub fn ensure_writable(&mut self) -> Result<&mut ObservationWriter> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => ObservationWriter::open(&self.path)?,
        };
        Ok(self.writer.insert(writer))
    }

    /// Append an extraction and index its dates
    ///
    /// The granule's file-name date is indexed as well, so a granule whose
    /// decoded time falls on another day is still skipped for the rest of
    /// this run. Later runs only see the time column of the CSV.
    pub fn record(&mut self, granule: &GranuleRef, extraction: &Extraction) -> Result<usize> {
        let rows = self
            .ensure_writable()?
            .append(&extraction.variable, &extraction.observations)?;
        self.index.record(&extraction.observations);
        if let Some(date) = granule.date {
            self.index.insert(date);
        }
        Ok(rows)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Drives discovery, download and extraction for configured collections
pub struct CollectionRunner<'a> {
    http: &'a HttpClient,
    config: &'a AcquisitionConfig,
    extractor: PointExtractor,
    quiet: bool,
}

impl<'a> CollectionRunner<'a> {
    pub fn new(http: &'a HttpClient, config: &'a AcquisitionConfig) -> Self {
        Self {
            http,
            config,
            extractor: PointExtractor::new(),
            quiet: false,
        }
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Collections named in `names`, or all of them when empty
    pub fn select<'c>(&'c self, names: &[String]) -> Result<Vec<&'c CollectionConfig>> {
        if names.is_empty() {
            return Ok(self.config.collections.iter().collect());
        }
        names
            .iter()
            .map(|name| {
                self.config.collection(name).ok_or_else(|| {
                    ProcessingError::Config(format!(
                        "Unknown collection '{}'. Configured: {}",
                        name,
                        self.config
                            .collections
                            .iter()
                            .map(|c| c.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ))
                })
            })
            .collect()
    }

    /// Run each selected collection in turn
    ///
    /// A catalog failure ends only that collection. An output CSV that
    /// cannot be written ends the run after the remaining collections.
    pub async fn run(&self, names: &[String]) -> Result<Vec<CollectionSummary>> {
        let collections = self.select(names)?;
        let mut summaries = Vec::with_capacity(collections.len());
        let mut fatal = None;

        for collection in collections {
            match self.process_collection(collection).await {
                Ok(summary) => summaries.push(summary),
                Err(e @ ProcessingError::OutputUnavailable { .. }) => {
                    error!(
                        "{}: {}. Downloaded files are kept in {}",
                        collection.name,
                        e,
                        collection.out_dir.display()
                    );
                    fatal.get_or_insert(e);
                }
                Err(e) => error!("{}: collection aborted: {}", collection.name, e),
            }
        }

        match fatal {
            Some(e) => Err(e),
            None => Ok(summaries),
        }
    }

    pub async fn process_collection(&self, collection: &CollectionConfig) -> Result<CollectionSummary> {
        info!("=== {} ===", collection.name.to_uppercase());

        let catalog = CatalogClient::new(
            self.http,
            &self.config.catalog_url,
            self.config.page_size,
            self.config.catalog_timeout,
        );
        let searching = ProgressReporter::new_spinner("Searching catalog...", self.quiet);
        let urls = catalog.granule_urls(&collection.concept_id).await?;
        searching.finish_with_message(&format!("{} granule links", urls.len()));
        let granules = select_granules(urls, self.config.start_date, self.config.end_date);
        info!("Found {} candidate granules.", granules.len());

        tokio::fs::create_dir_all(&collection.out_dir).await?;
        let mut output = CollectionOutput::open(&collection.csv)?;
        let mut summary = CollectionSummary::new(&collection.name, granules.len());
        let progress = ProgressReporter::new(granules.len() as u64, &collection.name, self.quiet);

        for granule in &granules {
            progress.increment(1);
            if output.already_processed(granule) {
                summary.skipped += 1;
                continue;
            }

            match self.process_granule(granule, collection, &mut output).await {
                Ok((status, rows)) => {
                    match status {
                        DownloadStatus::Downloaded => summary.downloaded += 1,
                        DownloadStatus::Skipped => summary.skipped += 1,
                    }
                    summary.rows_appended += rows;
                }
                Err(e @ ProcessingError::OutputUnavailable { .. }) => {
                    progress.finish_with_message("aborted");
                    return Err(e);
                }
                Err(e) => {
                    summary.failed += 1;
                    log_granule_failure(&granule.url, &e);
                }
            }
        }

        progress.finish_with_message("done");
        info!(
            "{}: {} downloaded, {} skipped, {} failed; appended {} rows → {}",
            collection.name,
            summary.downloaded,
            summary.skipped,
            summary.failed,
            summary.rows_appended,
            output.path().display()
        );
        Ok(summary)
    }

    async fn process_granule(
        &self,
        granule: &GranuleRef,
        collection: &CollectionConfig,
        output: &mut CollectionOutput,
    ) -> Result<(DownloadStatus, usize)> {
        let (path, status) = download_with_skip(
            self.http,
            &granule.url,
            &collection.out_dir,
            self.config.download_timeout,
        )
        .await?;

        // Checked before extraction, which deletes the download
        output.ensure_writable()?;

        let extraction = self
            .extractor
            .extract_file(&path, self.config.target(), NetcdfGranule::open)?;
        let rows = output.record(granule, &extraction)?;
        Ok((status, rows))
    }
}

fn log_granule_failure(url: &str, err: &ProcessingError) {
    match err.http_status() {
        Some(status) => error!("[HTTP {}] {}", status, url),
        None => match err {
            ProcessingError::VariableNotFound { .. } | ProcessingError::CoordinateNotFound { .. } => {
                warn!("[SKIP] {} :: {}", url, err)
            }
            _ => error!("[ERR] {} :: {}", url, err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Observation;
    use crate::processors::TimeSource;
    use std::fs;

    #[test]
    fn test_select_granules_filters_and_sorts() {
        let urls = vec![
            "https://h/b/sss_20200301.nc".to_string(),
            "https://h/a/sss_monthly.nc".to_string(),
            "https://h/b/sss_20200101.nc".to_string(),
            "https://h/b/sss_20191231.nc".to_string(),
            "https://h/a/sss_20200201.nc".to_string(),
        ];

        let granules = select_granules(urls, NaiveDate::from_ymd_opt(2020, 1, 1), None);

        let selected: Vec<_> = granules.iter().map(|g| g.url.as_str()).collect();
        assert_eq!(
            selected,
            vec![
                "https://h/a/sss_20200201.nc",
                "https://h/a/sss_monthly.nc",
                "https://h/b/sss_20200101.nc",
                "https://h/b/sss_20200301.nc",
            ]
        );
    }

    #[test]
    fn test_output_skips_indexed_dates() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("series.csv");
        fs::write(&csv, "time,lat,lon,sss_smap\n2021-03-15,20.875,37.625,39.2\n").unwrap();

        let output = CollectionOutput::open(&csv).unwrap();

        assert!(output.already_processed(&GranuleRef::from_url(
            "https://h/RSS_smap_SSS_L3_8day_running_20210315_FNL_v06.0.nc"
        )));
        assert!(!output.already_processed(&GranuleRef::from_url(
            "https://h/RSS_smap_SSS_L3_8day_running_20210323_FNL_v06.0.nc"
        )));
    }

    #[test]
    fn test_record_updates_index() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("series.csv");
        let mut output = CollectionOutput::open(&csv).unwrap();
        let granule = GranuleRef::from_url("https://h/x_20210323.nc");
        let time = NaiveDate::from_ymd_opt(2021, 3, 23)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        let rows = output
            .record(
                &granule,
                &Extraction {
                    variable: "sss_smap".into(),
                    observations: vec![Observation::new(time, 20.875, 37.625, Some(39.1))],
                    time_source: TimeSource::Dataset,
                },
            )
            .unwrap();

        assert_eq!(rows, 1);
        assert!(output.already_processed(&granule));
        assert_eq!(
            fs::read_to_string(&csv).unwrap(),
            "time,lat,lon,sss_smap\n2021-03-23,20.875,37.625,39.1\n"
        );
    }

    #[test]
    fn test_record_indexes_file_name_date() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("series.csv");
        let mut output = CollectionOutput::open(&csv).unwrap();
        // Window-centre time lands four days after the date in the name
        let granule = GranuleRef::from_url("https://h/RSS_smap_SSS_L3_8day_running_20210315_FNL_v06.0.nc");
        let centre = NaiveDate::from_ymd_opt(2021, 3, 19)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        output
            .record(
                &granule,
                &Extraction {
                    variable: "sss_smap".into(),
                    observations: vec![Observation::new(centre, 20.875, 37.625, Some(39.0))],
                    time_source: TimeSource::Dataset,
                },
            )
            .unwrap();

        assert!(output.already_processed(&granule));
        assert!(output.already_processed(&GranuleRef::from_url("https://h/y_20210319.nc")));
    }

    #[test]
    fn test_unwritable_output_is_fatal_kind() {
        let dir = tempfile::tempdir().unwrap();

        // A directory reads as an index with no dates, but cannot be appended to
        let mut output = CollectionOutput::open(dir.path()).unwrap();
        assert!(!output.already_processed(&GranuleRef::from_url("https://h/x_20210323.nc")));

        let err = output.ensure_writable().err().unwrap();
        assert!(matches!(err, ProcessingError::OutputUnavailable { .. }));
        assert_eq!(err.exit_code(), 3);
    }
}
