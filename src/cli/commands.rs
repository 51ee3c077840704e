use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Local;
use tracing::info;

use crate::acquisition::{CollectionRunner, GridDownloader, HttpClient};
use crate::cli::args::{Cli, Commands};
use crate::config::{AcquisitionConfig, Preset, UnifyPlan};
use crate::processors::SeriesMerger;
use crate::utils::init_logging;
use crate::writers::UnifiedTableWriter;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref()).context("Failed to initialise logging")?;

    match cli.command {
        Commands::Fetch {
            config,
            collections,
        } => fetch(config, &collections, cli.quiet).await,
        Commands::DownloadGrid {
            output_dir,
            start_year,
            end_year,
            url_prefix,
            timeout_secs,
        } => {
            download_grid(
                output_dir,
                start_year,
                end_year,
                &url_prefix,
                Duration::from_secs(timeout_secs),
                cli.quiet,
            )
            .await
        }
        Commands::Unify {
            plan,
            preset,
            root_dir,
            output,
        } => unify(plan, preset, root_dir, output),
    }
}

async fn fetch(config_file: Option<PathBuf>, collections: &[String], quiet: bool) -> Result<()> {
    let config = AcquisitionConfig::load(config_file.as_deref())?;
    let http = HttpClient::authenticated(&config.token)?;

    info!("Point: lat={}, lon={}", config.latitude, config.longitude);
    if config.start_date.is_some() || config.end_date.is_some() {
        info!(
            "Date filter: {} → {}",
            config
                .start_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "…".to_string()),
            config
                .end_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "…".to_string())
        );
    }

    let summaries = CollectionRunner::new(&http, &config)
        .with_quiet(quiet)
        .run(collections)
        .await?;

    let appended: usize = summaries.iter().map(|s| s.rows_appended).sum();
    info!(
        "Finished {} collection(s), {} rows appended, at {}",
        summaries.len(),
        appended,
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    Ok(())
}

async fn download_grid(
    output_dir: PathBuf,
    start_year: i32,
    end_year: i32,
    url_prefix: &str,
    timeout: Duration,
    quiet: bool,
) -> Result<()> {
    let downloader = GridDownloader::new()
        .with_url_prefix(url_prefix)
        .with_output_dir(&output_dir)
        .with_years(start_year, end_year)?;
    let http = HttpClient::anonymous()?;

    info!(
        "Downloading IAP salinity grids {}-{} into {}",
        start_year,
        end_year,
        output_dir.display()
    );
    let summary = downloader.run(&http, timeout, quiet).await?;

    if !summary.is_complete() {
        bail!(
            "{} grid file(s) failed to download, first: {}",
            summary.failed.len(),
            summary.failed.first().map(String::as_str).unwrap_or_default()
        );
    }
    Ok(())
}

fn unify(
    plan_file: Option<PathBuf>,
    preset: Option<Preset>,
    root_dir: PathBuf,
    output: Option<PathBuf>,
) -> Result<()> {
    let plan = match (plan_file, preset) {
        (Some(path), _) => UnifyPlan::load(&path)
            .with_context(|| format!("Failed to load plan {}", path.display()))?,
        (None, Some(preset)) => UnifyPlan::preset(preset, &root_dir),
        (None, None) => bail!("Either --plan or --preset is required"),
    }
    .with_output(output);

    plan.check_sources()?;
    info!("Unifying {} sources", plan.sources.len());

    let table = SeriesMerger::new().unify(&plan.sources)?;
    UnifiedTableWriter::new()
        .write_table(&table, &plan.output)
        .with_context(|| format!("Failed to write {}", plan.output.display()))?;

    info!(
        "Wrote {} months × {} columns to {}",
        table.row_count(),
        table.columns().len(),
        plan.output.display()
    );
    Ok(())
}
