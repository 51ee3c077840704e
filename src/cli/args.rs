use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Preset;
use crate::utils::constants::{
    DOWNLOAD_TIMEOUT_SECS, IAP_FIRST_YEAR, IAP_LAST_YEAR, IAP_OUTPUT_DIR, IAP_URL_PREFIX,
};

#[derive(Parser)]
#[command(name = "ocean-series")]
#[command(about = "Ocean salinity acquisition and monthly series unification")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Hide progress bars")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search the catalog, download SMAP granules and extract the point series
    Fetch {
        #[arg(short, long, help = "TOML settings file (environment overrides it)")]
        config: Option<PathBuf>,

        #[arg(
            long = "collection",
            help = "Collection to process, repeatable [default: all configured]"
        )]
        collections: Vec<String>,
    },

    /// Download every monthly IAP gridded salinity file for a year range
    DownloadGrid {
        #[arg(short, long, default_value = IAP_OUTPUT_DIR)]
        output_dir: PathBuf,

        #[arg(long, default_value_t = IAP_FIRST_YEAR)]
        start_year: i32,

        #[arg(long, default_value_t = IAP_LAST_YEAR)]
        end_year: i32,

        #[arg(long, default_value = IAP_URL_PREFIX)]
        url_prefix: String,

        #[arg(long, default_value_t = DOWNLOAD_TIMEOUT_SECS, help = "Per-file timeout in seconds")]
        timeout_secs: u64,
    },

    /// Resample CSV sources to monthly means and outer-join them on month
    Unify {
        #[arg(
            short,
            long,
            conflicts_with = "preset",
            required_unless_present = "preset",
            help = "TOML plan listing the sources"
        )]
        plan: Option<PathBuf>,

        #[arg(long, value_enum)]
        preset: Option<Preset>,

        #[arg(long, default_value = ".", help = "Directory preset paths are relative to")]
        root_dir: PathBuf,

        #[arg(short, long, help = "Output CSV path [default: from plan or preset]")]
        output: Option<PathBuf>,
    },
}
