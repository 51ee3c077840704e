use std::path::{Path, PathBuf};

use clap::ValueEnum;
use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ProcessingError, Result};
use crate::models::SourceSpec;
use crate::readers::DateFormat;
use crate::utils::constants::DEFAULT_DATA_DIR;

/// Built-in source lists for the Red Sea coral study
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Coral d18O and SSS anomalies
    Anomalies,
    /// SST, coral d18O and every salinity product
    Full,
}

/// Which sources to unify and where the table goes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UnifyPlan {
    pub output: PathBuf,
    #[validate(length(min = 1))]
    pub sources: Vec<SourceSpec>,
}

impl UnifyPlan {
    pub fn new(output: impl Into<PathBuf>, sources: Vec<SourceSpec>) -> Self {
        Self {
            output: output.into(),
            sources,
        }
    }

    /// Read a TOML plan; relative paths stay relative to the working directory
    pub fn load(path: &Path) -> Result<Self> {
        let plan: UnifyPlan = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(true))
            .build()?
            .try_deserialize()?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let plan: UnifyPlan = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        plan.validate()?;
        Ok(plan)
    }

    /// A built-in plan with every path under `root`
    pub fn preset(preset: Preset, root: &Path) -> Self {
        let data = Path::new(DEFAULT_DATA_DIR);
        let (output, sources) = match preset {
            Preset::Anomalies => (data.join("unified_anomaly_datasets.csv"), anomaly_sources(data)),
            Preset::Full => (data.join("unified_datasets.csv"), full_sources(data)),
        };

        Self::new(
            root.join(output),
            sources.into_iter().map(|s| s.rebased(root)).collect(),
        )
    }

    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        if let Some(output) = output {
            self.output = output;
        }
        self
    }

    /// Fail early on a source file that is not there
    pub fn check_sources(&self) -> Result<()> {
        let missing: Vec<String> = self
            .sources
            .iter()
            .filter(|s| !s.path.is_file())
            .map(|s| format!("{} ({})", s.name, s.path.display()))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ProcessingError::MissingData(format!(
                "Source files not found: {}",
                missing.join(", ")
            )))
        }
    }
}

fn anomaly_sources(data: &Path) -> Vec<SourceSpec> {
    let coral = data.join("2014_2024_coral_d18O_anomalies.csv");
    vec![
        SourceSpec::new("d18O_MSUD_anomaly", &coral, "Date_MSUD", "d18O_MSUD_anomaly")
            .with_date_format(DateFormat::DayFirst),
        SourceSpec::new("d18O_SMII_anomaly", &coral, "Date_SMII", "d18O_SMII_anomaly")
            .with_date_format(DateFormat::DayFirst),
        SourceSpec::new(
            "sss_anomaly",
            data.join("2014-2024_sss_anomalies.csv"),
            "datetime",
            "SSS_anomaly",
        ),
    ]
}

fn full_sources(data: &Path) -> Vec<SourceSpec> {
    let coral = data.join("Coral_d18O_data.csv");
    vec![
        // sst, date, unused, unused
        SourceSpec::new("sst", data.join("sst_data.year.csv"), 1usize, 0usize).headerless(),
        SourceSpec::new("d18O", data.join("Coral_data.csv"), 0usize, 1usize)
            .headerless()
            .with_skip_rows(1)
            .with_date_format(DateFormat::DayMonthAbbrev),
        SourceSpec::new("d18O_MSUD", &coral, "Date_MSUD", "d18O_MSUD")
            .with_date_format(DateFormat::DayFirst),
        SourceSpec::new("d18O_SMII", &coral, "Date_SMII", "d18O_SMII")
            .with_date_format(DateFormat::DayFirst),
        // time, lat, lon, depth, salinity
        SourceSpec::new(
            "salinity",
            Path::new("csv").join("IAP_Salinity_Dataset_37.5_21.0.csv"),
            0usize,
            4usize,
        )
        .headerless()
        .with_date_format(DateFormat::Iso),
        SourceSpec::new("aux_salinity", data.join("AuxiliarySalinityData.csv"), "Time", "Salinity")
            .with_date_format(DateFormat::YearMonth),
        SourceSpec::new(
            "sup_salinity",
            data.join("SupplementarySalinityData.csv"),
            "time",
            "supplementary_salinity",
        )
        .with_date_format(DateFormat::MonthDayYear),
        SourceSpec::new(
            "comp_salinity",
            data.join("ComplementarySalinityData.csv"),
            "time",
            "comp_sss",
        ),
    ]
}
