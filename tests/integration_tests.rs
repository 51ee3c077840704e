use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use ocean_series::acquisition::{select_granules, CollectionOutput};
use ocean_series::config::{Preset, UnifyPlan};
use ocean_series::models::{ColumnRef, GranuleRef, MonthlySeries, RawObservation, SourceSpec, YearMonth};
use ocean_series::processors::{MonthlyNormalizer, PointExtractor, PointTarget, SeriesMerger};
use ocean_series::readers::{DateFormat, MemoryDataset};
use ocean_series::writers::UnifiedTableWriter;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn month(y: i32, m: u32) -> YearMonth {
    YearMonth::new(y, m).unwrap()
}

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_unify_heterogeneous_sources() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let dir = temp_dir.path();

    let sst = write(dir, "sst_data.year.csv", "27.0,2020-01-10,x,y\n28.0,2020-01-20,x,y\n29.5,2020-03-01,x,y\n");
    let coral = write(
        dir,
        "Coral_d18O_data.csv",
        "Date_MSUD,d18O_MSUD,Date_SMII,d18O_SMII\n\
         15/01/2020,-4.0,01/02/2020,-3.5\n\
         20/01/2020,-4.5,not a date,-9.9\n",
    );
    let aux = write(dir, "AuxiliarySalinityData.csv", "Time,Salinity\n2020-02,39.75\n");

    let sources = vec![
        SourceSpec::new("sst", &sst, 1usize, 0usize).headerless(),
        SourceSpec::new("d18O_MSUD", &coral, "Date_MSUD", "d18O_MSUD")
            .with_date_format(DateFormat::DayFirst),
        SourceSpec::new("d18O_SMII", &coral, "Date_SMII", "d18O_SMII")
            .with_date_format(DateFormat::DayFirst),
        SourceSpec::new("aux_salinity", &aux, "Time", "Salinity").with_date_format(DateFormat::YearMonth),
    ];

    let table = SeriesMerger::new().unify(&sources).unwrap();
    let output = dir.join("out").join("unified.csv");
    UnifiedTableWriter::new().write_table(&table, &output).unwrap();

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "month,sst,d18O_MSUD,d18O_SMII,aux_salinity\n\
         2020-01,27.5,-4.25,,\n\
         2020-02,,,-3.5,39.75\n\
         2020-03,29.5,,,\n"
    );
}

#[test]
fn test_plan_file_drives_unification() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    let a = write(dir, "a.csv", "date,value\n2021-06-01,1.0\n2021-06-30,3.0\n");
    let b = write(dir, "b.csv", "time,v\n07/04/2021,8.0\n");
    let plan_path = write(
        dir,
        "plan.toml",
        &format!(
            "output = \"{}\"\n\n\
             [[sources]]\nname = \"a\"\npath = \"{}\"\ndate_column = \"date\"\nvalue_column = \"value\"\n\n\
             [[sources]]\nname = \"b\"\npath = \"{}\"\ndate_column = 0\nvalue_column = 1\ndate_format = \"month_day_year\"\n",
            dir.join("unified.csv").display(),
            a.display(),
            b.display()
        ),
    );

    let plan = UnifyPlan::load(&plan_path).unwrap();
    assert_eq!(plan.sources[1].date_column, ColumnRef::Index(0));

    plan.check_sources().unwrap();
    let table = SeriesMerger::new().unify(&plan.sources).unwrap();

    assert_eq!(table.value(&month(2021, 6), "a"), Some(2.0));
    assert_eq!(table.value(&month(2021, 7), "b"), Some(8.0));
    assert_eq!(table.row_count(), 2);
}

#[test]
fn test_preset_paths_resolve_under_root() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    write(
        dir,
        "d18O_correlation/2014_2024_coral_d18O_anomalies.csv",
        "Date_MSUD,d18O_MSUD_anomaly,Date_SMII,d18O_SMII_anomaly\n05/01/2015,0.1,05/01/2015,0.2\n",
    );
    write(
        dir,
        "d18O_correlation/2014-2024_sss_anomalies.csv",
        "datetime,SSS_anomaly\n2015-01-15,-0.3\n2015-02-15,0.4\n",
    );

    let plan = UnifyPlan::preset(Preset::Anomalies, dir);
    plan.check_sources().unwrap();
    let table = SeriesMerger::new().unify(&plan.sources).unwrap();
    UnifiedTableWriter::new().write_table(&table, &plan.output).unwrap();

    assert_eq!(
        fs::read_to_string(dir.join("d18O_correlation/unified_anomaly_datasets.csv")).unwrap(),
        "month,d18O_MSUD_anomaly,d18O_SMII_anomaly,sss_anomaly\n\
         2015-01,0.1,0.2,-0.3\n\
         2015-02,,,0.4\n"
    );
}

#[test]
fn test_disjoint_series_row_count() {
    let a = MonthlySeries::from_pairs("a", [(month(2020, 1), 1.0), (month(2020, 2), 2.0)]);
    let b = MonthlySeries::from_pairs("b", [(month(2021, 1), 3.0)]);

    let table = SeriesMerger::new().merge(&[a.clone(), b.clone()]);

    assert_eq!(table.row_count(), a.len() + b.len());
    for m in a.months() {
        assert_eq!(table.value(m, "b"), None);
    }
    for m in b.months() {
        assert_eq!(table.value(m, "a"), None);
    }
}

#[test]
fn test_three_way_join_with_empty_series() {
    let a = MonthlySeries::from_pairs("A", [(month(2020, 1), 1.0), (month(2020, 2), 2.0)]);
    let b = MonthlySeries::from_pairs("B", [(month(2020, 2), 5.0)]);
    let c = MonthlySeries::new("C");

    let table = SeriesMerger::new().merge(&[a, b, c]);

    let rows: Vec<_> = table
        .rows()
        .map(|(m, values)| (m.to_string(), values.to_vec()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("2020-01".to_string(), vec![Some(1.0), None, None]),
            ("2020-02".to_string(), vec![Some(2.0), Some(5.0), None]),
        ]
    );
}

#[test]
fn test_mean_of_two_days() {
    let at = |d| NaiveDate::from_ymd_opt(2020, 1, d).and_then(|d| d.and_hms_opt(0, 0, 0));
    let series = MonthlyNormalizer::new().normalize(
        "x",
        &[
            RawObservation::new(at(5), Some(10.0)),
            RawObservation::new(at(20), Some(20.0)),
            RawObservation::new(None, Some(99.0)),
        ],
    );
    assert_eq!(series.get(&month(2020, 1)), Some(15.0));
    assert_eq!(series.len(), 1);
}

#[test]
fn test_normalizer_idempotent_on_monthly_csv() {
    let temp_dir = TempDir::new().unwrap();
    let path = write(temp_dir.path(), "m.csv", "Time,Salinity\n2019-11,39.1\n2019-12,39.3\n");
    let spec = SourceSpec::new("s", &path, "Time", "Salinity").with_date_format(DateFormat::YearMonth);

    let normalizer = MonthlyNormalizer::new();
    let once = normalizer.load(&spec).unwrap();
    let twice = normalizer.normalize("s", &once.observations());

    assert_eq!(once, twice);
}

#[test]
fn test_granule_already_in_csv_is_skipped_and_new_one_appended() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    let csv = write(
        dir,
        "SMAP_RSS_L3_SSS_8DAY_V6_37.625E_20.875N.csv",
        "time,lat,lon,sss_smap\n2021-03-15,20.875,37.625,39.2\n",
    );

    let granules = select_granules(
        vec![
            "https://archive/RSS_smap_SSS_L3_8day_running_20210315_FNL_v06.0.nc".to_string(),
            "https://archive/RSS_smap_SSS_L3_8day_running_20210323_FNL_v06.0.nc".to_string(),
        ],
        None,
        None,
    );
    let mut output = CollectionOutput::open(&csv).unwrap();

    let pending: Vec<&GranuleRef> = granules
        .iter()
        .filter(|g| !output.already_processed(g))
        .collect();
    assert_eq!(pending.len(), 1);

    // Stand-in for the downloaded granule
    let local = write(dir, pending[0].file_name().unwrap(), "CDF");
    let grid = MemoryDataset::new()
        .with_axis("lat", vec![20.625, 20.875, 21.125])
        .with_axis("lon", vec![37.375, 37.625, 37.875])
        .with_variable("sss_smap", &[("lat", 3), ("lon", 3)], vec![0.0, 0.0, 0.0, 0.0, 39.4, 0.0, 0.0, 0.0, 0.0]);

    let extraction = PointExtractor::new()
        .extract_file(&local, PointTarget::new(20.875, 37.625), |_| Ok(grid))
        .unwrap();
    output.record(pending[0], &extraction).unwrap();

    assert!(!local.exists());
    assert!(output.already_processed(pending[0]));
    assert_eq!(
        fs::read_to_string(&csv).unwrap(),
        "time,lat,lon,sss_smap\n\
         2021-03-15,20.875,37.625,39.2\n\
         2021-03-23,20.875,37.625,39.4\n"
    );
}
