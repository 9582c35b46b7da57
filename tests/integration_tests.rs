use rainfall_trends::config::{PipelineConfig, RegionSource};
use rainfall_trends::date_code::OrdinalDateCode;
use rainfall_trends::error::PipelineError;
use rainfall_trends::output::read_table;
use rainfall_trends::pipeline::{self, Stage, TOTALS_WORKBOOK_FILE, TREND_JSON_FILE, table_path};
use rainfall_trends::types::{AnnualTotalRow, MonthlyTotalRow, TrendLabel, TrendResult};
use std::env;
use std::fs;
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};

const YEARS: std::ops::RangeInclusive<i32> = 2005..=2010;

fn test_dir(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("rainfall_trends_it_{name}"));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn days_in_year(year: i32) -> u32 {
    if chrono::NaiveDate::from_yo_opt(year, 366).is_some() {
        366
    } else {
        365
    }
}

/// Writes one daily row per day of every year in `years`; `cell` yields the
/// raw precipitation text for a (year, day of year).
fn write_source(
    dir: &Path,
    region: &str,
    years: impl Iterator<Item = i32>,
    cell: impl Fn(i32, u32) -> String,
) -> RegionSource {
    let path = dir.join(format!("{}.csv", region.to_lowercase()));
    let mut content = String::from("Date,PCP,TMAX\n");
    for year in years {
        for day in 1..=days_in_year(year) {
            let code = OrdinalDateCode(year as i64 * 1000 + day as i64);
            content.push_str(&format!("{},{},31.5\n", code, cell(year, day)));
        }
    }
    fs::write(&path, content).unwrap();
    RegionSource {
        name: region.to_string(),
        source: path,
        sheet: None,
    }
}

/// Kwara wets up, Benue dries out, Niger stays flat with one unreadable cell.
fn three_region_config(dir: &Path) -> PipelineConfig {
    let kwara = write_source(dir, "Kwara", YEARS, |y, _| {
        format!("{:.1}", 1.0 + 0.1 * (y - 2005) as f64)
    });
    let benue = write_source(dir, "Benue", YEARS, |y, _| {
        format!("{:.1}", 3.0 - 0.2 * (y - 2005) as f64)
    });
    let niger = write_source(dir, "Niger", YEARS, |y, d| {
        if y == 2006 && d == 100 {
            "n/a".to_string()
        } else {
            "2".to_string()
        }
    });

    PipelineConfig {
        output_dir: dir.join("outputs"),
        regions: vec![kwara, benue, niger],
        ..Default::default()
    }
}

fn trend_for<'a>(results: &'a [TrendResult], region: &str) -> &'a TrendResult {
    results.iter().find(|r| r.region == region).unwrap()
}

#[test]
fn test_full_pipeline() {
    let dir = test_dir("full");
    let config = three_region_config(&dir);

    pipeline::run_all(&config).expect("pipeline should succeed");

    let monthly: Vec<MonthlyTotalRow> =
        read_table(&table_path::<MonthlyTotalRow>(&config), "unused").unwrap();
    let annual: Vec<AnnualTotalRow> =
        read_table(&table_path::<AnnualTotalRow>(&config), "unused").unwrap();
    let trends: Vec<TrendResult> =
        read_table(&table_path::<TrendResult>(&config), "unused").unwrap();

    assert_eq!(monthly.len(), 3 * 6 * 12);
    assert_eq!(annual.len(), 3 * 6);
    assert_eq!(trends.len(), 3);

    // every annual total is the sum of its months
    for year in &annual {
        let from_months: f64 = monthly
            .iter()
            .filter(|m| m.region == year.region && m.year == year.year)
            .map(|m| m.monthly_total)
            .sum();
        assert!((year.annual_total - from_months).abs() < 1e-9);
    }

    // rows are ordered by region, then year
    let keys: Vec<_> = annual.iter().map(|a| (a.region.clone(), a.year)).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    let kwara = trend_for(&trends, "Kwara");
    assert_eq!(kwara.trend_label, TrendLabel::Increasing);
    assert!(kwara.is_significant);
    assert_eq!(kwara.s_statistic, 15);
    assert!(kwara.sen_slope > 0.0);
    assert_eq!((kwara.start_year, kwara.end_year, kwara.n_years), (2005, 2010, 6));

    let benue = trend_for(&trends, "Benue");
    assert_eq!(benue.trend_label, TrendLabel::Decreasing);
    assert_eq!(benue.s_statistic, -15);
    assert!(benue.sen_slope < 0.0);

    let niger = trend_for(&trends, "Niger");
    assert_eq!(niger.trend_label, TrendLabel::NoTrend);
    assert!(!niger.is_significant);
    assert_eq!(niger.s_statistic, 3);

    // the unreadable cell is missing, not zero-filled or dropped
    let niger_2006 = annual
        .iter()
        .find(|a| a.region == "Niger" && a.year == 2006)
        .unwrap();
    assert_eq!(niger_2006.annual_total, 728.0);
    assert_eq!(niger_2006.missing_days, 1);
    assert_eq!(niger_2006.observed_days, 364);

    let trend_csv = fs::read_to_string(table_path::<TrendResult>(&config)).unwrap();
    assert_eq!(
        trend_csv.lines().next().unwrap(),
        "region,start_year,end_year,n_years,trend_label,is_significant,p_value,\
         z_statistic,kendall_tau,s_statistic,sen_slope,sen_intercept"
    );
    assert!(trend_csv.contains("Kwara,2005,2010,6,increasing,1,"));
    assert!(config.tables_dir().join(TREND_JSON_FILE).exists());
    assert!(config.tables_dir().join(TOTALS_WORKBOOK_FILE).exists());

    for region in ["kwara", "benue", "niger"] {
        let plot = config
            .plots_dir()
            .join(format!("{region}_annual_rainfall.svg"));
        assert!(plot.exists(), "missing plot {}", plot.display());
    }

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_clean_and_aggregate_are_idempotent() {
    let dir = test_dir("idempotent");
    let config = three_region_config(&dir);

    let read_outputs = |config: &PipelineConfig| -> Vec<Vec<u8>> {
        [
            config.tables_dir().join("clean_daily_data.csv"),
            table_path::<MonthlyTotalRow>(config),
            table_path::<AnnualTotalRow>(config),
        ]
        .iter()
        .map(|p| fs::read(p).unwrap())
        .collect()
    };

    pipeline::clean(&config).unwrap();
    pipeline::aggregate(&config).unwrap();
    let first = read_outputs(&config);

    pipeline::clean(&config).unwrap();
    pipeline::aggregate(&config).unwrap();
    let second = read_outputs(&config);

    assert_eq!(first, second);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_clean_reports_coercions() {
    let dir = test_dir("coercions");
    let config = three_region_config(&dir);

    let report = pipeline::clean(&config).unwrap();
    let expected_rows: usize = YEARS.map(|y| days_in_year(y) as usize).sum::<usize>() * 3;
    assert_eq!(report.rows, expected_rows);
    assert_eq!(report.coerced, 1);

    let content = fs::read_to_string(&report.path).unwrap();
    assert_eq!(content.lines().next().unwrap(), "region,date,precipitation");
    assert!(content.contains("Niger,2006-04-10,\n"));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_run_all_halts_at_missing_source() {
    let dir = test_dir("missing_source");
    let mut config = three_region_config(&dir);
    config.regions.push(RegionSource {
        name: "Oyo".to_string(),
        source: dir.join("oyo.csv"),
        sheet: None,
    });

    let failure = pipeline::run_all(&config).unwrap_err();
    assert_eq!(failure.stage, Stage::Clean);
    assert!(matches!(failure.error, PipelineError::MissingInput { .. }));
    assert!(failure.to_string().starts_with("stage `clean` failed"));

    // nothing downstream of the failed stage was produced
    assert!(!config.tables_dir().join("clean_daily_data.csv").exists());
    assert!(!table_path::<AnnualTotalRow>(&config).exists());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_clean_fails_on_missing_column() {
    let dir = test_dir("schema");
    let path = dir.join("kwara.csv");
    fs::write(&path, "Date,Rainfall\n2005001,1.0\n").unwrap();
    let config = PipelineConfig {
        output_dir: dir.join("outputs"),
        regions: vec![RegionSource {
            name: "Kwara".to_string(),
            source: path,
            sheet: None,
        }],
        ..Default::default()
    };

    let err = pipeline::clean(&config).unwrap_err();
    match err {
        PipelineError::Schema { column, .. } => assert_eq!(column, "PCP"),
        other => panic!("unexpected error: {other}"),
    }

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_trend_test_requires_aggregate_output() {
    let dir = test_dir("no_annual");
    let config = PipelineConfig {
        output_dir: dir.join("outputs"),
        ..Default::default()
    };

    let err = pipeline::trend_test(&config).unwrap_err();
    assert!(matches!(err, PipelineError::MissingInput { .. }));
    assert!(err.to_string().contains("run `aggregate` first"));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_single_year_region_stops_at_trend_test() {
    let dir = test_dir("single_year");
    let kwara = write_source(&dir, "Kwara", 2005..=2007, |_, _| "1".to_string());
    let benue = write_source(&dir, "Benue", 2005..=2005, |_, _| "1".to_string());
    let config = PipelineConfig {
        output_dir: dir.join("outputs"),
        regions: vec![kwara, benue],
        ..Default::default()
    };

    let failure = pipeline::run_all(&config).unwrap_err();
    assert_eq!(failure.stage, Stage::TrendTest);
    match failure.error {
        PipelineError::InsufficientData { region, found } => {
            assert_eq!(region, "Benue");
            assert_eq!(found, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!table_path::<TrendResult>(&config).exists());
    assert!(!config.plots_dir().join("kwara_annual_rainfall.svg").exists());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_inspect_skips_missing_sources() {
    let dir = test_dir("inspect");
    let mut config = three_region_config(&dir);
    config.regions.push(RegionSource {
        name: "Oyo".to_string(),
        source: dir.join("oyo.csv"),
        sheet: None,
    });

    let inspections = pipeline::inspect(&config, 3).unwrap();
    assert_eq!(inspections.len(), 3);
    let niger = inspections.iter().find(|i| i.region == "Niger").unwrap();
    assert_eq!(niger.head.len(), 3);
    assert_eq!(niger.missing_by_column[0], ("PCP".to_string(), 1));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_pipeline_reads_one_workbook_sheet_per_region() {
    let dir = test_dir("workbook");
    let path = dir.join("weather_data_3_states.xlsx");

    let mut workbook = Workbook::new();
    for (region, base, step) in [("Kwara", 1.0, 0.1), ("Benue", 3.0, -0.2)] {
        let sheet = workbook.add_worksheet();
        sheet.set_name(region).unwrap();
        sheet.write_string(0, 0, "Date").unwrap();
        sheet.write_string(0, 1, "PCP").unwrap();
        let mut row = 1u32;
        for year in YEARS {
            for day in 1..=days_in_year(year) {
                sheet
                    .write_number(row, 0, (year as i64 * 1000 + day as i64) as f64)
                    .unwrap();
                if !(year == 2006 && day == 100) {
                    sheet
                        .write_number(row, 1, base + step * (year - 2005) as f64)
                        .unwrap();
                }
                row += 1;
            }
        }
    }
    workbook.save(&path).unwrap();

    let config = PipelineConfig {
        output_dir: dir.join("outputs"),
        regions: ["Kwara", "Benue"]
            .into_iter()
            .map(|name| RegionSource {
                name: name.to_string(),
                source: path.clone(),
                sheet: None,
            })
            .collect(),
        ..Default::default()
    };

    let inspections = pipeline::inspect(&config, 2).unwrap();
    assert_eq!(inspections[0].sheets, vec!["Kwara", "Benue"]);

    pipeline::run_all(&config).expect("pipeline should succeed");

    let annual: Vec<AnnualTotalRow> =
        read_table(&table_path::<AnnualTotalRow>(&config), "unused").unwrap();
    assert_eq!(annual.len(), 2 * 6);
    let kwara_2006 = annual
        .iter()
        .find(|a| a.region == "Kwara" && a.year == 2006)
        .unwrap();
    assert_eq!(kwara_2006.missing_days, 1);
    assert_eq!(kwara_2006.observed_days, 364);

    let trends: Vec<TrendResult> =
        read_table(&table_path::<TrendResult>(&config), "unused").unwrap();
    assert_eq!(trend_for(&trends, "Kwara").trend_label, TrendLabel::Increasing);
    assert_eq!(trend_for(&trends, "Benue").trend_label, TrendLabel::Decreasing);

    fs::remove_dir_all(&dir).unwrap();
}
