//! High-level pipeline API: ledger file in, report tables out.
//!
//! [`run_file`] chains every stage:
//! parse, clean, derive features, aggregate (KPI, pivots, RFM, cohorts),
//! then reconcile. [`export_report`] writes the result to disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use ledgerlens::{pipeline, ReportOptions};
//! use std::path::Path;
//!
//! let report = pipeline::run_file(Path::new("ledger.csv"), &ReportOptions::default())?;
//! pipeline::export_report(&report, Path::new("report.xlsx"), Some(Path::new("out")))?;
//! ```

use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;

use crate::analysis::{
    aggregate, build_cohorts, build_pivots, compute_rfm, default_reference_date, reconcile,
    CohortTable, KpiTables, PivotTables, ReconciledCheck, RfmProfile,
};
use crate::config::ReportOptions;
use crate::error::{ConfigError, ConfigResult, PipelineResult};
use crate::export::{report_sheets, write_csv_dir, write_workbook};
use crate::logs::{format_delimiter, log_drop_report, log_stage, log_success, log_warning};
use crate::models::{DerivedTransaction, DropReport, RawRecord};
use crate::parser::{parse_bytes_auto, parse_csv_file_auto, ParseResult};
use crate::transform::{clean, FeatureDeriver};

/// Where the rows came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Every table produced by one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub source: SourceInfo,
    pub options: ReportOptions,
    pub drops: DropReport,
    /// Reference date actually used for recency. `None` when no row survived
    /// cleaning and none was configured.
    pub reference_date: Option<NaiveDate>,
    pub transactions: Vec<DerivedTransaction>,
    pub kpis: KpiTables,
    pub pivots: PivotTables,
    pub rfm: Vec<RfmProfile>,
    pub cohorts: CohortTable,
    pub checks: Vec<ReconciledCheck>,
}

/// Run the whole pipeline on a ledger file.
pub fn run_file(path: &Path, options: &ReportOptions) -> PipelineResult<Report> {
    log_stage("Parser", format!("Reading {}", path.display()));
    let parsed = parse_csv_file_auto(path)?;
    run_parsed(parsed, options)
}

/// Run the whole pipeline on in-memory CSV bytes.
pub fn run_bytes(bytes: &[u8], options: &ReportOptions) -> PipelineResult<Report> {
    log_stage("Parser", format!("Reading {} bytes", bytes.len()));
    let parsed = parse_bytes_auto(bytes)?;
    run_parsed(parsed, options)
}

/// Run the analytics stages on already-parsed records.
pub fn run_records(records: Vec<RawRecord>, options: &ReportOptions) -> PipelineResult<Report> {
    let source = SourceInfo {
        encoding: "UTF-8".to_string(),
        delimiter: ',',
        headers: Vec::new(),
        row_count: records.len(),
    };
    analyze(&records, source, options)
}

fn run_parsed(parsed: ParseResult, options: &ReportOptions) -> PipelineResult<Report> {
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!(
        "Detected separator: '{}'",
        format_delimiter(parsed.delimiter)
    ));
    log_success(format!("Read {} rows", parsed.records.len()));

    let source = SourceInfo {
        encoding: parsed.encoding,
        delimiter: parsed.delimiter,
        headers: parsed.headers,
        row_count: parsed.records.len(),
    };
    analyze(&parsed.records, source, options)
}

fn analyze(
    records: &[RawRecord],
    source: SourceInfo,
    options: &ReportOptions,
) -> PipelineResult<Report> {
    options.validate()?;

    log_stage("Cleaner", "Normalizing rows");
    let cleaned = clean(records)?;
    log_drop_report(&cleaned.drops);

    log_stage("Features", "Deriving time and value flags");
    let deriver = FeatureDeriver::from_options(options);
    let transactions = deriver.derive_all(&cleaned.transactions);
    log_success(format!(
        "{} rows, {} mapped cities",
        transactions.len(),
        deriver.regions.len()
    ));

    if transactions.is_empty() {
        log_warning("Every row was dropped; the report will be empty");
    }

    let reference_date = resolve_reference_date(&transactions, options.reference_date)?;

    log_stage("KPI", "Aggregating");
    let kpis = aggregate(&transactions);
    log_success(format!(
        "{} months, {} cities, {} regions",
        kpis.monthly.len(),
        kpis.city_perf.len(),
        kpis.region_perf.len()
    ));

    log_stage("Pivot", "Cross-tabulating");
    let pivots = build_pivots(&transactions);

    let rfm = match reference_date {
        Some(date) => {
            log_stage("RFM", format!("Scoring accounts as of {date}"));
            compute_rfm(&transactions, date)
        }
        None => Vec::new(),
    };
    log_success(format!("{} accounts", rfm.len()));

    log_stage("Cohort", "Building retention matrix");
    let cohorts = build_cohorts(&transactions);
    log_success(format!("{} cohorts", cohorts.rows.len()));

    log_stage("Reconciler", "Cross-checking totals");
    let checks = reconcile(&kpis, &pivots, &rfm)?;
    log_success(format!("{} checks passed", checks.len()));

    Ok(Report {
        source,
        options: options.clone(),
        drops: cleaned.drops,
        reference_date,
        transactions,
        kpis,
        pivots,
        rfm,
        cohorts,
        checks,
    })
}

/// The configured reference date, or one day after the latest transaction.
///
/// A configured date must lie strictly after the latest transaction date so
/// that every recency is at least one day. With no rows and nothing
/// configured there is no reference date.
pub fn resolve_reference_date(
    rows: &[DerivedTransaction],
    configured: Option<NaiveDate>,
) -> ConfigResult<Option<NaiveDate>> {
    let latest = rows.iter().map(|r| r.txn.txn_time.date()).max();
    match (configured, latest) {
        (Some(reference), Some(latest)) if reference <= latest => {
            Err(ConfigError::ReferenceDate { reference, latest })
        }
        (Some(reference), _) => Ok(Some(reference)),
        (None, _) => Ok(default_reference_date(rows)),
    }
}

/// Write the workbook and, when `csv_dir` is given, the flat CSV files.
pub fn export_report(
    report: &Report,
    workbook_path: &Path,
    csv_dir: Option<&Path>,
) -> PipelineResult<()> {
    let sheets = report_sheets(report);

    log_stage("Exporter", format!("Writing {}", workbook_path.display()));
    write_workbook(&sheets, workbook_path, report.reference_date)?;
    log_success(format!("{} sheets written", sheets.len()));

    if let Some(dir) = csv_dir {
        log_stage("Exporter", format!("Writing CSV files to {}", dir.display()));
        let files = write_csv_dir(&sheets, dir)?;
        log_success(format!("{} files written", files.len()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    const LEDGER: &str = "\
account_id,txn_time,amount,txn_type,description,city
A1,2023-01-05 03:15:00,100.0,UPI,coffee,mumbai
A2,2023-01-20 12:00:00,250000,NEFT,rent,Pune
A1,2023-02-02 23:30:00,50.5,UPI,snacks,Delhi
A3,2023-02-14 10:00:00,,UPI,missing,Delhi
A1,2023-02-02 23:30:00,50.5,UPI,snacks,Delhi
A2,2023-03-10 18:00:00,75,CARD,groceries,  pune
";

    fn options() -> ReportOptions {
        let mut options = ReportOptions::default();
        options
            .city_to_region_map
            .insert("Mumbai".to_string(), "West".to_string());
        options
            .city_to_region_map
            .insert("Pune".to_string(), "West".to_string());
        options
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_run_bytes_end_to_end() {
        let report = run_bytes(LEDGER.as_bytes(), &options()).unwrap();

        assert_eq!(report.source.row_count, 6);
        assert_eq!(report.drops.missing_amount, 1);
        assert_eq!(report.drops.duplicate, 1);
        assert_eq!(report.transactions.len(), 4);
        assert_eq!(report.kpis.overall.total_txns, 4);
        assert!((report.kpis.overall.total_amount - 250_225.5).abs() < 1e-9);
        assert_eq!(report.reference_date, Some(date(2023, 3, 11)));
        assert_eq!(report.rfm.len(), 2);
        assert_eq!(report.checks.len(), 9);

        let regions: Vec<&str> = report
            .kpis
            .region_perf
            .iter()
            .map(|r| r.region.as_str())
            .collect();
        assert_eq!(regions, vec!["West", "Unknown"]);
    }

    #[test]
    fn test_runs_are_idempotent() {
        let first = run_bytes(LEDGER.as_bytes(), &options()).unwrap();
        let second = run_bytes(LEDGER.as_bytes(), &options()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_reference_date_must_follow_data() {
        let mut opts = options();
        opts.reference_date = Some(date(2023, 3, 10));

        let err = run_bytes(LEDGER.as_bytes(), &opts).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Config(ConfigError::ReferenceDate { .. })
        ));

        opts.reference_date = Some(date(2023, 4, 1));
        let report = run_bytes(LEDGER.as_bytes(), &opts).unwrap();
        assert_eq!(report.reference_date, Some(date(2023, 4, 1)));
        assert!(report.rfm.iter().all(|p| p.recency_days >= 22));
    }

    #[test]
    fn test_invalid_options_rejected_before_work() {
        let mut opts = options();
        opts.night_end_hour = 24;
        let err = run_bytes(LEDGER.as_bytes(), &opts).unwrap_err();
        assert!(matches!(err, PipelineError::Config(ConfigError::HourOutOfRange { .. })));
    }

    #[test]
    fn test_all_rows_dropped_gives_empty_report() {
        let csv = "account_id,txn_time,amount,txn_type,description,city\n\
                   A,2023-01-01 10:00:00,-10,UPI,x,Pune\n\
                   ,2023-01-02 10:00:00,5,UPI,x,Pune\n";
        let report = run_bytes(csv.as_bytes(), &options()).unwrap();

        assert_eq!(report.drops.negative_amount, 1);
        assert_eq!(report.drops.missing_account, 1);
        assert!(report.transactions.is_empty());
        assert_eq!(report.reference_date, None);
        assert_eq!(report.kpis.overall.total_txns, 0);
        assert_eq!(report.kpis.overall.total_amount, 0.0);
        assert!(report.kpis.monthly.is_empty());
        assert!(report.rfm.is_empty());
        assert!(report.cohorts.rows.is_empty());
        assert_eq!(report.checks.len(), 9);

        let dir = tempfile::TempDir::new().unwrap();
        let workbook = dir.path().join("empty.xlsx");
        let csv_dir = dir.path().join("csv");
        export_report(&report, &workbook, Some(&csv_dir)).unwrap();
        assert!(workbook.is_file());
        let rfm = std::fs::read_to_string(csv_dir.join("rfm.csv")).unwrap();
        assert_eq!(rfm.lines().count(), 1);
    }

    #[test]
    fn test_configured_reference_date_kept_for_empty_report() {
        let csv = "account_id,txn_time,amount,txn_type,description,city\n\
                   A,2023-01-01 10:00:00,,UPI,x,Pune\n";
        let mut opts = options();
        opts.reference_date = Some(date(2023, 6, 1));

        let report = run_bytes(csv.as_bytes(), &opts).unwrap();
        assert_eq!(report.reference_date, Some(date(2023, 6, 1)));
        assert!(report.rfm.is_empty());
    }

    #[test]
    fn test_run_records_skips_parser() {
        let records = vec![RawRecord {
            account_id: "A".to_string(),
            txn_time: "2023-05-01 09:00:00".to_string(),
            amount: "10".to_string(),
            txn_type: "UPI".to_string(),
            description: String::new(),
            city: "pune".to_string(),
        }];
        let report = run_records(records, &options()).unwrap();
        assert_eq!(report.kpis.city_perf[0].city, "Pune");
        assert_eq!(report.kpis.city_perf[0].region, "West");
    }
}
