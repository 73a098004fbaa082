//! Ledgerlens CLI - transaction ledger analytics
//!
//! # Commands
//!
//! ```bash
//! ledgerlens report ledger.csv -o report.xlsx   # Full workbook + flat CSVs
//! ledgerlens clean ledger.csv -o cleaned.csv    # Cleaning only, prints drop report
//! ledgerlens rfm ledger.csv -o rfm.json         # RFM profiles as JSON
//! ledgerlens example-config                     # Sample config with a region map
//! ```

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use ledgerlens::logs::{self, log_drop_report, Verbosity};
use ledgerlens::{clean, example_config, export_report, parse_csv_file_auto, run_file, ReportOptions};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ledgerlens")]
#[command(about = "Batch analytics reports from transaction ledger CSV files", long_about = None)]
struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: CSV -> workbook + flat CSV files
    Report {
        /// Input ledger CSV
        input: PathBuf,

        /// Workbook path
        #[arg(short, long, default_value = "report.xlsx")]
        output: PathBuf,

        /// Directory for flat CSV files (default: <workbook>_csv next to the workbook)
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Skip flat CSV files
        #[arg(long, conflicts_with = "csv_dir")]
        no_csv: bool,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Clean a ledger and write the canonical rows
    Clean {
        /// Input ledger CSV
        input: PathBuf,

        /// Output CSV (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compute RFM profiles and output JSON
    Rfm {
        /// Input ledger CSV
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Show an example configuration file
    ExampleConfig,
}

/// Report options; flags override values read from `--config`.
#[derive(Args)]
struct OptionArgs {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Hours before this are night-time
    #[arg(long)]
    night_start: Option<u32>,

    /// Hours after this are night-time
    #[arg(long)]
    night_end: Option<u32>,

    /// Amounts above this are high-value
    #[arg(long)]
    high_value: Option<f64>,

    /// RFM reference date (YYYY-MM-DD)
    #[arg(long)]
    reference_date: Option<NaiveDate>,
}

impl OptionArgs {
    fn resolve(&self) -> Result<ReportOptions, Box<dyn std::error::Error>> {
        let mut options = match &self.config {
            Some(path) => ReportOptions::from_file(path)?,
            None => ReportOptions::default(),
        };
        if let Some(h) = self.night_start {
            options.night_start_hour = h;
        }
        if let Some(h) = self.night_end {
            options.night_end_hour = h;
        }
        if let Some(x) = self.high_value {
            options.high_value_threshold = x;
        }
        if let Some(d) = self.reference_date {
            options.reference_date = Some(d);
        }
        options.validate()?;
        Ok(options)
    }
}

fn main() {
    let cli = Cli::parse();
    logs::init(Verbosity::from_flags(cli.verbose, cli.quiet));

    let result = match cli.command {
        Commands::Report {
            input,
            output,
            csv_dir,
            no_csv,
            options,
        } => cmd_report(&input, &output, csv_dir, no_csv, &options),

        Commands::Clean { input, output } => cmd_clean(&input, output.as_deref()),

        Commands::Rfm {
            input,
            output,
            options,
        } => cmd_rfm(&input, output.as_deref(), &options),

        Commands::ExampleConfig => cmd_example_config(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_report(
    input: &Path,
    output: &Path,
    csv_dir: Option<PathBuf>,
    no_csv: bool,
    args: &OptionArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = args.resolve()?;
    let report = run_file(input, &options)?;

    let csv_dir = match (no_csv, csv_dir) {
        (true, _) => None,
        (false, Some(dir)) => Some(dir),
        (false, None) => Some(default_csv_dir(output)),
    };
    export_report(&report, output, csv_dir.as_deref())?;

    eprintln!(
        "{} rows -> {} ({} dropped)",
        report.drops.kept_rows,
        output.display(),
        report.drops.dropped()
    );
    Ok(())
}

/// `out/report.xlsx` -> `out/report_csv`
fn default_csv_dir(workbook: &Path) -> PathBuf {
    let stem = workbook
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("report");
    workbook.with_file_name(format!("{stem}_csv"))
}

fn cmd_clean(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = parse_csv_file_auto(input)?;
    let cleaned = clean(&parsed.records)?;
    log_drop_report(&cleaned.drops);

    let mut writer = csv::Writer::from_writer(Vec::new());
    for txn in &cleaned.transactions {
        writer.serialize(txn)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    write_output(&String::from_utf8(bytes)?, output)
}

fn cmd_rfm(
    input: &Path,
    output: Option<&Path>,
    args: &OptionArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = args.resolve()?;
    let report = run_file(input, &options)?;
    let json = serde_json::to_string_pretty(&report.rfm)?;
    write_output(&json, output)
}

fn cmd_example_config() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", example_config().to_json()?);
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            log::info!("Output written to: {}", p.display());
        }
        None => {
            print!("{content}");
            if !content.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}
