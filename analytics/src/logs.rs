//! Console logging for pipeline progress.
//!
//! The library only talks to the `log` facade. The binary installs
//! `env_logger` through [`init`]; `RUST_LOG` overrides the default level.

use log::LevelFilter;

use crate::models::DropReport;

/// Verbosity selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (true, _) => Verbosity::Verbose,
            (false, true) => Verbosity::Quiet,
            _ => Verbosity::Normal,
        }
    }

    pub fn level(self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::Warn,
            Verbosity::Normal => LevelFilter::Info,
            Verbosity::Verbose => LevelFilter::Debug,
        }
    }
}

/// Install the global logger. Calling it twice is a no-op.
pub fn init(verbosity: Verbosity) {
    let _ = env_logger::Builder::new()
        .filter_level(verbosity.level())
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

/// Announce the start of a pipeline stage.
pub fn log_stage(stage: &str, message: impl AsRef<str>) {
    log::info!("[{stage}] {}", message.as_ref());
}

pub fn log_success(message: impl AsRef<str>) {
    log::info!("   ✓ {}", message.as_ref());
}

pub fn log_warning(message: impl AsRef<str>) {
    log::warn!("   ⚠️ {}", message.as_ref());
}

/// Summarize the cleaner's drop counts, one line per non-zero reason.
pub fn log_drop_report(report: &DropReport) {
    log_success(format!(
        "Kept {} of {} rows ({} dropped)",
        report.kept_rows,
        report.input_rows,
        report.dropped()
    ));
    for (reason, count) in report.reasons() {
        log_warning(format!("{count} row(s) dropped: {reason}"));
    }
}

/// Human-readable name for a detected delimiter.
pub fn format_delimiter(d: char) -> &'static str {
    match d {
        ',' => "comma",
        ';' => "semicolon",
        '\t' => "tab",
        '|' => "pipe",
        _ => "other",
    }
}
