//! Error types for the ledger reporting pipeline.
//!
//! - [`MalformedInputError`] - unreadable or structurally invalid input (fatal)
//! - [`DataQualityWarning`] - per-row drop reasons, absorbed into a [`crate::models::DropReport`]
//! - [`ConfigError`] - invalid report options
//! - [`ReconciliationError`] - cross-table totals disagree (fatal, internal bug)
//! - [`ExportError`] - output write failure (fatal)
//! - [`PipelineError`] - top-level wrapper returned by [`crate::pipeline::run_file`]
//!
//! Conversion into [`PipelineError`] is automatic via `From`, so `?` works
//! across stage boundaries.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Input Errors
// =============================================================================

/// Errors while loading the ledger file. All of them abort the run.
#[derive(Debug, Error)]
pub enum MalformedInputError {
    /// Failed to read file.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to decode the file contents.
    #[error("Failed to decode input as {encoding}")]
    Encoding { encoding: String },

    /// Invalid CSV structure.
    #[error("Invalid CSV format: {0}")]
    Csv(#[from] csv::Error),

    /// No header or no data rows.
    #[error("CSV file is empty")]
    EmptyFile,

    /// Required columns absent from the header.
    #[error("Missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Not a single timestamp in the column could be parsed.
    #[error("Column '{column}' is unparsable for the whole dataset (first value: '{sample}')")]
    UnparsableTimestamps { column: String, sample: String },
}

// =============================================================================
// Row-level Warnings
// =============================================================================

/// Reason a single row was dropped by the cleaner.
///
/// These never abort the run; the cleaner counts them per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Error)]
pub enum DataQualityWarning {
    #[error("missing account_id")]
    MissingAccount,

    #[error("unparsable or missing txn_time")]
    BadTimestamp,

    #[error("missing amount")]
    MissingAmount,

    #[error("non-numeric amount")]
    InvalidAmount,

    #[error("negative amount")]
    NegativeAmount,

    #[error("exact duplicate row")]
    Duplicate,
}

// =============================================================================
// Configuration Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Hour option outside 0..=23.
    #[error("{option} must be within 0..=23, got {value}")]
    HourOutOfRange { option: &'static str, value: u32 },

    #[error("high_value_threshold must be a finite non-negative number, got {0}")]
    InvalidThreshold(f64),

    /// Configured reference date does not lie after every transaction.
    #[error("reference_date {reference} must be after the latest transaction date {latest}")]
    ReferenceDate {
        reference: chrono::NaiveDate,
        latest: chrono::NaiveDate,
    },
}

// =============================================================================
// Reconciliation Errors
// =============================================================================

/// Two derived tables disagree on a total.
///
/// Signals a computation bug upstream, not a data-quality issue.
#[derive(Debug, Clone, Error)]
#[error("Reconciliation failed: {left} = {left_value} but {right} = {right_value} (difference {difference})")]
pub struct ReconciliationError {
    pub left: String,
    pub right: String,
    pub left_value: f64,
    pub right_value: f64,
    pub difference: f64,
}

// =============================================================================
// Export Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write workbook '{path}': {source}")]
    Xlsx {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("Failed to write CSV '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline error. The Display output names the failing stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input error: {0}")]
    Input(#[from] MalformedInputError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Reconciler: {0}")]
    Reconciliation(#[from] ReconciliationError),

    #[error("Exporter: {0}")]
    Export(#[from] ExportError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

pub type InputResult<T> = Result<T, MalformedInputError>;

pub type ConfigResult<T> = Result<T, ConfigError>;

pub type ExportResult<T> = Result<T, ExportError>;

pub type PipelineResult<T> = Result<T, PipelineError>;
