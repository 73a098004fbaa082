//! # Ledgerlens - batch analytics over transaction ledgers
//!
//! Ledgerlens turns a raw transaction ledger CSV into a multi-sheet
//! analytics workbook (overall KPIs, monthly trend, city and region
//! performance, pivots, RFM segments, cohort retention) plus one flat CSV
//! per table.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌──────────┐   ┌──────────┐   ┌────────────┐   ┌──────────┐
//! │ CSV File │──▶│ Parser  │──▶│ Cleaner  │──▶│ Features │──▶│ KPI/Pivot/ │──▶│Reconciler│──▶ xlsx + csv
//! │(any enc.)│   │(auto)   │   │(drops)   │   │(flags)   │   │ RFM/Cohort │   │          │
//! └──────────┘   └─────────┘   └──────────┘   └──────────┘   └────────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ledgerlens::{pipeline, ReportOptions};
//! use std::path::Path;
//!
//! let report = pipeline::run_file(Path::new("ledger.csv"), &ReportOptions::default())?;
//! println!("{} accounts scored", report.rfm.len());
//! pipeline::export_report(&report, Path::new("report.xlsx"), None)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error hierarchy
//! - [`config`] - Report options
//! - [`models`] - Ledger rows and drop report
//! - [`parser`] - CSV parsing with encoding and delimiter detection
//! - [`transform`] - Cleaning and feature derivation
//! - [`analysis`] - KPI, pivot, RFM, cohort and reconciliation stages
//! - [`export`] - Workbook and CSV writers
//! - [`pipeline`] - End-to-end orchestration
//! - [`logs`] - Progress logging helpers

#![deny(rustdoc::broken_intra_doc_links)]

// Core modules
pub mod config;
pub mod error;
pub mod logs;
pub mod models;

// Parsing
pub mod parser;

// Cleaning and features
pub mod transform;

// Aggregation
pub mod analysis;

// Output
pub mod export;

// Orchestration
pub mod pipeline;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, DataQualityWarning, ExportError, MalformedInputError, PipelineError,
    PipelineResult, ReconciliationError,
};

// =============================================================================
// Re-exports - Models & config
// =============================================================================

pub use config::{example_config, ReportOptions};
pub use models::{DerivedTransaction, DropReport, RawRecord, Transaction};

// =============================================================================
// Re-exports - Stages
// =============================================================================

pub use analysis::{
    aggregate, build_cohorts, build_pivots, compute_rfm, reconcile, CohortTable, KpiTables,
    PivotTables, RfmProfile,
};
pub use parser::{parse_bytes_auto, parse_csv_file_auto, ParseResult};
pub use transform::{clean, CleanOutput, FeatureDeriver};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use export::{report_sheets, write_csv_dir, write_workbook, Cell, Section, Sheet};
pub use pipeline::{export_report, run_bytes, run_file, run_records, Report};
