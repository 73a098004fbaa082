//! Aggregation stages over the derived transaction table.
//!
//! - KPI: overall, monthly, city and region rollups
//! - Pivot: month x city and type x month cross-tabulations
//! - RFM: per-account recency/frequency/monetary quartiles
//! - Cohort: first-activity month and retention
//! - Reconcile: cross-table total checks
//!
//! Every stage reads `&[DerivedTransaction]` (or other stages' outputs) and
//! returns a freshly built table.

pub mod cohort;
pub mod kpi;
pub mod pivot;
pub mod reconcile;
pub mod rfm;

pub use cohort::{build_cohorts, cohort_entries, CohortEntry, CohortRow, CohortTable};
pub use kpi::{aggregate, CityPerf, KpiTables, MonthlyRow, OverallKpis, RegionPerf};
pub use pivot::{build_pivots, PivotTable, PivotTables};
pub use reconcile::{reconcile, ReconciledCheck};
pub use rfm::{compute_rfm, default_reference_date, quantile_ranks, RfmProfile};
