//! Reconciler: cross-checks totals between derived tables.
//!
//! A mismatch means an upstream stage has a bug, so every failure is fatal.

use serde::Serialize;

use super::kpi::KpiTables;
use super::pivot::PivotTables;
use super::rfm::RfmProfile;
use crate::error::ReconciliationError;

/// Relative tolerance for amount comparisons.
pub const RELATIVE_TOLERANCE: f64 = 1e-6;

/// A check that passed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledCheck {
    pub left: String,
    pub right: String,
    pub value: f64,
}

/// True when `a` and `b` agree within [`RELATIVE_TOLERANCE`] of the larger magnitude.
pub fn within_tolerance(a: f64, b: f64) -> bool {
    (a - b).abs() <= RELATIVE_TOLERANCE * a.abs().max(b.abs())
}

/// Run every cross-table check. Stops at the first disagreement.
pub fn reconcile(
    kpis: &KpiTables,
    pivots: &PivotTables,
    rfm: &[RfmProfile],
) -> Result<Vec<ReconciledCheck>, ReconciliationError> {
    let total_amount = kpis.overall.total_amount;
    let total_txns = kpis.overall.total_txns as f64;

    let amount_checks = [
        ("sum(monthly.gmv)", kpis.monthly.iter().map(|m| m.gmv).sum::<f64>()),
        (
            "sum(city_perf.total_amount)",
            kpis.city_perf.iter().map(|c| c.total_amount).sum::<f64>(),
        ),
        (
            "sum(region_perf.total_amount)",
            kpis.region_perf.iter().map(|r| r.total_amount).sum::<f64>(),
        ),
        ("sum(RFM.monetary)", rfm.iter().map(|p| p.monetary).sum::<f64>()),
        ("pivot_month_city.total", pivots.month_city.grand_total()),
        ("pivot_type_month_amount.total", pivots.type_month_amount.grand_total()),
    ];

    let count_checks = [
        (
            "sum(monthly.txn_count)",
            kpis.monthly.iter().map(|m| m.txn_count).sum::<usize>() as f64,
        ),
        (
            "sum(RFM.frequency)",
            rfm.iter().map(|p| p.frequency).sum::<usize>() as f64,
        ),
        (
            "pivot_type_month_count.total",
            pivots.type_month_count.grand_total() as f64,
        ),
    ];

    let mut passed = Vec::with_capacity(amount_checks.len() + count_checks.len());

    for (name, value) in amount_checks {
        passed.push(check(name, value, "overall.total_amount", total_amount, within_tolerance)?);
    }
    for (name, value) in count_checks {
        passed.push(check(name, value, "overall.total_txns", total_txns, |a, b| a == b)?);
    }

    Ok(passed)
}

fn check(
    left: &str,
    left_value: f64,
    right: &str,
    right_value: f64,
    agree: impl Fn(f64, f64) -> bool,
) -> Result<ReconciledCheck, ReconciliationError> {
    if agree(left_value, right_value) {
        log::debug!("{left} == {right} ({right_value})");
        Ok(ReconciledCheck {
            left: left.to_string(),
            right: right.to_string(),
            value: right_value,
        })
    } else {
        Err(ReconciliationError {
            left: left.to_string(),
            right: right.to_string(),
            left_value,
            right_value,
            difference: left_value - right_value,
        })
    }
}
