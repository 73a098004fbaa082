//! RFM Engine: per-account recency, frequency and monetary value with
//! quartile ranks.
//!
//! The reference date is an explicit input; see [`default_reference_date`]
//! for the value the pipeline uses when none is configured.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::DerivedTransaction;

/// Number of equal-frequency bins per metric.
pub const QUARTILES: usize = 4;

/// One account's RFM profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmProfile {
    pub account_id: String,
    pub last_txn_date: NaiveDate,
    pub recency_days: i64,
    pub frequency: usize,
    pub monetary: f64,
    /// 4 = most recent.
    pub r_rank: u8,
    /// 4 = most frequent.
    pub f_rank: u8,
    /// 4 = highest spend.
    pub m_rank: u8,
    /// Ranks concatenated in R, F, M order, e.g. `"432"`. A label, not a number.
    pub rfm_score: String,
    /// R + F + M.
    pub rfm_total: u8,
}

/// One day after the latest transaction date, so the most recent account
/// has a recency of exactly one day.
pub fn default_reference_date(rows: &[DerivedTransaction]) -> Option<NaiveDate> {
    rows.iter()
        .map(|r| r.txn.txn_time.date())
        .max()
        .and_then(|d| d.checked_add_days(Days::new(1)))
}

/// Build one profile per distinct account, ordered by account id.
pub fn compute_rfm(rows: &[DerivedTransaction], reference_date: NaiveDate) -> Vec<RfmProfile> {
    struct Acc {
        last: NaiveDate,
        count: usize,
        amount: f64,
    }

    let mut accounts: BTreeMap<&str, Acc> = BTreeMap::new();
    for row in rows {
        let date = row.txn.txn_time.date();
        let acc = accounts.entry(row.account_id()).or_insert(Acc {
            last: date,
            count: 0,
            amount: 0.0,
        });
        acc.last = acc.last.max(date);
        acc.count += 1;
        acc.amount += row.amount();
    }

    let mut profiles: Vec<RfmProfile> = accounts
        .into_iter()
        .map(|(account_id, acc)| RfmProfile {
            account_id: account_id.to_string(),
            last_txn_date: acc.last,
            recency_days: (reference_date - acc.last).num_days(),
            frequency: acc.count,
            monetary: acc.amount,
            r_rank: 0,
            f_rank: 0,
            m_rank: 0,
            rfm_score: String::new(),
            rfm_total: 0,
        })
        .collect();

    // Recency is binned on its negation so that the most recent ranks highest.
    let recency: Vec<f64> = profiles.iter().map(|p| -(p.recency_days as f64)).collect();
    let frequency: Vec<f64> = profiles.iter().map(|p| p.frequency as f64).collect();
    let monetary: Vec<f64> = profiles.iter().map(|p| p.monetary).collect();

    let r = quantile_ranks(&recency, QUARTILES);
    let f = quantile_ranks(&frequency, QUARTILES);
    let m = quantile_ranks(&monetary, QUARTILES);

    for (i, p) in profiles.iter_mut().enumerate() {
        p.r_rank = r[i];
        p.f_rank = f[i];
        p.m_rank = m[i];
        p.rfm_score = format!("{}{}{}", r[i], f[i], m[i]);
        p.rfm_total = r[i] + f[i] + m[i];
    }

    profiles
}

/// Equal-frequency binning into at most `bins` ranks (1 = lowest).
///
/// Bin edges are the linearly interpolated quantiles at `k / bins`.
/// Duplicate edges collapse, so metrics with few distinct values get fewer
/// ranks. A constant metric ranks every value 1.
pub fn quantile_ranks(values: &[f64], bins: usize) -> Vec<u8> {
    if values.is_empty() {
        return Vec::new();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut edges: Vec<f64> = (0..=bins)
        .map(|k| quantile(&sorted, k as f64 / bins as f64))
        .collect();
    edges.dedup();

    if edges.len() < 2 {
        return vec![1; values.len()];
    }

    // edges[0] is the minimum; a value belongs to the first bin whose
    // upper edge is >= the value.
    let upper = &edges[1..];
    values
        .iter()
        .map(|v| {
            let bin = upper.partition_point(|edge| edge < v).min(upper.len() - 1);
            (bin + 1) as u8
        })
        .collect()
}

/// Linear-interpolated quantile of an ascending slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::row;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_recency_and_frequency_scenario() {
        let rows = vec![
            row("acct", "2023-01-05 09:00:00", 10.0, "X", "Unknown"),
            row("acct", "2023-03-10 18:00:00", 15.0, "X", "Unknown"),
        ];
        let profiles = compute_rfm(&rows, date(2023, 3, 11));

        assert_eq!(profiles.len(), 1);
        let p = &profiles[0];
        assert_eq!(p.recency_days, 1);
        assert_eq!(p.frequency, 2);
        assert_eq!(p.monetary, 25.0);
        assert_eq!(p.last_txn_date, date(2023, 3, 10));
    }

    #[test]
    fn test_default_reference_date() {
        let rows = vec![
            row("a", "2023-03-10 23:59:00", 1.0, "X", "Unknown"),
            row("b", "2023-01-01 00:00:00", 1.0, "X", "Unknown"),
        ];
        assert_eq!(default_reference_date(&rows), Some(date(2023, 3, 11)));
        assert_eq!(default_reference_date(&[]), None);

        let profiles = compute_rfm(&rows, date(2023, 3, 11));
        assert!(profiles.iter().all(|p| p.recency_days >= 1));
        assert_eq!(profiles.iter().map(|p| p.recency_days).min(), Some(1));
    }

    #[test]
    fn test_identical_amounts_rank_one() {
        let rows: Vec<_> = (0..8)
            .map(|i| row(&format!("acct-{i}"), &format!("2023-01-{:02} 10:00:00", i + 1), 100.0, "X", "Unknown"))
            .collect();
        let profiles = compute_rfm(&rows, date(2023, 2, 1));

        assert!(profiles.iter().all(|p| p.m_rank == 1));
        assert!(profiles.iter().all(|p| p.f_rank == 1));
        // recency still varies
        assert_eq!(profiles.iter().map(|p| p.r_rank).max(), Some(4));
    }

    #[test]
    fn test_recency_inverted() {
        let rows = vec![
            row("old", "2023-01-01 10:00:00", 1.0, "X", "Unknown"),
            row("mid1", "2023-01-10 10:00:00", 2.0, "X", "Unknown"),
            row("mid2", "2023-01-20 10:00:00", 3.0, "X", "Unknown"),
            row("new", "2023-01-30 10:00:00", 4.0, "X", "Unknown"),
        ];
        let profiles = compute_rfm(&rows, date(2023, 1, 31));
        let by_id: BTreeMap<_, _> = profiles.iter().map(|p| (p.account_id.as_str(), p)).collect();

        assert_eq!(by_id["new"].r_rank, 4);
        assert_eq!(by_id["old"].r_rank, 1);
        assert_eq!(by_id["new"].m_rank, 4);
        assert_eq!(by_id["old"].m_rank, 1);
        assert_eq!(by_id["new"].rfm_score, "414");
        assert_eq!(by_id["new"].rfm_total, 9);
    }

    #[test]
    fn test_quantile_ranks_even_split() {
        let values: Vec<f64> = (1..=8).map(f64::from).collect();
        assert_eq!(quantile_ranks(&values, 4), vec![1, 1, 2, 2, 3, 3, 4, 4]);
    }

    #[test]
    fn test_quantile_ranks_collapse_with_few_distinct_values() {
        let ranks = quantile_ranks(&[1.0, 1.0, 1.0, 2.0], 4);
        assert_eq!(ranks, vec![1, 1, 1, 2]);

        assert_eq!(quantile_ranks(&[7.0], 4), vec![1]);
        assert_eq!(quantile_ranks(&[3.0, 3.0, 3.0], 4), vec![1, 1, 1]);
        assert!(quantile_ranks(&[], 4).is_empty());
    }

    #[test]
    fn test_every_account_exactly_once() {
        let rows = vec![
            row("b", "2023-01-01 10:00:00", 1.0, "X", "Unknown"),
            row("a", "2023-01-02 10:00:00", 2.0, "X", "Unknown"),
            row("b", "2023-01-03 10:00:00", 3.0, "X", "Unknown"),
        ];
        let profiles = compute_rfm(&rows, date(2023, 1, 4));
        let ids: Vec<&str> = profiles.iter().map(|p| p.account_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(profiles.iter().all(|p| p.frequency >= 1 && p.monetary >= 0.0));
        assert!(profiles.iter().all(|p| (1..=4).contains(&p.r_rank)));
    }
}
