//! Cohort Engine: first-activity month per account and monthly retention.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{months_between, DerivedTransaction};

/// An account active in a given month.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CohortEntry {
    pub account_id: String,
    /// Month of the account's first transaction.
    pub cohort_month: NaiveDate,
    pub activity_month: NaiveDate,
    /// Whole months between cohort and activity month.
    pub month_offset: u32,
}

/// Retention for one acquisition cohort.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortRow {
    pub cohort_month: NaiveDate,
    /// Accounts whose first transaction fell in `cohort_month`.
    pub size: usize,
    /// Active account count per offset. Offsets with nobody active are absent.
    pub active: BTreeMap<u32, usize>,
    /// `active / size` per offset, same keys as `active`.
    pub retention: BTreeMap<u32, f64>,
}

/// Retention matrix keyed by (cohort, offset).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortTable {
    /// 0 ..= (latest observed month - earliest cohort month).
    pub offsets: Vec<u32>,
    /// Chronological.
    pub rows: Vec<CohortRow>,
}

impl CohortTable {
    pub fn retention(&self, cohort_month: NaiveDate, offset: u32) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| r.cohort_month == cohort_month)
            .and_then(|r| r.retention.get(&offset).copied())
    }
}

/// One entry per (account, month with at least one transaction), sorted.
pub fn cohort_entries(rows: &[DerivedTransaction]) -> Vec<CohortEntry> {
    let mut first: BTreeMap<&str, NaiveDate> = BTreeMap::new();
    let mut activity: BTreeSet<(&str, NaiveDate)> = BTreeSet::new();

    for row in rows {
        let cohort = first.entry(row.account_id()).or_insert(row.month);
        *cohort = (*cohort).min(row.month);
        activity.insert((row.account_id(), row.month));
    }

    activity
        .into_iter()
        .map(|(account, month)| {
            let cohort_month = first[account];
            CohortEntry {
                account_id: account.to_string(),
                cohort_month,
                activity_month: month,
                month_offset: months_between(cohort_month, month).max(0) as u32,
            }
        })
        .collect()
}

pub fn build_cohorts(rows: &[DerivedTransaction]) -> CohortTable {
    let entries = cohort_entries(rows);

    let mut sizes: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut active: BTreeMap<NaiveDate, BTreeMap<u32, usize>> = BTreeMap::new();
    for entry in &entries {
        if entry.month_offset == 0 {
            *sizes.entry(entry.cohort_month).or_default() += 1;
        }
        *active
            .entry(entry.cohort_month)
            .or_default()
            .entry(entry.month_offset)
            .or_default() += 1;
    }

    let max_offset = match (sizes.keys().next(), rows.iter().map(|r| r.month).max()) {
        (Some(&earliest), Some(latest)) => months_between(earliest, latest).max(0) as u32,
        _ => 0,
    };

    let cohort_rows = sizes
        .into_iter()
        .map(|(cohort_month, size)| {
            let active = active.remove(&cohort_month).unwrap_or_default();
            let retention = active
                .iter()
                .map(|(&offset, &n)| (offset, n as f64 / size as f64))
                .collect();
            CohortRow {
                cohort_month,
                size,
                active,
                retention,
            }
        })
        .collect();

    CohortTable {
        offsets: if rows.is_empty() {
            Vec::new()
        } else {
            (0..=max_offset).collect()
        },
        rows: cohort_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::row;

    fn month(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_january_cohort_february_retention() {
        let rows = vec![
            row("a", "2023-01-03 10:00:00", 1.0, "X", "Unknown"),
            row("b", "2023-01-12 10:00:00", 1.0, "X", "Unknown"),
            row("c", "2023-01-25 10:00:00", 1.0, "X", "Unknown"),
            row("a", "2023-02-02 10:00:00", 1.0, "X", "Unknown"),
            row("a", "2023-02-15 10:00:00", 1.0, "X", "Unknown"),
            row("b", "2023-02-20 10:00:00", 1.0, "X", "Unknown"),
        ];
        let table = build_cohorts(&rows);

        assert_eq!(table.offsets, vec![0, 1]);
        assert_eq!(table.rows.len(), 1);
        let jan = &table.rows[0];
        assert_eq!(jan.size, 3);
        assert_eq!(jan.active[&1], 2);
        let feb = table.retention(month(2023, 1), 1).unwrap();
        assert!((feb - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(format!("{feb:.3}"), "0.667");
    }

    #[test]
    fn test_offset_zero_is_always_full() {
        let rows = vec![
            row("a", "2022-11-03 10:00:00", 1.0, "X", "Unknown"),
            row("b", "2022-12-12 10:00:00", 1.0, "X", "Unknown"),
            row("c", "2023-01-25 10:00:00", 1.0, "X", "Unknown"),
            row("a", "2023-01-02 10:00:00", 1.0, "X", "Unknown"),
            row("d", "2023-01-02 10:00:00", 1.0, "X", "Unknown"),
        ];
        let table = build_cohorts(&rows);

        assert_eq!(table.rows.len(), 3);
        for r in &table.rows {
            assert_eq!(r.retention[&0], 1.0, "cohort {}", r.cohort_month);
        }
        assert_eq!(table.offsets, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_offsets_omitted_not_zero_filled() {
        let rows = vec![
            row("a", "2023-01-03 10:00:00", 1.0, "X", "Unknown"),
            row("a", "2023-03-03 10:00:00", 1.0, "X", "Unknown"),
        ];
        let table = build_cohorts(&rows);

        assert_eq!(table.offsets, vec![0, 1, 2]);
        let jan = &table.rows[0];
        assert!(!jan.retention.contains_key(&1));
        assert_eq!(jan.retention[&2], 1.0);
    }

    #[test]
    fn test_cohort_entries_dedupe_months() {
        let rows = vec![
            row("a", "2023-02-03 10:00:00", 1.0, "X", "Unknown"),
            row("a", "2023-02-04 10:00:00", 1.0, "X", "Unknown"),
            row("a", "2023-01-30 10:00:00", 1.0, "X", "Unknown"),
        ];
        let entries = cohort_entries(&rows);

        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.cohort_month == month(2023, 1)));
        assert_eq!(entries[1].month_offset, 1);
    }

    #[test]
    fn test_empty_input() {
        let table = build_cohorts(&[]);
        assert!(table.offsets.is_empty());
        assert!(table.rows.is_empty());
    }
}
