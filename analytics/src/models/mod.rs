//! Domain models shared by every pipeline stage.
//!
//! - [`RawRecord`] - one ledger row exactly as read from the file
//! - [`Transaction`] - a cleaned, typed ledger row
//! - [`DerivedTransaction`] - a transaction plus its derived features
//! - [`DropReport`] - per-reason counts of rows rejected by the cleaner
//!
//! Aggregated tables live next to the stage that produces them
//! (see [`crate::analysis`]).

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::DataQualityWarning;

/// Columns every ledger file must carry.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "account_id",
    "txn_time",
    "amount",
    "txn_type",
    "description",
    "city",
];

/// Region assigned to cities missing from the lookup table.
pub const UNKNOWN_REGION: &str = "Unknown";

// =============================================================================
// Raw Record
// =============================================================================

/// A ledger row before any coercion. Every field is the untouched cell text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub account_id: String,
    pub txn_time: String,
    pub amount: String,
    pub txn_type: String,
    pub description: String,
    pub city: String,
}

// =============================================================================
// Transaction
// =============================================================================

/// A cleaned ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub account_id: String,
    pub txn_time: NaiveDateTime,
    /// Always finite and non-negative.
    pub amount: f64,
    pub txn_type: String,
    pub description: String,
    pub city: String,
}

// =============================================================================
// Derived Transaction
// =============================================================================

/// A transaction enriched with calendar and classification features.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedTransaction {
    #[serde(flatten)]
    pub txn: Transaction,
    /// Hour of day, 0..=23.
    pub hour: u32,
    /// First day of the transaction's month.
    pub month: NaiveDate,
    /// Day of week, Monday = 0 .. Sunday = 6.
    pub weekday: u32,
    pub weekday_name: String,
    pub is_weekend: bool,
    pub is_night: bool,
    pub is_high_value: bool,
    pub region: String,
}

impl DerivedTransaction {
    pub fn account_id(&self) -> &str {
        &self.txn.account_id
    }

    pub fn amount(&self) -> f64 {
        self.txn.amount
    }
}

// =============================================================================
// Drop Report
// =============================================================================

/// How many rows the cleaner rejected, and why.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DropReport {
    pub input_rows: usize,
    pub kept_rows: usize,
    pub missing_account: usize,
    pub bad_timestamp: usize,
    pub missing_amount: usize,
    pub invalid_amount: usize,
    pub negative_amount: usize,
    pub duplicate: usize,
}

impl DropReport {
    pub fn record(&mut self, warning: DataQualityWarning) {
        *self.counter_mut(warning) += 1;
    }

    pub fn count(&self, warning: DataQualityWarning) -> usize {
        match warning {
            DataQualityWarning::MissingAccount => self.missing_account,
            DataQualityWarning::BadTimestamp => self.bad_timestamp,
            DataQualityWarning::MissingAmount => self.missing_amount,
            DataQualityWarning::InvalidAmount => self.invalid_amount,
            DataQualityWarning::NegativeAmount => self.negative_amount,
            DataQualityWarning::Duplicate => self.duplicate,
        }
    }

    /// Total rows dropped for any reason.
    pub fn dropped(&self) -> usize {
        self.missing_account
            + self.bad_timestamp
            + self.missing_amount
            + self.invalid_amount
            + self.negative_amount
            + self.duplicate
    }

    /// Non-zero counters, in a stable order.
    pub fn reasons(&self) -> Vec<(DataQualityWarning, usize)> {
        [
            DataQualityWarning::MissingAccount,
            DataQualityWarning::BadTimestamp,
            DataQualityWarning::MissingAmount,
            DataQualityWarning::InvalidAmount,
            DataQualityWarning::NegativeAmount,
            DataQualityWarning::Duplicate,
        ]
        .into_iter()
        .map(|w| (w, self.count(w)))
        .filter(|(_, n)| *n > 0)
        .collect()
    }

    fn counter_mut(&mut self, warning: DataQualityWarning) -> &mut usize {
        match warning {
            DataQualityWarning::MissingAccount => &mut self.missing_account,
            DataQualityWarning::BadTimestamp => &mut self.bad_timestamp,
            DataQualityWarning::MissingAmount => &mut self.missing_amount,
            DataQualityWarning::InvalidAmount => &mut self.invalid_amount,
            DataQualityWarning::NegativeAmount => &mut self.negative_amount,
            DataQualityWarning::Duplicate => &mut self.duplicate,
        }
    }
}

// =============================================================================
// Month helpers
// =============================================================================

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Whole calendar months from `from` to `to` (negative if `to` is earlier).
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32
}

/// `YYYY-MM` label used in every exported table.
pub fn month_label(month: NaiveDate) -> String {
    month.format("%Y-%m").to_string()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_report_counts() {
        let mut report = DropReport::default();
        report.record(DataQualityWarning::Duplicate);
        report.record(DataQualityWarning::Duplicate);
        report.record(DataQualityWarning::NegativeAmount);

        assert_eq!(report.count(DataQualityWarning::Duplicate), 2);
        assert_eq!(report.dropped(), 3);
        assert_eq!(
            report.reasons(),
            vec![
                (DataQualityWarning::NegativeAmount, 1),
                (DataQualityWarning::Duplicate, 2),
            ]
        );
    }

    #[test]
    fn test_month_helpers() {
        let d = NaiveDate::from_ymd_opt(2023, 3, 17).unwrap();
        assert_eq!(month_start(d), NaiveDate::from_ymd_opt(2023, 3, 1).unwrap());
        assert_eq!(month_label(d), "2023-03");

        let nov = NaiveDate::from_ymd_opt(2022, 11, 1).unwrap();
        assert_eq!(months_between(nov, month_start(d)), 4);
        assert_eq!(months_between(month_start(d), nov), -4);
    }
}
