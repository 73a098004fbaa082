//! Cleaner: raw rows to the canonical transaction table.
//!
//! Row-level problems drop the row and bump a [`DropReport`] counter.
//! Only a timestamp column that fails for every row aborts the run.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::error::{DataQualityWarning, InputResult, MalformedInputError};
use crate::models::{DropReport, RawRecord, Transaction};

/// Datetime layouts tried in order. Day-first where ambiguous.
const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M:%S%.f",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"];

/// Cell values treated as a missing amount.
const NULL_TOKENS: [&str; 6] = ["nan", "null", "none", "na", "n/a", "-"];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Amounts containing a comma must use it as a thousands separator.
static GROUPED_THOUSANDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d{1,3}(,\d{3})+(\.\d+)?$").expect("valid regex"));

/// Output of the cleaning stage
#[derive(Debug, Clone)]
pub struct CleanOutput {
    /// Canonical rows ordered by `txn_time`
    pub transactions: Vec<Transaction>,
    /// Why rows were dropped
    pub drops: DropReport,
}

/// Clean a raw record set.
///
/// Steps: parse timestamps, coerce amounts, normalize strings, drop exact
/// duplicates (first occurrence wins), then order chronologically. Ties keep
/// input order.
pub fn clean(records: &[RawRecord]) -> InputResult<CleanOutput> {
    let mut drops = DropReport {
        input_rows: records.len(),
        ..DropReport::default()
    };

    let mut parsed_timestamps = 0usize;
    let mut seen = HashSet::new();
    let mut transactions = Vec::with_capacity(records.len());

    for (idx, raw) in records.iter().enumerate() {
        let txn_time = parse_timestamp(&raw.txn_time);
        if txn_time.is_some() {
            parsed_timestamps += 1;
        }

        match coerce_row(raw, txn_time) {
            Ok(txn) => {
                if seen.insert(dedup_key(&txn)) {
                    transactions.push(txn);
                } else {
                    drops.record(DataQualityWarning::Duplicate);
                }
            }
            Err(warning) => {
                // +2: header line and 1-based numbering
                log::debug!("Dropping line {}: {}", idx + 2, warning);
                drops.record(warning);
            }
        }
    }

    if !records.is_empty() && parsed_timestamps == 0 {
        let sample = records
            .iter()
            .map(|r| r.txn_time.trim())
            .find(|s| !s.is_empty())
            .unwrap_or("")
            .to_string();
        return Err(MalformedInputError::UnparsableTimestamps {
            column: "txn_time".to_string(),
            sample,
        });
    }

    transactions.sort_by_key(|t| t.txn_time);
    drops.kept_rows = transactions.len();

    Ok(CleanOutput {
        transactions,
        drops,
    })
}

fn coerce_row(
    raw: &RawRecord,
    txn_time: Option<NaiveDateTime>,
) -> Result<Transaction, DataQualityWarning> {
    let account_id = raw.account_id.trim();
    if account_id.is_empty() {
        return Err(DataQualityWarning::MissingAccount);
    }

    let txn_time = txn_time.ok_or(DataQualityWarning::BadTimestamp)?;
    let amount = parse_amount(&raw.amount)?;

    Ok(Transaction {
        account_id: account_id.to_string(),
        txn_time,
        amount,
        txn_type: raw.txn_type.trim().to_string(),
        description: raw.description.trim().to_string(),
        city: normalize_city(&raw.city),
    })
}

type DedupKey = (String, NaiveDateTime, u64, String, String, String);

fn dedup_key(txn: &Transaction) -> DedupKey {
    (
        txn.account_id.clone(),
        txn.txn_time,
        txn.amount.to_bits(),
        txn.txn_type.clone(),
        txn.description.clone(),
        txn.city.clone(),
    )
}

/// Parse a timestamp cell into a timezone-naive datetime.
///
/// Offset-carrying RFC 3339 values keep their wall-clock time.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Coerce an amount cell. Missing, non-numeric, non-finite and negative
/// values are rejected with the matching warning.
pub fn parse_amount(value: &str) -> Result<f64, DataQualityWarning> {
    let value = value.trim();
    if value.is_empty() || NULL_TOKENS.iter().any(|t| value.eq_ignore_ascii_case(t)) {
        return Err(DataQualityWarning::MissingAmount);
    }

    // `1,5` is a decimal comma, not fifteen
    if value.contains(',') && !GROUPED_THOUSANDS.is_match(value) {
        return Err(DataQualityWarning::InvalidAmount);
    }

    let cleaned: String = value.chars().filter(|c| *c != ',' && *c != '_').collect();
    let amount: f64 = cleaned
        .parse()
        .map_err(|_| DataQualityWarning::InvalidAmount)?;

    if !amount.is_finite() {
        return Err(DataQualityWarning::InvalidAmount);
    }
    if amount < 0.0 {
        return Err(DataQualityWarning::NegativeAmount);
    }

    // -0.0 compares equal to 0.0 but would dedup and print differently
    Ok(if amount == 0.0 { 0.0 } else { amount })
}

/// Trim, collapse inner whitespace and title-case a city name.
pub fn normalize_city(value: &str) -> String {
    let collapsed = WHITESPACE.replace_all(value.trim(), " ");
    collapsed
        .split(' ')
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
