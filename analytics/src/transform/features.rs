//! Feature Deriver: row-wise calendar and classification features.
//!
//! Pure and deterministic. No aggregation happens here.

use chrono::{Datelike, Timelike, Weekday};
use std::collections::BTreeMap;

use super::cleaner::normalize_city;
use crate::config::ReportOptions;
use crate::models::{month_start, DerivedTransaction, Transaction, UNKNOWN_REGION};

/// City -> region lookup injected from configuration.
///
/// Keys are normalized like the cleaner normalizes cities, so lookups are
/// insensitive to case and whitespace.
#[derive(Debug, Clone, Default)]
pub struct RegionMap {
    regions: BTreeMap<String, String>,
}

impl RegionMap {
    pub fn new<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let regions = entries
            .into_iter()
            .map(|(city, region)| (normalize_city(city), region.trim().to_string()))
            .collect();
        Self { regions }
    }

    /// Region for a normalized city name, `"Unknown"` when unmapped.
    pub fn region_for(&self, city: &str) -> &str {
        self.regions
            .get(city)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_REGION)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Derives features with the configured thresholds.
#[derive(Debug, Clone)]
pub struct FeatureDeriver {
    pub night_start_hour: u32,
    pub night_end_hour: u32,
    pub high_value_threshold: f64,
    pub regions: RegionMap,
}

impl FeatureDeriver {
    pub fn from_options(options: &ReportOptions) -> Self {
        Self {
            night_start_hour: options.night_start_hour,
            night_end_hour: options.night_end_hour,
            high_value_threshold: options.high_value_threshold,
            regions: RegionMap::new(&options.city_to_region_map),
        }
    }

    /// Night-time is strictly before the start hour or strictly after the end hour.
    pub fn is_night(&self, hour: u32) -> bool {
        hour < self.night_start_hour || hour > self.night_end_hour
    }

    pub fn is_high_value(&self, amount: f64) -> bool {
        amount > self.high_value_threshold
    }

    pub fn derive(&self, txn: &Transaction) -> DerivedTransaction {
        let hour = txn.txn_time.hour();
        let date = txn.txn_time.date();
        let weekday = date.weekday();

        DerivedTransaction {
            hour,
            month: month_start(date),
            weekday: weekday.num_days_from_monday(),
            weekday_name: weekday_name(weekday).to_string(),
            is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
            is_night: self.is_night(hour),
            is_high_value: self.is_high_value(txn.amount),
            region: self.regions.region_for(&txn.city).to_string(),
            txn: txn.clone(),
        }
    }

    pub fn derive_all(&self, transactions: &[Transaction]) -> Vec<DerivedTransaction> {
        transactions.iter().map(|t| self.derive(t)).collect()
    }
}

impl Default for FeatureDeriver {
    fn default() -> Self {
        Self::from_options(&ReportOptions::default())
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
