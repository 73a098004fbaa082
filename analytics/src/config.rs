//! Report options.
//!
//! Every field is optional in the JSON config file; missing fields take the
//! defaults below. CLI flags are applied on top by the binary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

pub const DEFAULT_NIGHT_START_HOUR: u32 = 6;
pub const DEFAULT_NIGHT_END_HOUR: u32 = 22;
pub const DEFAULT_HIGH_VALUE_THRESHOLD: f64 = 200_000.0;

/// Options recognized by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportOptions {
    /// Hours strictly before this are night-time.
    pub night_start_hour: u32,

    /// Hours strictly after this are night-time.
    pub night_end_hour: u32,

    /// Amounts strictly above this are high-value.
    pub high_value_threshold: f64,

    /// City -> region lookup. Cities absent here land in "Unknown".
    pub city_to_region_map: BTreeMap<String, String>,

    /// RFM reference date. Derived from the data when absent.
    pub reference_date: Option<NaiveDate>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            night_start_hour: DEFAULT_NIGHT_START_HOUR,
            night_end_hour: DEFAULT_NIGHT_END_HOUR,
            high_value_threshold: DEFAULT_HIGH_VALUE_THRESHOLD,
            city_to_region_map: BTreeMap::new(),
            reference_date: None,
        }
    }
}

impl ReportOptions {
    /// Parse options from a JSON document and validate them.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.night_start_hour > 23 {
            return Err(ConfigError::HourOutOfRange {
                option: "night_start_hour",
                value: self.night_start_hour,
            });
        }
        if self.night_end_hour > 23 {
            return Err(ConfigError::HourOutOfRange {
                option: "night_end_hour",
                value: self.night_end_hour,
            });
        }
        if !self.high_value_threshold.is_finite() || self.high_value_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.high_value_threshold));
        }
        Ok(())
    }
}

/// Example configuration printed by `ledgerlens example-config`.
pub fn example_config() -> ReportOptions {
    let regions = [
        ("Mumbai", "West"),
        ("Pune", "West"),
        ("Ahmedabad", "West"),
        ("Delhi", "North"),
        ("Jaipur", "North"),
        ("Bengaluru", "South"),
        ("Hyderabad", "South"),
        ("Chennai", "South"),
        ("Kolkata", "East"),
    ];

    ReportOptions {
        city_to_region_map: regions
            .iter()
            .map(|(city, region)| (city.to_string(), region.to_string()))
            .collect(),
        ..ReportOptions::default()
    }
}
