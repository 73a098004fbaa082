//! Row-level transformation stages.
//!
//! - Cleaner: raw rows to canonical transactions
//! - Features: calendar, night/high-value flags and region per row

pub mod cleaner;
pub mod features;

pub use cleaner::{clean, normalize_city, parse_amount, parse_timestamp, CleanOutput};
pub use features::{FeatureDeriver, RegionMap};
