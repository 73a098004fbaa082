//! KPI Aggregator: overall, monthly, city and region rollups.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::DerivedTransaction;

/// Single-row dataset summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverallKpis {
    pub total_txns: usize,
    pub total_amount: f64,
    pub median_amount: f64,
    pub mean_amount: f64,
    /// Night transactions as a percentage of all transactions.
    pub pct_night: f64,
    /// High-value transactions as a percentage of all transactions.
    pub pct_high_value: f64,
}

/// One row per observed month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRow {
    pub month: NaiveDate,
    pub txn_count: usize,
    pub gmv: f64,
    pub night_count: usize,
    pub high_value_count: usize,
}

/// Performance of one (city, region) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityPerf {
    pub city: String,
    pub region: String,
    pub txn_count: usize,
    pub total_amount: f64,
    pub mean_amount: f64,
    pub night_count: usize,
    pub high_value_count: usize,
}

/// Performance of one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionPerf {
    pub region: String,
    pub txn_count: usize,
    pub total_amount: f64,
    pub mean_amount: f64,
    pub night_count: usize,
    pub high_value_count: usize,
}

/// All aggregator outputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiTables {
    pub overall: OverallKpis,
    pub monthly: Vec<MonthlyRow>,
    pub city_perf: Vec<CityPerf>,
    pub region_perf: Vec<RegionPerf>,
}

/// Running counters for one group.
#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    count: usize,
    amount: f64,
    night: usize,
    high: usize,
}

impl Tally {
    fn add(&mut self, row: &DerivedTransaction) {
        self.count += 1;
        self.amount += row.amount();
        self.night += usize::from(row.is_night);
        self.high += usize::from(row.is_high_value);
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.amount / self.count as f64
        }
    }
}

pub fn aggregate(rows: &[DerivedTransaction]) -> KpiTables {
    KpiTables {
        overall: overall(rows),
        monthly: monthly(rows),
        city_perf: city_perf(rows),
        region_perf: region_perf(rows),
    }
}

pub fn overall(rows: &[DerivedTransaction]) -> OverallKpis {
    if rows.is_empty() {
        return OverallKpis::default();
    }

    let mut tally = Tally::default();
    rows.iter().for_each(|r| tally.add(r));

    let mut amounts: Vec<f64> = rows.iter().map(DerivedTransaction::amount).collect();
    let total = tally.count as f64;

    OverallKpis {
        total_txns: tally.count,
        total_amount: tally.amount,
        median_amount: median(&mut amounts),
        mean_amount: tally.mean(),
        pct_night: tally.night as f64 / total * 100.0,
        pct_high_value: tally.high as f64 / total * 100.0,
    }
}

pub fn monthly(rows: &[DerivedTransaction]) -> Vec<MonthlyRow> {
    let mut months: BTreeMap<NaiveDate, Tally> = BTreeMap::new();
    for row in rows {
        months.entry(row.month).or_default().add(row);
    }

    months
        .into_iter()
        .map(|(month, t)| MonthlyRow {
            month,
            txn_count: t.count,
            gmv: t.amount,
            night_count: t.night,
            high_value_count: t.high,
        })
        .collect()
}

/// Ordered by total amount descending, ties by city then region ascending.
pub fn city_perf(rows: &[DerivedTransaction]) -> Vec<CityPerf> {
    let mut cities: BTreeMap<(&str, &str), Tally> = BTreeMap::new();
    for row in rows {
        cities
            .entry((row.txn.city.as_str(), row.region.as_str()))
            .or_default()
            .add(row);
    }

    let mut perf: Vec<CityPerf> = cities
        .into_iter()
        .map(|((city, region), t)| CityPerf {
            city: city.to_string(),
            region: region.to_string(),
            txn_count: t.count,
            total_amount: t.amount,
            mean_amount: t.mean(),
            night_count: t.night,
            high_value_count: t.high,
        })
        .collect();

    perf.sort_by(|a, b| {
        b.total_amount
            .total_cmp(&a.total_amount)
            .then_with(|| a.city.cmp(&b.city))
            .then_with(|| a.region.cmp(&b.region))
    });
    perf
}

/// Ordered by total amount descending, ties by region ascending.
pub fn region_perf(rows: &[DerivedTransaction]) -> Vec<RegionPerf> {
    let mut regions: BTreeMap<&str, Tally> = BTreeMap::new();
    for row in rows {
        regions.entry(row.region.as_str()).or_default().add(row);
    }

    let mut perf: Vec<RegionPerf> = regions
        .into_iter()
        .map(|(region, t)| RegionPerf {
            region: region.to_string(),
            txn_count: t.count,
            total_amount: t.amount,
            mean_amount: t.mean(),
            night_count: t.night,
            high_value_count: t.high,
        })
        .collect();

    perf.sort_by(|a, b| {
        b.total_amount
            .total_cmp(&a.total_amount)
            .then_with(|| a.region.cmp(&b.region))
    });
    perf
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
