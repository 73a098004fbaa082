//! Pivot Builder: zero-filled cross-tabulations.
//!
//! Months are keyed by their `YYYY-MM` label, which sorts chronologically.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Add;

use crate::models::{month_label, DerivedTransaction};

/// A dense cross-tabulation. Every (row, column) pair has a cell; pairs
/// absent from the data hold `V::default()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable<V> {
    /// Name of the row dimension, e.g. `month`.
    pub row_label: String,
    /// Name of the column dimension, e.g. `city`.
    pub column_label: String,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    /// `cells[r][c]` for `rows[r]` x `columns[c]`.
    pub cells: Vec<Vec<V>>,
}

impl<V> PivotTable<V>
where
    V: Copy + Default + Add<Output = V>,
{
    /// Cross-tabulate `data`, summing `value` per (row_key, column_key).
    pub fn build<T, FR, FC, FV>(
        data: &[T],
        row_label: &str,
        column_label: &str,
        row_key: FR,
        column_key: FC,
        value: FV,
    ) -> Self
    where
        FR: Fn(&T) -> String,
        FC: Fn(&T) -> String,
        FV: Fn(&T) -> V,
    {
        let mut sums: BTreeMap<(String, String), V> = BTreeMap::new();
        let mut rows = BTreeSet::new();
        let mut columns = BTreeSet::new();

        for item in data {
            let r = row_key(item);
            let c = column_key(item);
            rows.insert(r.clone());
            columns.insert(c.clone());
            let cell = sums.entry((r, c)).or_default();
            *cell = *cell + value(item);
        }

        let rows: Vec<String> = rows.into_iter().collect();
        let columns: Vec<String> = columns.into_iter().collect();
        let cells = rows
            .iter()
            .map(|r| {
                columns
                    .iter()
                    .map(|c| sums.get(&(r.clone(), c.clone())).copied().unwrap_or_default())
                    .collect()
            })
            .collect();

        Self {
            row_label: row_label.to_string(),
            column_label: column_label.to_string(),
            rows,
            columns,
            cells,
        }
    }

    pub fn get(&self, row: &str, column: &str) -> Option<V> {
        let r = self.rows.iter().position(|x| x == row)?;
        let c = self.columns.iter().position(|x| x == column)?;
        Some(self.cells[r][c])
    }

    pub fn row_totals(&self) -> Vec<V> {
        self.cells
            .iter()
            .map(|row| row.iter().fold(V::default(), |acc, v| acc + *v))
            .collect()
    }

    pub fn column_totals(&self) -> Vec<V> {
        (0..self.columns.len())
            .map(|c| self.cells.iter().fold(V::default(), |acc, row| acc + row[c]))
            .collect()
    }

    pub fn grand_total(&self) -> V {
        self.row_totals()
            .into_iter()
            .fold(V::default(), |acc, v| acc + v)
    }
}

/// All pivot outputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTables {
    /// Month x City, summed amount.
    pub month_city: PivotTable<f64>,
    /// Type x Month, summed amount.
    pub type_month_amount: PivotTable<f64>,
    /// Type x Month, transaction count.
    pub type_month_count: PivotTable<usize>,
}

pub fn build_pivots(rows: &[DerivedTransaction]) -> PivotTables {
    let month = |r: &DerivedTransaction| month_label(r.month);
    let city = |r: &DerivedTransaction| r.txn.city.clone();
    let txn_type = |r: &DerivedTransaction| r.txn.txn_type.clone();

    PivotTables {
        month_city: PivotTable::build(rows, "month", "city", month, city, |r| r.amount()),
        type_month_amount: PivotTable::build(
            rows,
            "txn_type",
            "month",
            txn_type,
            month,
            |r| r.amount(),
        ),
        type_month_count: PivotTable::build(rows, "txn_type", "month", txn_type, month, |_| 1usize),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::{row, with_type};

    fn sample() -> Vec<DerivedTransaction> {
        vec![
            with_type(row("a", "2023-01-05 10:00:00", 100.0, "Mumbai", "West"), "UPI"),
            with_type(row("b", "2023-01-09 10:00:00", 40.0, "Pune", "West"), "CARD"),
            with_type(row("a", "2023-02-01 10:00:00", 60.0, "Mumbai", "West"), "UPI"),
            with_type(row("c", "2023-02-11 10:00:00", 5.0, "Mumbai", "West"), "UPI"),
        ]
    }

    #[test]
    fn test_month_city_zero_filled() {
        let p = build_pivots(&sample()).month_city;
        assert_eq!(p.rows, vec!["2023-01", "2023-02"]);
        assert_eq!(p.columns, vec!["Mumbai", "Pune"]);
        assert_eq!(p.get("2023-01", "Mumbai"), Some(100.0));
        assert_eq!(p.get("2023-02", "Mumbai"), Some(65.0));
        assert_eq!(p.get("2023-02", "Pune"), Some(0.0));
        assert_eq!(p.get("2023-03", "Pune"), None);
    }

    #[test]
    fn test_type_month_tables() {
        let pivots = build_pivots(&sample());
        let amount = &pivots.type_month_amount;
        let count = &pivots.type_month_count;

        assert_eq!(amount.rows, vec!["CARD", "UPI"]);
        assert_eq!(amount.columns, vec!["2023-01", "2023-02"]);
        assert_eq!(amount.get("CARD", "2023-02"), Some(0.0));
        assert_eq!(amount.get("UPI", "2023-02"), Some(65.0));
        assert_eq!(count.get("UPI", "2023-02"), Some(2));
        assert_eq!(count.get("CARD", "2023-02"), Some(0));
        assert_eq!(count.rows, amount.rows);
        assert_eq!(count.columns, amount.columns);
    }

    #[test]
    fn test_totals() {
        let pivots = build_pivots(&sample());
        let p = &pivots.month_city;
        assert_eq!(p.row_totals(), vec![140.0, 65.0]);
        assert_eq!(p.column_totals(), vec![165.0, 40.0]);
        assert_eq!(p.grand_total(), 205.0);
        assert_eq!(pivots.type_month_count.grand_total(), 4);
    }
}
