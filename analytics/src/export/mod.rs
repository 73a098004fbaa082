//! Exporter: workbook and flat-file output.
//!
//! Every derived table is first rendered into a [`Sheet`] made of
//! [`Section`]s. The workbook writer lays sections out one under another;
//! the CSV writer emits one file per section. Both read the same headers
//! and cells, so the two outputs always share a schema.

pub mod flat;
pub mod sheets;
pub mod xlsx;

use std::fmt;

pub use flat::write_csv_dir;
pub use sheets::report_sheets;
pub use xlsx::write_workbook;

/// Sheet names, in workbook order.
pub const SHEET_ORDER: [&str; 6] = ["overall", "monthly", "city_perf", "pivots", "RFM", "cohort"];

/// A single typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    /// A fraction in [0, 1], shown with three decimals.
    Ratio(f64),
    Integer(i64),
    Bool(bool),
    Empty,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Ratio(r) => write!(f, "{r:.3}"),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Empty => Ok(()),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        Cell::Integer(n as i64)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Integer(n)
    }
}

impl From<u8> for Cell {
    fn from(n: u8) -> Self {
        Cell::Integer(i64::from(n))
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Bool(b)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Empty)
    }
}

/// One rectangular table.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Heading written above the table in the workbook.
    pub title: Option<String>,
    /// Flat-file name for this table.
    pub file_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Section {
    pub fn new(file_name: &str, headers: &[&str]) -> Self {
        Self {
            title: None,
            file_name: file_name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }
}

/// A workbook sheet holding one or more sections.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub sections: Vec<Section>,
}

impl Sheet {
    pub fn new(name: &str, sections: Vec<Section>) -> Self {
        Self {
            name: name.to_string(),
            sections,
        }
    }
}
