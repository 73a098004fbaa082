//! Workbook writer.
//!
//! Sections on one sheet are stacked vertically with a blank row between
//! them. Titles and headers are bold, ratios show three decimals.
//!
//! The document creation time is pinned to a caller-supplied date so that
//! identical reports produce identical files.

use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Format, Workbook, Worksheet, XlsxError};
use std::path::Path;

use super::{Cell, Section, Sheet};
use crate::error::{ExportError, ExportResult};

/// Creation date stamped when the report has no reference date.
const FALLBACK_CREATED: (u16, u8, u8) = (2000, 1, 1);

/// Write `sheets` to a single `.xlsx` file, one worksheet each, in order.
///
/// `created` becomes the document creation time (midnight).
pub fn write_workbook(sheets: &[Sheet], path: &Path, created: Option<NaiveDate>) -> ExportResult<()> {
    build_and_save(sheets, path, created).map_err(|source| ExportError::Xlsx {
        path: path.to_path_buf(),
        source,
    })
}

struct Formats {
    bold: Format,
    ratio: Format,
}

fn build_and_save(sheets: &[Sheet], path: &Path, created: Option<NaiveDate>) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let properties = DocProperties::new().set_creation_datetime(&creation_time(created)?);
    workbook.set_properties(&properties);

    let formats = Formats {
        bold: Format::new().set_bold(),
        ratio: Format::new().set_num_format("0.000"),
    };

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        let mut row: u32 = 0;
        for section in &sheet.sections {
            if row > 0 {
                row += 1;
            }
            row = write_section(worksheet, section, row, &formats)?;
        }
    }

    workbook.save(path)
}

fn creation_time(created: Option<NaiveDate>) -> Result<ExcelDateTime, XlsxError> {
    let (year, month, day) = match created {
        Some(d) if (1900..=9999).contains(&d.year()) => (d.year() as u16, d.month() as u8, d.day() as u8),
        _ => FALLBACK_CREATED,
    };
    ExcelDateTime::from_ymd(year, month, day)
}

/// Write one section starting at `row`; returns the next free row.
fn write_section(
    worksheet: &mut Worksheet,
    section: &Section,
    mut row: u32,
    formats: &Formats,
) -> Result<u32, XlsxError> {
    let bold = &formats.bold;
    if let Some(title) = &section.title {
        worksheet.write_string_with_format(row, 0, title, bold)?;
        row += 1;
    }

    for (col, header) in section.headers.iter().enumerate() {
        worksheet.write_string_with_format(row, col as u16, header, bold)?;
    }
    row += 1;

    for cells in &section.rows {
        for (col, cell) in cells.iter().enumerate() {
            write_cell(worksheet, row, col as u16, cell, &formats.ratio)?;
        }
        row += 1;
    }

    Ok(row)
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    ratio: &Format,
) -> Result<(), XlsxError> {
    match cell {
        Cell::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
        Cell::Number(n) => {
            worksheet.write_number(row, col, *n)?;
        }
        Cell::Ratio(r) => {
            worksheet.write_number_with_format(row, col, *r, ratio)?;
        }
        Cell::Integer(i) => {
            worksheet.write_number(row, col, *i as f64)?;
        }
        Cell::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        Cell::Empty => {}
    }
    Ok(())
}
