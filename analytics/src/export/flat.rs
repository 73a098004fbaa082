//! Flat CSV writer: one file per section.

use std::fs;
use std::path::{Path, PathBuf};

use super::{Section, Sheet};
use crate::error::{ExportError, ExportResult};

/// Write every section of every sheet into `dir`, creating it if needed.
/// Returns the written paths in sheet order.
pub fn write_csv_dir(sheets: &[Sheet], dir: &Path) -> ExportResult<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::new();
    for section in sheets.iter().flat_map(|s| &s.sections) {
        let path = dir.join(&section.file_name);
        write_section(section, &path).map_err(|source| ExportError::Csv {
            path: path.clone(),
            source,
        })?;
        log::debug!("wrote {} ({} rows)", path.display(), section.rows.len());
        written.push(path);
    }
    Ok(written)
}

fn write_section(section: &Section, path: &Path) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&section.headers)?;
    for row in &section.rows {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}
