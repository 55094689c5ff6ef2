use crate::error::{AttendanceError, Result};
use crate::reports::ReportTable;
use std::path::Path;

fn open_writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            AttendanceError::Export(format!(
                "cannot create directory {}: {}",
                parent.to_string_lossy(),
                e
            ))
        })?;
    }

    // The usual cause is a spreadsheet program holding the file open.
    csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| {
            AttendanceError::Export(format!(
                "cannot write {} ({}); close the file and retry",
                path.to_string_lossy(),
                e
            ))
        })
}

/// Writes one report table as CSV: headers, optional second header line,
/// then the rows.
pub fn write_csv(table: &ReportTable, path: &Path) -> Result<()> {
    let mut wtr = open_writer(path)?;

    let io_err = |e: csv::Error| AttendanceError::Export(e.to_string());
    wtr.write_record(&table.headers).map_err(io_err)?;
    if !table.sub_headers.is_empty() {
        wtr.write_record(&table.sub_headers).map_err(io_err)?;
    }
    for row in &table.rows {
        wtr.write_record(row).map_err(io_err)?;
    }
    wtr.flush()
        .map_err(|e| AttendanceError::Export(e.to_string()))?;

    log::info!(
        "exported {} ({} rows) to {}",
        table.title,
        table.rows.len(),
        path.to_string_lossy()
    );
    Ok(())
}

/// Several tables in one file, each preceded by its title line and followed
/// by a blank line. Used for the twelve monthly matrices.
pub fn write_csv_sections(tables: &[ReportTable], path: &Path) -> Result<()> {
    let mut wtr = open_writer(path)?;
    let io_err = |e: csv::Error| AttendanceError::Export(e.to_string());
    for table in tables {
        wtr.write_record([table.title.as_str()]).map_err(io_err)?;
        wtr.write_record(&table.headers).map_err(io_err)?;
        if !table.sub_headers.is_empty() {
            wtr.write_record(&table.sub_headers).map_err(io_err)?;
        }
        for row in &table.rows {
            wtr.write_record(row).map_err(io_err)?;
        }
        wtr.write_record([""]).map_err(io_err)?;
    }
    wtr.flush()
        .map_err(|e| AttendanceError::Export(e.to_string()))?;
    Ok(())
}
