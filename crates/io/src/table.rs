// Extension-dispatched table loading

use std::path::Path;

use jaws_merge::{AuditSink, Row};
use serde::Serialize;

/// Rows read from one uploaded file.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedTable {
    pub file_name: String,
    pub rows: Vec<Row>,
}

impl LoadedTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Columns of the first row.
    pub fn column_count(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    /// Column names of the first row.
    pub fn columns(&self) -> Vec<&str> {
        self.rows
            .first()
            .map(|r| r.keys().map(|k| k.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn record_template_upload(&self, audit: &mut dyn AuditSink) {
        audit.record(format!(
            "Template file uploaded: {} ({} rows, {} columns)",
            self.file_name,
            self.row_count(),
            self.column_count()
        ));
    }

    pub fn record_sector_upload(&self, sector: &str, audit: &mut dyn AuditSink) {
        audit.record(format!(
            "File uploaded for {}: {} ({} rows, {} columns)",
            sector,
            self.file_name,
            self.row_count(),
            self.column_count()
        ));
    }
}

/// Load a CSV/TSV or spreadsheet file, picking the reader by extension.
pub fn load_rows(path: &Path) -> Result<Vec<Row>, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" | "tsv" => crate::csv::read_rows(path),
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => crate::xlsx::read_rows(path),
        "" => Err(format!("{}: missing file extension", path.display())),
        other => Err(format!("{}: unsupported file type '.{}'", path.display(), other)),
    }
}

pub fn load_table(path: &Path) -> Result<LoadedTable, String> {
    let rows = load_rows(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    log::info!("loaded {} ({} rows)", file_name, rows.len());
    Ok(LoadedTable { file_name, rows })
}
