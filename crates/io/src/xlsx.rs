// Excel file import (xlsx, xls, xlsb, ods) and export (xlsx only)
//
// Import reads the first sheet as a header row plus records.
// Export writes one worksheet per table with typed cells.

use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use jaws_merge::{CellValue, Row};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};

use crate::csv::union_columns;

/// Read the first sheet of a workbook into header-keyed rows.
pub fn read_rows(path: &Path) -> Result<Vec<Row>, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| "Excel file contains no sheets".to_string())?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    let mut iter = range.rows();
    let Some(header_cells) = iter.next() else {
        return Ok(Vec::new());
    };
    let headers = header_names(header_cells);

    let mut rows = Vec::new();
    for cells in iter {
        let row: Row = headers
            .iter()
            .zip(cells.iter())
            .filter_map(|(name, data)| convert_cell(data).map(|v| (name.clone(), v)))
            .collect();
        if !row.is_empty() {
            rows.push(row);
        }
    }

    log::debug!("read {} row(s) from sheet '{}'", rows.len(), sheet_name);
    Ok(rows)
}

/// Header text per column. Blank headers become `__EMPTY`, `__EMPTY_1`, …;
/// repeated names get a `_<n>` suffix.
fn header_names(cells: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    cells
        .iter()
        .map(|cell| {
            let base = match cell {
                Data::Empty => "__EMPTY".to_string(),
                Data::String(s) if s.is_empty() => "__EMPTY".to_string(),
                other => convert_cell(other)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "__EMPTY".to_string()),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{base}_{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

/// Typed cell value; `None` for blank cells.
fn convert_cell(cell: &Data) -> Option<CellValue> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(CellValue::Text(s.clone())),
        Data::Float(n) => Some(CellValue::from_f64(*n)),
        Data::Int(n) => Some(CellValue::Number(*n as f64)),
        Data::Bool(b) => Some(CellValue::Bool(*b)),
        Data::Error(e) => Some(CellValue::Text(format!("#{:?}", e))),
        // Serial day number, 1900 date system
        Data::DateTime(dt) => Some(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => Some(CellValue::Text(s.clone())),
        Data::DurationIso(s) => Some(CellValue::Text(s.clone())),
    }
}

/// Write each `(sheet name, rows)` pair as its own worksheet.
pub fn write_xlsx(path: &Path, sheets: &[(&str, &[Row])]) -> Result<(), String> {
    let mut xlsx_workbook = XlsxWorkbook::new();
    let header_format = Format::new().set_bold();

    for (name, rows) in sheets {
        let worksheet = xlsx_workbook
            .add_worksheet()
            .set_name(*name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", name, e))?;
        write_sheet(worksheet, rows, &header_format)?;
    }

    xlsx_workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;
    Ok(())
}

fn write_sheet(worksheet: &mut Worksheet, rows: &[Row], header_format: &Format) -> Result<(), String> {
    let columns = union_columns(rows);

    for (col, name) in columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *name, header_format)
            .map_err(|e| format!("Failed to write header: {}", e))?;
    }

    for (row_idx, row) in rows.iter().enumerate() {
        let r = (row_idx + 1) as u32;
        for (col, name) in columns.iter().enumerate() {
            let c = col as u16;
            let result = match row.get(*name) {
                None | Some(CellValue::Null) | Some(CellValue::Empty) => continue,
                Some(CellValue::Number(n)) => worksheet.write_number(r, c, *n),
                Some(CellValue::Bool(b)) => worksheet.write_boolean(r, c, *b),
                Some(CellValue::Text(s)) => worksheet.write_string(r, c, s),
                Some(other) => worksheet.write_string(r, c, other.key_string()),
            };
            result.map_err(|e| format!("Failed to write cell ({}, {}): {}", r, c, e))?;
        }
    }
    Ok(())
}
