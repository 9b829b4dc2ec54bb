use std::collections::HashMap;

use indexmap::IndexMap;

use crate::model::{cell, JoinOutput, Row, SectorDataset};
use crate::value::{to_number, CellValue};

/// Left-join every ready sector onto the template, producing the PiN and
/// Severity tables.
///
/// One output row per distinct template key. Duplicate template keys are
/// last-write-wins: the row keeps the position of the key's first occurrence
/// and the contents of its last. Duplicate sector keys are last-write-wins too.
/// Template keys without a sector row get `Null`; a sector cell that fails
/// numeric coercion becomes `NotANumber`.
pub fn join(
    template_rows: &[Row],
    template_join_column: &str,
    ready_sectors: &[&SectorDataset],
) -> JoinOutput {
    let mut pin_out: IndexMap<String, Row> = IndexMap::new();
    let mut severity_out: IndexMap<String, Row> = IndexMap::new();

    for row in template_rows {
        let key = cell(row, template_join_column).key_string();
        pin_out.insert(key.clone(), row.clone());
        severity_out.insert(key, row.clone());
    }

    for sector in ready_sectors {
        let Some(join_column) = sector.join_column.as_deref() else {
            continue;
        };

        let lookup: HashMap<String, &Row> = sector
            .rows
            .iter()
            .map(|row| (cell(row, join_column).key_string(), row))
            .collect();

        let pin_name = sector.pin_column_name();
        let severity_name = sector.severity_column_name();

        for (key, pin_row) in pin_out.iter_mut() {
            let (pin_value, severity_value) = match lookup.get(key) {
                Some(sector_row) => (
                    coerce_selected(sector_row, sector.pin_column.as_deref()),
                    coerce_selected(sector_row, sector.severity_column.as_deref()),
                ),
                None => (CellValue::Null, CellValue::Null),
            };

            pin_row.insert(pin_name.clone(), pin_value);
            if let Some(severity_row) = severity_out.get_mut(key) {
                severity_row.insert(severity_name.clone(), severity_value);
            }
        }
    }

    log::debug!(
        "joined {} template row(s) into {} key(s) across {} sector(s)",
        template_rows.len(),
        pin_out.len(),
        ready_sectors.len()
    );

    JoinOutput {
        pin: pin_out.into_values().collect(),
        severity: severity_out.into_values().collect(),
    }
}

/// Numeric value of the selected column; an unset selection reads as missing.
fn coerce_selected(row: &Row, column: Option<&str>) -> CellValue {
    let n = column.map(|c| to_number(cell(row, c))).unwrap_or(f64::NAN);
    CellValue::from_f64(n)
}
