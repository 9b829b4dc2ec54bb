//! Column metadata for the merged tables: category, display format and
//! whether a column may be edited by hand.

use serde::Serialize;

use crate::analytics::{
    DIFF_SECOND, DIFF_THIRD, FLAG_SECOND, FLAG_THIRD, PCT_DIFF_SECOND, PCT_DIFF_THIRD,
    RANK_LABELS, ROW_FLAGGED, TOTAL_FLAGGED,
};
use crate::model::{Row, PIN_PREFIX, SEVERITY_PREFIX};
use crate::value::{format_number, round_half_up, to_number, CellValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnCategory {
    Template,
    Sector,
    Calculated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnFormat {
    /// Whole number with thousands separators.
    Number,
    /// Two decimals and a `%` suffix.
    Percent,
    /// `"Flagged"` when true, blank otherwise.
    Flag,
    Text,
    Raw,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub header: String,
    pub category: ColumnCategory,
    pub calculated: bool,
    pub format: ColumnFormat,
    pub editable: bool,
}

pub fn is_calculated(name: &str) -> bool {
    name.ends_with("_%")
        || RANK_LABELS.iter().any(|label| name.starts_with(label))
        || name.contains("Difference")
        || name == TOTAL_FLAGGED
        || name == ROW_FLAGGED
}

pub fn categorize(name: &str) -> ColumnCategory {
    if name.starts_with(PIN_PREFIX) || name.starts_with(SEVERITY_PREFIX) {
        ColumnCategory::Sector
    } else if name.contains("Highest")
        || name.contains("Difference")
        || name == TOTAL_FLAGGED
        || name == ROW_FLAGGED
    {
        ColumnCategory::Calculated
    } else {
        ColumnCategory::Template
    }
}

pub fn column_format(name: &str, population_column: &str) -> ColumnFormat {
    if name.ends_with("PiN Sector") {
        return ColumnFormat::Text;
    }
    if name == FLAG_SECOND || name == FLAG_THIRD || name == ROW_FLAGGED {
        return ColumnFormat::Flag;
    }
    if name == population_column
        || (name.starts_with(PIN_PREFIX) && !name.contains('%'))
        || name == DIFF_SECOND
        || name == DIFF_THIRD
        || name == TOTAL_FLAGGED
    {
        return ColumnFormat::Number;
    }
    if name.ends_with("_%")
        || name.ends_with("PiN %")
        || (name.starts_with(PIN_PREFIX) && name.contains('%'))
        || name == PCT_DIFF_SECOND
        || name == PCT_DIFF_THIRD
    {
        return ColumnFormat::Percent;
    }
    ColumnFormat::Raw
}

/// Metadata for every column of the first row, in column order.
///
/// Empty tables have no columns.
pub fn describe_columns(
    rows: &[Row],
    join_column: Option<&str>,
    population_column: &str,
) -> Vec<ColumnInfo> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };

    first
        .keys()
        .map(|name| {
            let calculated = is_calculated(name);
            ColumnInfo {
                name: name.clone(),
                header: name.trim().to_string(),
                category: categorize(name),
                calculated,
                format: column_format(name, population_column),
                editable: !calculated && Some(name.as_str()) != join_column,
            }
        })
        .collect()
}

/// Display text for a cell under the given format.
pub fn format_cell(format: ColumnFormat, value: &CellValue) -> String {
    if matches!(value, CellValue::Null | CellValue::Empty) {
        return String::new();
    }
    match format {
        ColumnFormat::Flag => {
            if value.as_bool() == Some(true) {
                "Flagged".to_string()
            } else {
                String::new()
            }
        }
        ColumnFormat::Number => group_thousands(round_half_up(to_number(value))),
        ColumnFormat::Percent => {
            let n = to_number(value);
            if n.is_nan() {
                String::new()
            } else if n.is_infinite() {
                format!("{}%", format_number(n))
            } else {
                format!("{n:.2}%")
            }
        }
        ColumnFormat::Text | ColumnFormat::Raw => value.to_string(),
    }
}

/// Integer with `,` every three digits; non-finite values print as-is.
fn group_thousands(n: f64) -> String {
    if !n.is_finite() || n.abs() >= 1e21 {
        return format_number(n);
    }
    let digits = format!("{:.0}", n.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if n < 0.0 && grouped != "0" {
        format!("-{grouped}")
    } else {
        grouped
    }
}
