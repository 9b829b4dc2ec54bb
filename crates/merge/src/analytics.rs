//! Per-record ranking and threshold flags over the joined PiN table.
//!
//! Every record is analyzed on its own; nothing carries over between rows, so
//! the output order is exactly the input order.

use std::cmp::Ordering;

use crate::config::MergeConfig;
use crate::model::{cell, Row, PIN_PREFIX};
use crate::value::{round_half_up, to_number, to_rankable_number, CellValue};

/// Rank labels, highest first.
pub const RANK_LABELS: [&str; 3] = ["Highest", "Second Highest", "Third Highest"];

pub const DIFF_SECOND: &str = "Difference Highest and 2nd Highest";
pub const PCT_DIFF_SECOND: &str = "% Difference Highest and 2nd Highest";
pub const FLAG_SECOND: &str = "Difference over threshold";
pub const DIFF_THIRD: &str = "Difference Highest and 3rd Highest";
pub const PCT_DIFF_THIRD: &str = "% Difference Highest and 3rd Highest";
pub const FLAG_THIRD: &str = "Difference over threshold 3rd";
pub const TOTAL_FLAGGED: &str = "Total Flagged";
pub const ROW_FLAGGED: &str = "Row Flagged";

/// `"<label> PiN"`, `"<label> PiN Sector"`, `"<label> PiN %"`.
pub fn rank_columns(label: &str) -> [String; 3] {
    [
        format!("{label} PiN"),
        format!("{label} PiN Sector"),
        format!("{label} PiN %"),
    ]
}

/// Percentage column for a `PiN_<sector>` column.
pub fn percentage_column(pin_column: &str) -> String {
    format!("{pin_column}_%")
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Relative gap between the top value and a lower-ranked one, in percent.
///
/// A zero lower value has no finite answer; it is tagged instead of being
/// carried as a bare float infinity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentDiff {
    Finite(f64),
    Infinite { negative: bool },
    /// 0/0 and similar.
    Undefined,
}

impl PercentDiff {
    /// `(top - lower) / lower * 100`, unguarded.
    pub fn between(top: f64, lower: f64) -> Self {
        let raw = (top - lower) / lower * 100.0;
        if raw.is_nan() {
            Self::Undefined
        } else if raw.is_infinite() {
            Self::Infinite { negative: raw < 0.0 }
        } else {
            Self::Finite(raw)
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Self::Finite(v) => v,
            Self::Infinite { negative: false } => f64::INFINITY,
            Self::Infinite { negative: true } => f64::NEG_INFINITY,
            Self::Undefined => f64::NAN,
        }
    }

    /// Strictly greater than `threshold`; `Undefined` never exceeds.
    pub fn exceeds(self, threshold: f64) -> bool {
        self.as_f64() > threshold
    }
}

impl From<PercentDiff> for CellValue {
    fn from(diff: PercentDiff) -> Self {
        match diff {
            PercentDiff::Finite(v) => CellValue::Number(v),
            PercentDiff::Infinite { negative } => CellValue::Infinite { negative },
            PercentDiff::Undefined => CellValue::NotANumber,
        }
    }
}

/// One entry of a record's sector ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSector {
    pub sector: String,
    pub value: f64,
    /// The sector's `_%` cell (may be `Null`).
    pub percentage: CellValue,
}

/// Comparison of the top-ranked sector against a lower rank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankGap {
    pub difference: f64,
    pub percent: PercentDiff,
    pub flagged: bool,
}

impl RankGap {
    fn between(top: &RankedSector, lower: &RankedSector, threshold: f64) -> Self {
        let percent = PercentDiff::between(top.value, lower.value);
        Self {
            difference: round_half_up(top.value - lower.value),
            percent,
            flagged: percent.exceeds(threshold),
        }
    }
}

/// Everything derived for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordAnalytics {
    /// `(percentage column, value)` in PiN column order.
    pub percentages: Vec<(String, CellValue)>,
    /// Rankable sectors, highest first; ties keep column order.
    pub ranking: Vec<RankedSector>,
    pub second: Option<RankGap>,
    pub third: Option<RankGap>,
}

impl RecordAnalytics {
    pub fn total_flagged(&self) -> u32 {
        [self.second, self.third]
            .iter()
            .filter(|gap| gap.map(|g| g.flagged).unwrap_or(false))
            .count() as u32
    }

    pub fn row_flagged(&self) -> bool {
        self.total_flagged() > 0
    }

    /// Append (or overwrite) the derived columns on `row`.
    pub fn write_into(&self, row: &mut Row) {
        for (column, value) in &self.percentages {
            row.insert(column.clone(), value.clone());
        }

        for (index, label) in RANK_LABELS.iter().enumerate() {
            let [value_col, sector_col, pct_col] = rank_columns(label);
            match self.ranking.get(index) {
                Some(ranked) => {
                    row.insert(value_col, CellValue::from_f64(round_half_up(ranked.value)));
                    row.insert(sector_col, CellValue::Text(ranked.sector.clone()));
                    row.insert(pct_col, ranked.percentage.clone());
                }
                None => {
                    row.insert(value_col, CellValue::Null);
                    row.insert(sector_col, CellValue::Text(String::new()));
                    row.insert(pct_col, CellValue::Null);
                }
            }
        }

        write_gap(row, self.second, DIFF_SECOND, PCT_DIFF_SECOND, FLAG_SECOND);
        write_gap(row, self.third, DIFF_THIRD, PCT_DIFF_THIRD, FLAG_THIRD);

        row.insert(TOTAL_FLAGGED.to_string(), CellValue::Number(self.total_flagged() as f64));
        row.insert(ROW_FLAGGED.to_string(), CellValue::Bool(self.row_flagged()));
    }
}

fn write_gap(row: &mut Row, gap: Option<RankGap>, diff_col: &str, pct_col: &str, flag_col: &str) {
    match gap {
        Some(gap) => {
            row.insert(diff_col.to_string(), CellValue::from_f64(gap.difference));
            row.insert(pct_col.to_string(), gap.percent.into());
            row.insert(flag_col.to_string(), CellValue::Bool(gap.flagged));
        }
        None => {
            row.insert(diff_col.to_string(), CellValue::Null);
            row.insert(pct_col.to_string(), CellValue::Null);
            row.insert(flag_col.to_string(), CellValue::Null);
        }
    }
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Derive percentages, ranking and flags for one joined PiN record.
pub fn compute(record: &Row, config: &MergeConfig) -> RecordAnalytics {
    let population = to_number(cell(record, &config.population_column));

    let pin_columns: Vec<&String> = record.keys().filter(|k| k.starts_with(PIN_PREFIX)).collect();

    let mut percentages = Vec::with_capacity(pin_columns.len());
    let mut ranking = Vec::with_capacity(pin_columns.len());

    for column in pin_columns {
        let value = &record[column.as_str()];
        let pin = to_number(value);

        let percentage = if !pin.is_nan() && !population.is_nan() && population != 0.0 {
            CellValue::from_f64(pin / population * 100.0)
        } else {
            CellValue::Null
        };

        if let Some(rank_value) = to_rankable_number(value) {
            ranking.push(RankedSector {
                sector: column.strip_prefix(PIN_PREFIX).unwrap_or(column).to_string(),
                value: rank_value,
                percentage: percentage.clone(),
            });
        }

        percentages.push((percentage_column(column), percentage));
    }

    // Vec::sort_by is stable: equal values keep sector registration order.
    ranking.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));

    let thresholds = &config.thresholds;
    let second = match (ranking.first(), ranking.get(1)) {
        (Some(top), Some(lower)) => Some(RankGap::between(top, lower, thresholds.second)),
        _ => None,
    };
    let third = match (ranking.first(), ranking.get(2)) {
        (Some(top), Some(lower)) => Some(RankGap::between(top, lower, thresholds.third)),
        _ => None,
    };

    RecordAnalytics {
        percentages,
        ranking,
        second,
        third,
    }
}

/// The joined record with all derived columns appended.
pub fn analyze_record(record: &Row, config: &MergeConfig) -> Row {
    let mut enhanced = record.clone();
    compute(record, config).write_into(&mut enhanced);
    enhanced
}

/// Analyze every record, preserving order.
pub fn analyze(records: &[Row], config: &MergeConfig) -> Vec<Row> {
    records.iter().map(|r| analyze_record(r, config)).collect()
}
