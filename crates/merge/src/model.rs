use indexmap::IndexMap;
use serde::Serialize;

use crate::columns::ColumnInfo;
use crate::value::CellValue;

/// One parsed row: column name → cell, in source column order.
pub type Row = IndexMap<String, CellValue>;

/// Column prefix of the per-sector PiN value in the merged PiN table.
pub const PIN_PREFIX: &str = "PiN_";
/// Column prefix of the per-sector Severity value in the merged Severity table.
pub const SEVERITY_PREFIX: &str = "Severity_";

static MISSING: CellValue = CellValue::Empty;

/// Read a cell, treating an absent column as the missing marker.
pub fn cell<'a>(row: &'a Row, column: &str) -> &'a CellValue {
    row.get(column).unwrap_or(&MISSING)
}

/// Build a row from `(column, value)` pairs, keeping their order.
pub fn row_from<K, V, I>(cells: I) -> Row
where
    K: Into<String>,
    V: Into<CellValue>,
    I: IntoIterator<Item = (K, V)>,
{
    cells.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// An uploaded sector table plus the user's column selections.
#[derive(Debug, Clone, Default)]
pub struct SectorDataset {
    pub name: String,
    pub join_column: Option<String>,
    pub pin_column: Option<String>,
    pub severity_column: Option<String>,
    pub rows: Vec<Row>,
    pub ready: bool,
}

impl SectorDataset {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            rows,
            ..Default::default()
        }
    }

    /// Builder-style column selection: join, PiN, Severity.
    pub fn with_columns(
        mut self,
        join_column: impl Into<String>,
        pin_column: impl Into<String>,
        severity_column: impl Into<String>,
    ) -> Self {
        self.join_column = Some(join_column.into());
        self.pin_column = Some(pin_column.into());
        self.severity_column = Some(severity_column.into());
        self
    }

    pub fn mark_ready(mut self, ready: bool) -> Self {
        self.ready = ready;
        self
    }

    /// Ready and has a join column selected.
    pub fn participates(&self) -> bool {
        self.ready && self.join_column.is_some()
    }

    pub fn pin_column_name(&self) -> String {
        format!("{PIN_PREFIX}{}", self.name)
    }

    pub fn severity_column_name(&self) -> String {
        format!("{SEVERITY_PREFIX}{}", self.name)
    }
}

/// The template table: defines the output keys and all non-sector columns.
#[derive(Debug, Clone, Default)]
pub struct TemplateDataset {
    pub join_column: Option<String>,
    pub rows: Vec<Row>,
}

impl TemplateDataset {
    pub fn new(join_column: Option<String>, rows: Vec<Row>) -> Self {
        Self { join_column, rows }
    }
}

/// Everything one merge invocation reads. Sector order is registration order.
#[derive(Debug, Clone, Default)]
pub struct MergeInput {
    pub template: TemplateDataset,
    pub sectors: Vec<SectorDataset>,
}

impl MergeInput {
    /// Sectors taking part in the merge, in registration order.
    pub fn ready_sectors(&self) -> Vec<&SectorDataset> {
        self.sectors.iter().filter(|s| s.participates()).collect()
    }
}

// ---------------------------------------------------------------------------
// Integrity
// ---------------------------------------------------------------------------

/// Sector name → join-key values absent from the template, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UnmatchedReport {
    pub sectors: IndexMap<String, Vec<String>>,
}

impl UnmatchedReport {
    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    pub fn get(&self, sector: &str) -> Option<&[String]> {
        self.sectors.get(sector).map(|v| v.as_slice())
    }

    /// Total number of unmatched values across sectors.
    pub fn total(&self) -> usize {
        self.sectors.values().map(|v| v.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// The two joined tables, before analytics.
#[derive(Debug, Clone, Default)]
pub struct JoinOutput {
    pub pin: Vec<Row>,
    pub severity: Vec<Row>,
}

/// Result of a successful merge.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeOutput {
    pub pin: Vec<Row>,
    pub severity: Vec<Row>,
    pub pin_columns: Vec<ColumnInfo>,
    pub severity_columns: Vec<ColumnInfo>,
}

impl MergeOutput {
    pub fn row_count(&self) -> usize {
        self.pin.len()
    }

    /// Column count of the first PiN record (0 when empty).
    pub fn pin_column_count(&self) -> usize {
        self.pin.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn severity_column_count(&self) -> usize {
        self.severity.first().map(|r| r.len()).unwrap_or(0)
    }
}
