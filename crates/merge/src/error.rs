use std::fmt;

use crate::model::UnmatchedReport;

#[derive(Debug, Clone, PartialEq)]
pub enum MergeError {
    /// Template has zero rows.
    MissingTemplateData,
    /// No join column selected on the template.
    MissingJoinColumn,
    /// Ready sectors carry join keys absent from the template.
    UnmatchedKeys(UnmatchedReport),
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Manifest validation error (duplicate sector, bad threshold, etc.).
    ConfigValidation(String),
    /// Cell edit requested before any successful merge.
    NoMergedData,
    /// Cell edit on a calculated column or the join column.
    ColumnNotEditable(String),
    /// Cell edit on a key that is not in the merged table.
    UnknownKey(String),
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTemplateData => {
                write!(f, "template data is missing; upload a template file")
            }
            Self::MissingJoinColumn => {
                write!(f, "template join column is not selected")
            }
            Self::UnmatchedKeys(report) => {
                write!(f, "unmatched values in {} sector(s): ", report.sectors.len())?;
                let parts: Vec<String> = report
                    .sectors
                    .iter()
                    .map(|(sector, values)| format!("{sector} ({})", values.len()))
                    .collect();
                write!(f, "{}", parts.join(", "))
            }
            Self::ConfigParse(msg) => write!(f, "manifest parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "manifest validation error: {msg}"),
            Self::NoMergedData => write!(f, "no merged data; run a merge first"),
            Self::ColumnNotEditable(column) => write!(f, "column '{column}' is not editable"),
            Self::UnknownKey(key) => write!(f, "no merged row with key '{key}'"),
        }
    }
}

impl std::error::Error for MergeError {}
