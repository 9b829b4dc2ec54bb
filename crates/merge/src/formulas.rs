//! Human-readable catalog of the derived PiN columns.

use serde::Serialize;

use crate::analytics::{FLAG_SECOND, FLAG_THIRD};
use crate::config::ThresholdConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Formula {
    pub name: &'static str,
    pub formula: String,
}

const CATALOG: [(&str, &str); 18] = [
    ("PiN_%", "PiN_[Sector] / Population * 100"),
    ("Highest PiN", "MAX(PiN_[All Sectors])"),
    ("Highest PiN Sector", "SECTOR of MAX(PiN_[All Sectors])"),
    ("Highest PiN %", "MAX(PiN_%_[All Sectors])"),
    ("Second Highest PiN", "SECOND_MAX(PiN_[All Sectors])"),
    ("Second Highest PiN Sector", "SECTOR of SECOND_MAX(PiN_[All Sectors])"),
    ("Second Highest PiN %", "SECOND_MAX(PiN_%_[All Sectors])"),
    ("Third Highest PiN", "THIRD_MAX(PiN_[All Sectors])"),
    ("Third Highest PiN Sector", "SECTOR of THIRD_MAX(PiN_[All Sectors])"),
    ("Third Highest PiN %", "THIRD_MAX(PiN_%_[All Sectors])"),
    ("Difference Highest and 2nd Highest", "Highest PiN - Second Highest PiN"),
    (
        "% Difference Highest and 2nd Highest",
        "((Highest PiN - Second Highest PiN) / Second Highest PiN) * 100",
    ),
    (
        "Difference over threshold",
        "% Difference Highest and 2nd Highest > Threshold (default 50%)",
    ),
    ("Difference Highest and 3rd Highest", "Highest PiN - Third Highest PiN"),
    (
        "% Difference Highest and 3rd Highest",
        "((Highest PiN - Third Highest PiN) / Third Highest PiN) * 100",
    ),
    (
        "Difference over threshold 3rd",
        "% Difference Highest and 3rd Highest > Threshold 3rd (default 50%)",
    ),
    ("Total Flagged", "COUNT(Flagged columns)"),
    ("Row Flagged", "IF(Total Flagged > 0, \"Flagged\", \"\")"),
];

/// The catalog with the configured thresholds appended to the flag rows.
pub fn catalog(thresholds: &ThresholdConfig) -> Vec<Formula> {
    CATALOG
        .iter()
        .map(|&(name, formula)| {
            let formula = if name == FLAG_SECOND {
                format!("{formula} ({}%)", thresholds.second)
            } else if name == FLAG_THIRD {
                format!("{formula} ({}%)", thresholds.third)
            } else {
                formula.to_string()
            };
            Formula { name, formula }
        })
        .collect()
}
