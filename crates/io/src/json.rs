// JSON export

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use jaws_merge::{MergeOutput, Row};
use serde::Serialize;

#[derive(Serialize)]
struct MergedTables<'a> {
    pin: &'a [Row],
    severity: &'a [Row],
}

/// Export both merged tables as `{ "pin": [...], "severity": [...] }`.
///
/// Non-finite numbers are written as the strings `"NaN"`, `"Infinity"` and
/// `"-Infinity"`; missing sector values as `null`.
pub fn write_json(path: &Path, output: &MergeOutput) -> Result<(), String> {
    let file = File::create(path).map_err(|e| e.to_string())?;
    let writer = BufWriter::new(file);

    let tables = MergedTables {
        pin: &output.pin,
        severity: &output.severity,
    };
    serde_json::to_writer_pretty(writer, &tables).map_err(|e| e.to_string())?;

    Ok(())
}
