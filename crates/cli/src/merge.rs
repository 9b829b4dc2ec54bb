//! `jaws merge`: manifest-driven sector merge, plus `validate`, `columns`
//! and `formulas`.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use serde::Serialize;

use jaws_io::{load_table, LoadedTable};
use jaws_merge::columns::format_cell;
use jaws_merge::formulas;
use jaws_merge::{
    AuditEvent, AuditLog, ColumnInfo, MergeError, MergeInput, MergeManifest, MergeOutput, Merger,
    SectorDataset, TemplateDataset, ThresholdConfig, UnmatchedReport,
};

use crate::exit_codes::{merge_exit_code, EXIT_ERROR, EXIT_INVALID_MANIFEST, EXIT_IO, EXIT_USAGE};
use crate::CliError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `pin.csv` and `severity.csv`
    #[default]
    Csv,
    /// `merged.xlsx` with a PiN and a Severity sheet
    Xlsx,
    /// `merged.json`
    Json,
}

/// Threshold overrides shared by `merge` and `formulas`.
#[derive(Args, Debug, Clone, Default)]
pub struct ThresholdArgs {
    /// Flag rows where Highest exceeds Second Highest by more than N percent
    #[arg(long, value_name = "N")]
    pub threshold_second: Option<f64>,

    /// Flag rows where Highest exceeds Third Highest by more than N percent
    #[arg(long, value_name = "N")]
    pub threshold_third: Option<f64>,
}

impl ThresholdArgs {
    fn apply(&self, base: ThresholdConfig) -> Result<ThresholdConfig, CliError> {
        let mut out = base;
        if let Some(v) = self.threshold_second {
            out.second = finite_threshold("--threshold-second", v)?;
        }
        if let Some(v) = self.threshold_third {
            out.third = finite_threshold("--threshold-third", v)?;
        }
        Ok(out)
    }
}

fn finite_threshold(flag: &str, value: f64) -> Result<f64, CliError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CliError {
            code: EXIT_USAGE,
            message: format!("{flag} must be a finite number, got {value}"),
            hint: None,
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    /// Path to the merge manifest (.toml)
    pub manifest: PathBuf,

    /// Output JSON report to stdout instead of the human summary
    #[arg(long)]
    pub json: bool,

    /// Directory for the merged tables (default: the manifest's directory)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Format of the merged tables
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// Skip writing the merged tables
    #[arg(long)]
    pub no_write: bool,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}

fn merge_err(err: MergeError) -> CliError {
    let hint = match &err {
        MergeError::MissingTemplateData => Some("check [template].file has a header and data rows".to_string()),
        MergeError::MissingJoinColumn => Some("set [template].join_column in the manifest".to_string()),
        MergeError::UnmatchedKeys(_) => {
            Some("fix the sector join values or add them to the template, then re-run".to_string())
        }
        _ => None,
    };
    CliError { code: merge_exit_code(&err), message: err.to_string(), hint }
}

fn io_err(message: String) -> CliError {
    CliError { code: EXIT_IO, message, hint: None }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

fn read_manifest(path: &Path) -> Result<MergeManifest, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| io_err(format!("cannot read manifest {}: {e}", path.display())))?;
    MergeManifest::from_toml(&text).map_err(|e| CliError {
        code: EXIT_INVALID_MANIFEST,
        message: e.to_string(),
        hint: None,
    })
}

fn base_dir(manifest_path: &Path) -> PathBuf {
    manifest_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn load(base: &Path, file: &str) -> Result<LoadedTable, CliError> {
    let path = base.join(file);
    load_table(&path).map_err(|e| io_err(format!("cannot load {}: {e}", path.display())))
}

/// Read the template and every ready sector's file. Unready sectors keep
/// their registration slot with no rows.
fn load_input(
    manifest: &MergeManifest,
    base: &Path,
    audit: &mut AuditLog,
) -> Result<MergeInput, CliError> {
    let template = load(base, &manifest.template.file)?;
    template.record_template_upload(audit);

    let mut sectors = Vec::with_capacity(manifest.sectors.len());
    for source in &manifest.sectors {
        let rows = if source.ready {
            let table = load(base, &source.file)?;
            table.record_sector_upload(&source.name, audit);
            table.rows
        } else {
            log::debug!("sector '{}' not ready; skipping {}", source.name, source.file);
            Vec::new()
        };

        sectors.push(SectorDataset {
            name: source.name.clone(),
            join_column: source.join_column.clone(),
            pin_column: source.pin_column.clone(),
            severity_column: source.severity_column.clone(),
            rows,
            ready: source.ready,
        });
    }

    Ok(MergeInput {
        template: TemplateDataset::new(manifest.template.join_column.clone(), template.rows),
        sectors,
    })
}

/// Parse the manifest, load its files and run one merge.
fn run_manifest(
    manifest_path: &Path,
    thresholds: &ThresholdArgs,
    audit: &mut AuditLog,
) -> Result<(Merger, Result<MergeOutput, MergeError>), CliError> {
    let manifest = read_manifest(manifest_path)?;
    let mut config = manifest.merge_config();
    config.thresholds = thresholds.apply(config.thresholds)?;

    let input = load_input(&manifest, &base_dir(manifest_path), audit)?;

    let mut merger = Merger::new(config);
    let result = merger.run(&input, audit).map(|out| out.clone());
    Ok((merger, result))
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct MergeReport<'a> {
    rows: usize,
    pin_columns: usize,
    severity_columns: usize,
    flagged_rows: usize,
    thresholds: ThresholdConfig,
    written: Vec<String>,
    audit: &'a [AuditEvent],
    output: &'a MergeOutput,
}

#[derive(Serialize)]
struct FailureReport<'a> {
    error: String,
    unmatched: &'a UnmatchedReport,
    audit: &'a [AuditEvent],
}

pub fn cmd_merge(args: MergeArgs) -> Result<(), CliError> {
    let mut audit = AuditLog::new();
    let (merger, result) = run_manifest(&args.manifest, &args.thresholds, &mut audit)?;

    let output = match result {
        Ok(output) => output,
        Err(err) => {
            if args.json {
                let report = FailureReport {
                    error: err.to_string(),
                    unmatched: merger.unmatched(),
                    audit: audit.events(),
                };
                print_json(&report)?;
            } else {
                print_audit(&audit);
                print_unmatched(merger.unmatched());
            }
            return Err(merge_err(err));
        }
    };

    let written = if args.no_write {
        Vec::new()
    } else {
        let dir = args.output_dir.clone().unwrap_or_else(|| base_dir(&args.manifest));
        write_tables(&dir, args.format, &output)?
    };

    let flagged_rows = output
        .pin
        .iter()
        .filter(|row| row.get("Row Flagged").and_then(|v| v.as_bool()) == Some(true))
        .count();

    if args.json {
        let report = MergeReport {
            rows: output.row_count(),
            pin_columns: output.pin_column_count(),
            severity_columns: output.severity_column_count(),
            flagged_rows,
            thresholds: merger.config().thresholds,
            written: written.iter().map(|p| p.display().to_string()).collect(),
            audit: audit.events(),
            output: &output,
        };
        print_json(&report)?;
    } else {
        print_audit(&audit);
        for path in &written {
            eprintln!("wrote {}", path.display());
        }
        eprintln!(
            "merged {} rows: {} PiN columns, {} Severity columns, {} flagged",
            output.row_count(),
            output.pin_column_count(),
            output.severity_column_count(),
            flagged_rows,
        );
    }

    Ok(())
}

fn write_tables(dir: &Path, format: OutputFormat, output: &MergeOutput) -> Result<Vec<PathBuf>, CliError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| io_err(format!("cannot create {}: {e}", dir.display())))?;

    let written = match format {
        OutputFormat::Csv => {
            let pin = dir.join("pin.csv");
            let severity = dir.join("severity.csv");
            jaws_io::csv::write_csv(&pin, &output.pin).map_err(io_err)?;
            jaws_io::csv::write_csv(&severity, &output.severity).map_err(io_err)?;
            vec![pin, severity]
        }
        OutputFormat::Xlsx => {
            let path = dir.join("merged.xlsx");
            jaws_io::xlsx::write_xlsx(&path, &[("PiN", &output.pin[..]), ("Severity", &output.severity[..])])
                .map_err(io_err)?;
            vec![path]
        }
        OutputFormat::Json => {
            let path = dir.join("merged.json");
            jaws_io::json::write_json(&path, output).map_err(io_err)?;
            vec![path]
        }
    };
    Ok(written)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let json_str = serde_json::to_string_pretty(value).map_err(|e| CliError {
        code: EXIT_ERROR,
        message: format!("JSON serialization error: {e}"),
        hint: None,
    })?;
    println!("{json_str}");
    Ok(())
}

fn print_audit(audit: &AuditLog) {
    for event in audit.events() {
        eprintln!("[{}] {}", event.timestamp.format("%H:%M:%S"), event.message);
    }
}

fn print_unmatched(report: &UnmatchedReport) {
    for (sector, values) in &report.sectors {
        eprintln!("{} ({} unmatched):", sector, values.len());
        for value in values {
            eprintln!("  {value:?}");
        }
    }
}

// ---------------------------------------------------------------------------
// validate / columns / formulas
// ---------------------------------------------------------------------------

pub fn cmd_validate(manifest_path: PathBuf) -> Result<(), CliError> {
    let manifest = read_manifest(&manifest_path)?;
    let names: Vec<&str> = manifest.sectors.iter().map(|s| s.name.as_str()).collect();
    eprintln!(
        "manifest OK: {} sector(s) ({}), {} ready; thresholds {}% / {}%",
        manifest.sectors.len(),
        names.join(", "),
        manifest.ready_count(),
        manifest.thresholds.second,
        manifest.thresholds.third,
    );
    if manifest.template.join_column.is_none() {
        eprintln!("warning: [template].join_column is not set; merge will fail");
    }
    let custom = manifest.custom_sectors();
    if !custom.is_empty() {
        eprintln!("note: sector(s) outside the default catalog: {}", custom.join(", "));
    }
    Ok(())
}

pub fn cmd_columns(manifest_path: PathBuf, json: bool) -> Result<(), CliError> {
    let mut audit = AuditLog::new();
    let (_, result) = run_manifest(&manifest_path, &ThresholdArgs::default(), &mut audit)?;
    let output = result.map_err(merge_err)?;

    if json {
        return print_json(&output.pin_columns);
    }

    let sample = output.pin.first();
    for column in &output.pin_columns {
        let preview = sample
            .and_then(|row| row.get(&column.name))
            .map(|v| format_cell(column.format, v))
            .unwrap_or_default();
        println!("{}", describe(column, &preview));
    }
    Ok(())
}

fn describe(column: &ColumnInfo, preview: &str) -> String {
    format!(
        "{}\t{:?}\t{:?}\t{}\t{}",
        column.header,
        column.category,
        column.format,
        if column.editable { "editable" } else { "read-only" },
        preview
    )
}

pub fn cmd_formulas(thresholds: ThresholdArgs, json: bool) -> Result<(), CliError> {
    let thresholds = thresholds.apply(ThresholdConfig::default())?;
    let catalog = formulas::catalog(&thresholds);

    if json {
        return print_json(&catalog);
    }
    for formula in &catalog {
        println!("{}: {}", formula.name, formula.formula);
    }
    Ok(())
}
