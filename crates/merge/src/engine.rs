use std::collections::HashSet;

use crate::analytics::analyze;
use crate::audit::AuditSink;
use crate::columns::describe_columns;
use crate::config::{MergeConfig, ThresholdConfig};
use crate::error::MergeError;
use crate::integrity::check_unmatched;
use crate::join::join;
use crate::model::{cell, MergeInput, MergeOutput, UnmatchedReport};
use crate::value::CellValue;

/// Where a merge run currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeState {
    #[default]
    Idle,
    Validating,
    Joining,
    Analyzing,
    Done,
    Failed,
}

impl MergeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// One validate → join → analyze pass with no retained state.
pub fn merge(
    input: &MergeInput,
    config: &MergeConfig,
    audit: &mut dyn AuditSink,
) -> Result<MergeOutput, MergeError> {
    let mut state = MergeState::Idle;
    let mut unmatched = UnmatchedReport::default();
    pipeline(input, config, audit, &mut state, &mut unmatched)
}

fn pipeline(
    input: &MergeInput,
    config: &MergeConfig,
    audit: &mut dyn AuditSink,
    state: &mut MergeState,
    unmatched: &mut UnmatchedReport,
) -> Result<MergeOutput, MergeError> {
    let ready = input.ready_sectors();

    // Idle -> Validating
    *state = MergeState::Validating;
    let names: Vec<&str> = ready.iter().map(|s| s.name.as_str()).collect();
    if names.is_empty() {
        audit.record("Merge started: 0 ready sector(s)".to_string());
    } else {
        audit.record(format!(
            "Merge started: {} ready sector(s) ({})",
            names.len(),
            names.join(", ")
        ));
    }

    let template = &input.template;
    if template.rows.is_empty() {
        return fail(state, audit, "Template data is missing", MergeError::MissingTemplateData);
    }
    let Some(join_column) = template.join_column.as_deref() else {
        return fail(state, audit, "Template join column not selected", MergeError::MissingJoinColumn);
    };

    *unmatched = check_unmatched(&template.rows, join_column, &ready, audit);
    if !unmatched.is_empty() {
        return fail(
            state,
            audit,
            "Unmatched values found",
            MergeError::UnmatchedKeys(unmatched.clone()),
        );
    }

    let key_count = template
        .rows
        .iter()
        .map(|row| cell(row, join_column).key_string())
        .collect::<HashSet<_>>()
        .len();

    // Validating -> Joining
    *state = MergeState::Joining;
    audit.record(format!("Validation passed: {key_count} template keys"));
    let joined = join(&template.rows, join_column, &ready);

    // Joining -> Analyzing
    *state = MergeState::Analyzing;
    audit.record(format!(
        "Join complete: {} rows across {} sector(s)",
        joined.pin.len(),
        ready.len()
    ));
    let pin = analyze(&joined.pin, config);
    let severity = joined.severity;

    if log::log_enabled!(log::Level::Debug) {
        for row in pin.iter().take(5) {
            log::debug!("merged PiN row: {:?}", row);
        }
    }

    let output = MergeOutput {
        pin_columns: describe_columns(&pin, Some(join_column), &config.population_column),
        severity_columns: describe_columns(&severity, Some(join_column), &config.population_column),
        pin,
        severity,
    };

    // Analyzing -> Done
    *state = MergeState::Done;
    audit.record(format!(
        "Data merged successfully: {} rows, {} columns for PiN, {} columns for Severity",
        output.row_count(),
        output.pin_column_count(),
        output.severity_column_count()
    ));
    log::info!(
        "merge done: {} rows from {} sector(s)",
        output.row_count(),
        ready.len()
    );

    Ok(output)
}

fn fail(
    state: &mut MergeState,
    audit: &mut dyn AuditSink,
    reason: &str,
    error: MergeError,
) -> Result<MergeOutput, MergeError> {
    *state = MergeState::Failed;
    audit.record(format!("Merge failed: {reason}"));
    log::warn!("merge failed: {error}");
    Err(error)
}

// ---------------------------------------------------------------------------
// Merger
// ---------------------------------------------------------------------------

/// Runs merges and keeps the last successful result.
///
/// A failed run never touches the retained output.
#[derive(Debug, Clone, Default)]
pub struct Merger {
    config: MergeConfig,
    state: MergeState,
    output: Option<MergeOutput>,
    unmatched: UnmatchedReport,
    join_column: Option<String>,
}

impl Merger {
    pub fn new(config: MergeConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// New thresholds apply from the next run.
    pub fn set_thresholds(&mut self, thresholds: ThresholdConfig) {
        self.config.thresholds = thresholds;
    }

    pub fn state(&self) -> MergeState {
        self.state
    }

    /// Last successful output, if any.
    pub fn output(&self) -> Option<&MergeOutput> {
        self.output.as_ref()
    }

    /// Unmatched keys found by the most recent run's integrity check.
    pub fn unmatched(&self) -> &UnmatchedReport {
        &self.unmatched
    }

    pub fn run(
        &mut self,
        input: &MergeInput,
        audit: &mut dyn AuditSink,
    ) -> Result<&MergeOutput, MergeError> {
        self.state = MergeState::Idle;
        self.unmatched = UnmatchedReport::default();

        let output = pipeline(input, &self.config, audit, &mut self.state, &mut self.unmatched)?;
        self.join_column = input.template.join_column.clone();
        Ok(&*self.output.insert(output))
    }

    /// Replace one cell of the merged PiN table. Derived columns are not
    /// recomputed.
    pub fn edit_pin_cell(
        &mut self,
        key: &str,
        column: &str,
        value: CellValue,
        audit: &mut dyn AuditSink,
    ) -> Result<(), MergeError> {
        let output = self.output.as_mut().ok_or(MergeError::NoMergedData)?;
        let join_column = self.join_column.as_deref().ok_or(MergeError::NoMergedData)?;

        let editable = output
            .pin_columns
            .iter()
            .any(|c| c.name == column && c.editable);
        if !editable {
            return Err(MergeError::ColumnNotEditable(column.to_string()));
        }

        let row = output
            .pin
            .iter_mut()
            .find(|row| cell(row, join_column).key_string() == key)
            .ok_or_else(|| MergeError::UnknownKey(key.to_string()))?;

        row.insert(column.to_string(), value);
        audit.record(format!("Cell value changed: {column} for {key}"));
        Ok(())
    }
}
