//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;

use serde::Serialize;
use tabled::Tabled;
use vlanops_core::{
    CoreError, DeviceStateReader, Plan, PlannerOptions, Topology, UnresolvableConflict,
    ValidationError, validate,
};
use vlanops_device::{DeviceBackend, ManagedDevice, Transport};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// Load and validate a topology, listing every violation on failure.
///
/// Needs no device, so it runs before any profile is opened.
pub fn load_topology(path: &Path, global: &GlobalOpts) -> Result<Topology, CliError> {
    let topology = Topology::load_file(path)?;
    validate(&topology).map_err(|errors| report(CoreError::from(errors), global))?;
    Ok(topology)
}

/// Read the device and diff it against `topology`.
pub async fn compute_plan(
    topology: &Topology,
    device: &mut ManagedDevice<Transport>,
    options: &PlannerOptions,
) -> Result<Plan, CoreError> {
    tracing::info!(device = %device.backend().describe(), "reading live state");
    let snapshot = device.read_snapshot().await?;
    Ok(vlanops_core::plan(topology, &snapshot, options)?)
}

// ── Problem listings ────────────────────────────────────────────────

#[derive(Tabled)]
struct ProblemRow {
    #[tabled(rename = "Problem")]
    problem: String,
}

fn print_problems<T: Serialize + ToString>(items: &[T], global: &GlobalOpts) {
    let out = output::render_list(
        &global.output,
        items,
        |item| ProblemRow {
            problem: item.to_string(),
        },
        ToString::to_string,
    );
    output::print_output(&out, false);
}

pub fn print_violations(errors: &[ValidationError], global: &GlobalOpts) {
    print_problems(errors, global);
}

pub fn print_conflicts(conflicts: &[UnresolvableConflict], global: &GlobalOpts) {
    print_problems(conflicts, global);
}

/// List what went wrong (violations or conflicts), then convert to a `CliError`.
pub fn report(err: CoreError, global: &GlobalOpts) -> CliError {
    match &err {
        CoreError::Validation(report) => print_violations(report.errors(), global),
        CoreError::Conflict(conflicts) => print_conflicts(conflicts.conflicts(), global),
        _ => {}
    }
    err.into()
}

// ── Confirmation ────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to ask on, `--yes` is required.
pub fn confirm(action: &str, message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}
