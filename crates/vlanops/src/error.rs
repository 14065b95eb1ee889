//! CLI error types with miette diagnostics.
//!
//! Maps library errors into user-facing errors with actionable help text
//! and a stable process exit code.

use miette::Diagnostic;
use thiserror::Error;

use vlanops_config::ConfigError;
use vlanops_core::{ApplyFailure, CoreError, DeviceError, DeviceErrorKind, LedgerError, SchemaError};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const SCHEMA: i32 = 3;
    pub const VALIDATION: i32 = 4;
    pub const CONFLICT: i32 = 5;
    pub const DEVICE: i32 = 6;
    pub const TIMEOUT: i32 = 7;
    pub const CANCELLED: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Topology ─────────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(vlanops::schema),
        help("The topology needs top-level `vlans`, `interfaces` and `subinterfaces` arrays.")
    )]
    Schema(#[from] SchemaError),

    #[error("topology failed validation with {count} error(s)")]
    #[diagnostic(
        code(vlanops::validation),
        help("Fix every listed problem; nothing was sent to the device.")
    )]
    InvalidTopology { count: usize },

    // ── Planning ─────────────────────────────────────────────────────

    #[error("{count} conflict(s) between the topology and the device")]
    #[diagnostic(
        code(vlanops::conflict),
        help(
            "Entities outside the ownership ledger are never deleted or left dangling.\n\
             Fix the topology, or take entities over with: vlanops state adopt <KEY>"
        )
    )]
    Conflicts { count: usize },

    #[error("device state changed since {path} was reviewed")]
    #[diagnostic(
        code(vlanops::plan_drift),
        help("Review the new plan with: vlanops plan <TOPOLOGY> --out {path}")
    )]
    PlanDrift { path: String },

    #[error("cannot read reviewed plan {path}")]
    #[diagnostic(code(vlanops::plan_file))]
    PlanFile {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    // ── Device ───────────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(vlanops::device),
        help("Check the profile's transport settings with: vlanops config show")
    )]
    Device(#[from] DeviceError),

    #[error("apply stopped at {failed} after {applied} successful operation(s)")]
    #[diagnostic(
        code(vlanops::apply_failed),
        help(
            "{remaining} operation(s) were not attempted. Applied changes are\n\
             recorded in the ledger; re-run `vlanops plan` to see what is left."
        )
    )]
    ApplyFailed {
        failed: String,
        applied: usize,
        remaining: usize,
        #[source]
        source: DeviceError,
    },

    #[error("device still differs from the topology after apply: {remaining} operation(s) left")]
    #[diagnostic(
        code(vlanops::not_converged),
        help(
            "The device accepted every operation but reads back differently.\n\
             Check the transport's read output, then re-run `vlanops plan`."
        )
    )]
    NotConverged { remaining: usize },

    #[error("apply cancelled before any change was made")]
    #[diagnostic(code(vlanops::cancelled))]
    Cancelled,

    #[error("apply declined")]
    #[diagnostic(code(vlanops::declined))]
    Declined,

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(vlanops::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: vlanops config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No device profile configured")]
    #[diagnostic(
        code(vlanops::no_config),
        help(
            "Create one with: vlanops config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(vlanops::config))]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(
        code(vlanops::ledger),
        help("The ledger is written by vlanops; restore it from backup or remove it and re-adopt.")
    )]
    Ledger(#[from] LedgerError),

    // ── Usage ────────────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(vlanops::usage))]
    Validation { field: String, reason: String },

    #[error("'{action}' changes the device and requires confirmation")]
    #[diagnostic(
        code(vlanops::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("cannot encode output: {0}")]
    #[diagnostic(code(vlanops::json))]
    Json(#[from] serde_json::Error),
}

fn device_exit_code(err: &DeviceError) -> i32 {
    match err.kind() {
        DeviceErrorKind::Timeout => exit_code::TIMEOUT,
        _ => exit_code::DEVICE,
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Schema(_) => exit_code::SCHEMA,
            Self::InvalidTopology { .. } => exit_code::VALIDATION,
            Self::Conflicts { .. } | Self::PlanDrift { .. } | Self::NotConverged { .. } => {
                exit_code::CONFLICT
            }
            Self::Device(err) | Self::ApplyFailed { source: err, .. } => device_exit_code(err),
            Self::Cancelled | Self::Declined => exit_code::CANCELLED,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::PlanFile { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Schema(err) => Self::Schema(err),
            CoreError::Validation(report) => Self::InvalidTopology {
                count: report.len(),
            },
            CoreError::Conflict(err) => Self::Conflicts {
                count: err.conflicts().len(),
            },
            CoreError::Device(err) => Self::Device(err),
            CoreError::Ledger(err) => Self::Ledger(err),
        }
    }
}

impl From<ApplyFailure> for CliError {
    fn from(failure: ApplyFailure) -> Self {
        match failure {
            ApplyFailure::Cancelled { .. } => Self::Cancelled,
            ApplyFailure::Device {
                applied,
                failed,
                error,
                remaining,
            } => Self::ApplyFailed {
                failed: failed.target_id().to_string(),
                applied: applied.len(),
                remaining: remaining.len(),
                source: error,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use vlanops_core::{DeviceError, Topology, validate};

    use super::*;

    #[test]
    fn timeouts_and_rejections_have_distinct_codes() {
        let timeout = CliError::Device(DeviceError::timeout(Duration::from_secs(30)));
        let rejected = CliError::Device(DeviceError::rejected("% Invalid input"));
        assert_eq!(timeout.exit_code(), exit_code::TIMEOUT);
        assert_eq!(rejected.exit_code(), exit_code::DEVICE);
    }

    #[test]
    fn validation_report_maps_to_validation_code() {
        let topology = Topology::load(
            r#"{"interfaces": [{"name": "Gi0/1", "mode": "access", "access_vlan": 30}]}"#,
        )
        .unwrap();
        let report = validate(&topology).unwrap_err();
        let err = CliError::from(CoreError::from(report));
        assert_eq!(err.exit_code(), exit_code::VALIDATION);
        assert_eq!(err.to_string(), "topology failed validation with 1 error(s)");
    }

    #[test]
    fn unconverged_device_reports_as_drift() {
        let err = CliError::NotConverged { remaining: 2 };
        assert_eq!(err.exit_code(), exit_code::CONFLICT);
        assert!(err.to_string().contains("2 operation(s) left"));
    }

    #[test]
    fn declining_is_not_a_failure_of_the_device() {
        assert_eq!(CliError::Declined.exit_code(), exit_code::CANCELLED);
        assert_eq!(CliError::Cancelled.exit_code(), exit_code::CANCELLED);
    }
}
