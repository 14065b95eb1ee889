// ── Core error types ──
//
// Load-time, device-time and umbrella errors. Validation findings and
// planning conflicts live next to the code that produces them
// (`validate::ValidationReport`, `plan::PlanError`) and are folded into
// `CoreError` here for callers that want a single type.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::model::EntityKey;
use crate::plan::PlanError;
use crate::validate::ValidationReport;

// ── SchemaError ─────────────────────────────────────────────────────

/// The input document could not be turned into a `Topology`.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid topology at `{path}`: {message}")]
    Malformed { path: String, message: String },

    #[error("{entity}: VLAN id {vlan_id} is outside {min}-{max}", min = crate::model::VlanId::MIN, max = crate::model::VlanId::MAX)]
    VlanIdOutOfRange { entity: EntityKey, vlan_id: u16 },

    #[error("duplicate {entity} in `{collection}`")]
    Duplicate {
        collection: &'static str,
        entity: EntityKey,
    },

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SchemaError {
    pub(crate) fn from_path_error(err: &serde_path_to_error::Error<serde_json::Error>) -> Self {
        Self::Malformed {
            path: err.path().to_string(),
            message: err.inner().to_string(),
        }
    }
}

// ── DeviceError ─────────────────────────────────────────────────────

/// Broad class of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceErrorKind {
    /// The device refused the change.
    Rejected,
    /// The transport gave up waiting.
    Timeout,
    /// The device could not be reached.
    Transport,
    /// The device answered with something unintelligible.
    Protocol,
    /// Local I/O failed (state file, child process pipes).
    Io,
}

/// A surfaced transport failure. Transports may retry internally; once
/// an error reaches the core it is final for the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceError {
    kind: DeviceErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<EntityKey>,
    message: String,
}

impl DeviceError {
    pub fn new(kind: DeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            target: None,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorKind::Rejected, message)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            DeviceErrorKind::Timeout,
            format!("no response within {}s", after.as_secs_f64()),
        )
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorKind::Transport, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorKind::Protocol, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorKind::Io, message)
    }

    /// Attach the entity the failing operation targeted.
    #[must_use]
    pub fn with_target(mut self, target: EntityKey) -> Self {
        self.target = Some(target);
        self
    }

    pub fn kind(&self) -> DeviceErrorKind {
        self.kind
    }

    pub fn target(&self) -> Option<&EntityKey> {
        self.target.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "device {} on {target}: {}", self.kind, self.message),
            None => write!(f, "device {}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for DeviceError {}

// ── CoreError ───────────────────────────────────────────────────────

/// Unified error type for callers driving the whole pipeline.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Validation(#[from] ValidationReport),

    #[error(transparent)]
    Conflict(#[from] PlanError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
