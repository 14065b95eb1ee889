// ── Ownership ledger ──
//
// Persisted record of which device entities vlanops owns. Live device
// state carries no ownership information of its own, so the ledger is
// what turns a live topology into a tagged `DeviceSnapshot`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::model::EntityKey;
use crate::plan::{OperationKind, PlanOperation};
use crate::snapshot::{DeviceSnapshot, Ownership};
use crate::topology::Topology;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cannot access ledger {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ledger {} is not valid: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("ledger version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("ledger belongs to device '{found}', not '{expected}'")]
    DeviceMismatch { found: String, expected: String },
}

/// The set of entity keys vlanops manages on one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipLedger {
    version: u32,
    device: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    managed: BTreeSet<EntityKey>,
}

impl OwnershipLedger {
    pub const VERSION: u32 = 1;

    /// An empty ledger: nothing on `device` is managed yet.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            version: Self::VERSION,
            device: device.into(),
            updated_at: None,
            managed: BTreeSet::new(),
        }
    }

    /// Load the ledger at `path`, or start an empty one if none exists yet.
    pub fn load_or_new(path: &Path, device: &str) -> Result<Self, LedgerError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no ledger yet, starting empty");
                return Ok(Self::new(device));
            }
            Err(source) => {
                return Err(LedgerError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let ledger: Self = serde_json::from_str(&raw).map_err(|source| LedgerError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if ledger.version != Self::VERSION {
            return Err(LedgerError::UnsupportedVersion {
                found: ledger.version,
                expected: Self::VERSION,
            });
        }
        if ledger.device != device {
            return Err(LedgerError::DeviceMismatch {
                found: ledger.device,
                expected: device.to_owned(),
            });
        }
        Ok(ledger)
    }

    /// Write the ledger to `path` via a sibling temp file and rename.
    pub fn save(&mut self, path: &Path) -> Result<(), LedgerError> {
        self.updated_at = Some(Utc::now());
        let io_err = |source| LedgerError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let body = serde_json::to_string_pretty(self).map_err(|source| LedgerError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, body).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;
        debug!(path = %path.display(), managed = self.managed.len(), "ledger saved");
        Ok(())
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn managed(&self) -> &BTreeSet<EntityKey> {
        &self.managed
    }

    pub fn is_managed(&self, key: &EntityKey) -> bool {
        self.managed.contains(key)
    }

    pub fn ownership_of(&self, key: &EntityKey) -> Ownership {
        if self.is_managed(key) {
            Ownership::Managed
        } else {
            Ownership::Unmanaged
        }
    }

    /// Tag a live topology with this ledger's ownership.
    pub fn tag(&self, live: Topology) -> DeviceSnapshot {
        DeviceSnapshot::tag(live, |key| self.ownership_of(key))
    }

    /// Note a successfully applied operation.
    pub fn record(&mut self, op: &PlanOperation) {
        match op.kind() {
            OperationKind::Create | OperationKind::Update => {
                self.managed.insert(op.target_id().clone());
            }
            OperationKind::Delete => {
                self.managed.remove(op.target_id());
            }
        }
    }

    /// Mark keys as managed. Returns the keys that were not managed before.
    pub fn adopt(&mut self, keys: impl IntoIterator<Item = EntityKey>) -> Vec<EntityKey> {
        let adopted: Vec<EntityKey> = keys
            .into_iter()
            .filter(|key| self.managed.insert(key.clone()))
            .collect();
        if !adopted.is_empty() {
            info!(count = adopted.len(), device = %self.device, "adopted entities");
        }
        adopted
    }

    /// Stop managing keys. Returns the keys that were managed before.
    pub fn release<'a>(&mut self, keys: impl IntoIterator<Item = &'a EntityKey>) -> Vec<EntityKey> {
        let released: Vec<EntityKey> = keys
            .into_iter()
            .filter(|key| self.managed.remove(*key))
            .cloned()
            .collect();
        if !released.is_empty() {
            info!(count = released.len(), device = %self.device, "released entities");
        }
        released
    }
}
