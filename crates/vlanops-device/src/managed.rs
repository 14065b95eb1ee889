// ── Ledger-backed device ──
//
// Joins a backend's untagged live state with the ownership ledger, and
// records every successfully applied operation in that ledger before the
// next one is dispatched.

use std::path::{Path, PathBuf};

use tracing::{debug, error};
use vlanops_core::{
    DeviceError, DeviceSnapshot, DeviceStateReader, Executor, OwnershipLedger, PlanOperation,
};

use crate::DeviceBackend;

/// A backend plus the ledger that says which of its entities vlanops owns.
#[derive(Debug)]
pub struct ManagedDevice<B> {
    backend: B,
    ledger: OwnershipLedger,
    ledger_path: PathBuf,
}

impl<B: DeviceBackend> ManagedDevice<B> {
    pub fn new(backend: B, ledger: OwnershipLedger, ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            ledger,
            ledger_path: ledger_path.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn ledger(&self) -> &OwnershipLedger {
        &self.ledger
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    pub fn into_ledger(self) -> OwnershipLedger {
        self.ledger
    }
}

impl<B: DeviceBackend + Send> DeviceStateReader for ManagedDevice<B> {
    async fn read_snapshot(&mut self) -> Result<DeviceSnapshot, DeviceError> {
        let live = self.backend.read_live().await?;
        debug!(device = %self.backend.describe(), "live state read");
        Ok(self.ledger.tag(live))
    }
}

impl<B: DeviceBackend + Send> Executor for ManagedDevice<B> {
    async fn apply(&mut self, op: &PlanOperation) -> Result<(), DeviceError> {
        self.backend.push(op).await.map_err(|e| {
            if e.target().is_some() {
                e
            } else {
                e.with_target(op.target_id().clone())
            }
        })?;

        self.ledger.record(op);
        self.ledger.save(&self.ledger_path).map_err(|e| {
            error!(target = %op.target_id(), error = %e, "operation applied but ledger not saved");
            DeviceError::io(format!("applied, but the ownership ledger could not be saved: {e}"))
                .with_target(op.target_id().clone())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use vlanops_core::{
        ApplyFailure, CancellationToken, InterfaceAssignment, PlannerOptions, Topology,
        VlanDefinition, VlanId, execute, plan,
    };

    use super::*;
    use crate::StateFileDevice;

    struct Lab {
        _dir: tempfile::TempDir,
        state: PathBuf,
        ledger: PathBuf,
    }

    fn lab() -> Lab {
        let dir = tempfile::tempdir().unwrap();
        Lab {
            state: dir.path().join("sw1.json"),
            ledger: dir.path().join("sw1.ledger.json"),
            _dir: dir,
        }
    }

    fn open(lab: &Lab) -> ManagedDevice<StateFileDevice> {
        let ledger = OwnershipLedger::load_or_new(&lab.ledger, "sw1").unwrap();
        ManagedDevice::new(StateFileDevice::new(&lab.state), ledger, &lab.ledger)
    }

    fn desired() -> Topology {
        Topology::from_parts(
            vec![VlanDefinition::new(10, "Sales"), VlanDefinition::new(20, "Eng")],
            vec![InterfaceAssignment::access("Gi0/1", Some(VlanId::from(10)))],
            vec![],
        )
    }

    #[tokio::test]
    async fn apply_then_replan_converges() {
        let lab = lab();
        let mut device = open(&lab);
        let snapshot = device.read_snapshot().await.unwrap();
        let first = plan(&desired(), &snapshot, &PlannerOptions::default()).unwrap();
        assert_eq!(first.len(), 3);
        execute(&first, &mut device, &CancellationToken::new())
            .await
            .unwrap();

        let mut device = open(&lab);
        let snapshot = device.read_snapshot().await.unwrap();
        assert_eq!(snapshot.managed_keys().len(), 3);
        let second = plan(&desired(), &snapshot, &PlannerOptions::default()).unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn teardown_after_apply_deletes_only_what_was_applied() {
        let lab = lab();
        std::fs::write(&lab.state, r#"{"vlans": [{"id": 1, "name": "default"}]}"#).unwrap();

        let mut device = open(&lab);
        let snapshot = device.read_snapshot().await.unwrap();
        let build = plan(&desired(), &snapshot, &PlannerOptions::default()).unwrap();
        execute(&build, &mut device, &CancellationToken::new())
            .await
            .unwrap();

        let mut device = open(&lab);
        let snapshot = device.read_snapshot().await.unwrap();
        let teardown = plan(&Topology::default(), &snapshot, &PlannerOptions::default()).unwrap();
        let targets: Vec<String> = teardown.iter().map(|op| op.target_id().to_string()).collect();
        assert_eq!(targets, ["interface:Gi0/1", "vlan:10", "vlan:20"]);
        execute(&teardown, &mut device, &CancellationToken::new())
            .await
            .unwrap();

        let live = std::fs::read_to_string(&lab.state).unwrap();
        let live = Topology::load(&live).unwrap();
        assert_eq!(live.vlans(), [VlanDefinition::new(1, "default")]);
    }

    #[tokio::test]
    async fn partial_run_leaves_accurate_ledger() {
        let lab = lab();
        // VLAN 20 already exists out of band, so creating it is refused.
        std::fs::write(&lab.state, r#"{"vlans": [{"id": 20, "name": "Eng"}]}"#).unwrap();

        let mut device = open(&lab);
        let stale = DeviceSnapshot::new();
        let build = plan(&desired(), &stale, &PlannerOptions::default()).unwrap();
        let failure = execute(&build, &mut device, &CancellationToken::new())
            .await
            .unwrap_err();

        let ApplyFailure::Device { applied, error, .. } = failure else {
            panic!("expected a device failure");
        };
        assert_eq!(applied.len(), 1);
        assert_eq!(error.to_string(), "device rejected on vlan:20: vlan:20 already exists");

        let ledger = OwnershipLedger::load_or_new(&lab.ledger, "sw1").unwrap();
        let managed: Vec<String> = ledger.managed().iter().map(ToString::to_string).collect();
        assert_eq!(managed, ["vlan:10"]);
    }
}
