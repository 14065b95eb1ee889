// ── State-file device ──
//
// A JSON file standing in for a switch. Reads parse it as a topology;
// writes apply one operation with the same referential checks a real
// device makes, then replace the file atomically.

use std::path::{Path, PathBuf};

use tracing::debug;
use vlanops_core::{
    DeviceError, Entity, EntityKey, EntitySpec, InterfaceAssignment, OperationKind, PlanOperation,
    Subinterface, Topology, VlanDefinition, VlanId,
};

use crate::DeviceBackend;

/// A lab device whose running configuration is a topology-shaped file.
#[derive(Debug, Clone)]
pub struct StateFileDevice {
    path: PathBuf,
}

impl StateFileDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Topology, DeviceError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "state file missing, device is blank");
                return Ok(Topology::default());
            }
            Err(e) => {
                return Err(DeviceError::io(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )));
            }
        };
        Topology::load(&raw).map_err(|e| {
            DeviceError::protocol(format!("{} is not a valid device state: {e}", self.path.display()))
        })
    }

    async fn store(&self, topology: &Topology) -> Result<(), DeviceError> {
        let io_err = |e: std::io::Error| {
            DeviceError::io(format!("cannot write {}: {e}", self.path.display()))
        };
        let body = serde_json::to_string_pretty(topology)
            .map_err(|e| DeviceError::io(format!("cannot encode device state: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}

impl DeviceBackend for StateFileDevice {
    fn describe(&self) -> String {
        format!("state file {}", self.path.display())
    }

    async fn read_live(&mut self) -> Result<Topology, DeviceError> {
        self.load().await
    }

    async fn push(&mut self, op: &PlanOperation) -> Result<(), DeviceError> {
        let current = self.load().await?;
        let next = apply_to(current, op)?;
        self.store(&next).await?;
        debug!(target = %op.target_id(), kind = %op.kind(), "state file updated");
        Ok(())
    }
}

// ── Device semantics ────────────────────────────────────────────────

/// Apply one operation to a running configuration, rejecting what a
/// switch would reject: missing VLANs, missing parents, deleting
/// something still in use, creating twice.
pub(crate) fn apply_to(live: Topology, op: &PlanOperation) -> Result<Topology, DeviceError> {
    let (mut vlans, mut interfaces, mut subinterfaces) = live.into_parts();
    let key = op.target_id();

    match (op.kind(), op.spec()) {
        (OperationKind::Delete, _) => match key {
            EntityKey::Vlan(id) => {
                if let Some(user) = first_user(&interfaces, &subinterfaces, *id) {
                    return Err(DeviceError::rejected(format!("VLAN {id} is still used by {user}")));
                }
                remove(&mut vlans, key)?;
            }
            EntityKey::Interface(name) => {
                if let Some(child) = subinterfaces.iter().find(|s| &s.parent_interface == name) {
                    return Err(DeviceError::rejected(format!(
                        "interface {name} still has subinterface {}",
                        child.name()
                    )));
                }
                remove(&mut interfaces, key)?;
            }
            EntityKey::Subinterface { .. } => remove(&mut subinterfaces, key)?,
        },
        (kind, Some(spec)) => {
            if spec.key() != *key {
                return Err(DeviceError::protocol(format!(
                    "operation targets {key} but carries {}",
                    spec.key()
                )));
            }
            match spec {
                EntitySpec::Vlan(vlan) => upsert(&mut vlans, vlan.clone(), kind)?,
                EntitySpec::Interface(iface) => {
                    require_vlans(&vlans, iface.vlan_refs())?;
                    upsert(&mut interfaces, iface.clone(), kind)?;
                }
                EntitySpec::Subinterface(subif) => {
                    require_vlans(&vlans, subif.vlan_refs())?;
                    if !interfaces.iter().any(|i| i.name == subif.parent_interface) {
                        return Err(DeviceError::rejected(format!(
                            "parent interface {} does not exist",
                            subif.parent_interface
                        )));
                    }
                    upsert(&mut subinterfaces, subif.clone(), kind)?;
                }
            }
        }
        (kind, None) => {
            return Err(DeviceError::protocol(format!("{kind} of {key} carries no desired state")));
        }
    }

    vlans.sort_by_key(|v| v.id);
    interfaces.sort_by(|a, b| a.name.cmp(&b.name));
    subinterfaces.sort_by_key(Entity::key);
    Ok(Topology::from_parts(vlans, interfaces, subinterfaces))
}

fn first_user(
    interfaces: &[InterfaceAssignment],
    subinterfaces: &[Subinterface],
    vlan: VlanId,
) -> Option<EntityKey> {
    interfaces
        .iter()
        .find(|i| i.vlan_refs().contains(&vlan))
        .map(Entity::key)
        .or_else(|| {
            subinterfaces
                .iter()
                .find(|s| s.vlan_id == vlan)
                .map(Entity::key)
        })
}

fn require_vlans(vlans: &[VlanDefinition], refs: Vec<VlanId>) -> Result<(), DeviceError> {
    match refs.into_iter().find(|id| !vlans.iter().any(|v| v.id == *id)) {
        Some(missing) => Err(DeviceError::rejected(format!("VLAN {missing} does not exist"))),
        None => Ok(()),
    }
}

fn remove<T: Entity>(items: &mut Vec<T>, key: &EntityKey) -> Result<(), DeviceError> {
    let before = items.len();
    items.retain(|item| item.key() != *key);
    if items.len() == before {
        return Err(DeviceError::rejected(format!("{key} does not exist")));
    }
    Ok(())
}

fn upsert<T: Entity>(items: &mut Vec<T>, spec: T, kind: OperationKind) -> Result<(), DeviceError> {
    let key = spec.key();
    let existing = items.iter_mut().find(|item| item.key() == key);
    match (kind, existing) {
        (OperationKind::Create, None) => items.push(spec),
        (OperationKind::Update, Some(slot)) => *slot = spec,
        (OperationKind::Create, Some(_)) => {
            return Err(DeviceError::rejected(format!("{key} already exists")));
        }
        (OperationKind::Update, None) => {
            return Err(DeviceError::rejected(format!("{key} does not exist")));
        }
        (OperationKind::Delete, _) => {
            return Err(DeviceError::protocol(format!("delete of {key} carries desired state")));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use vlanops_core::{DeviceErrorKind, VlanDefinition};

    use super::*;

    fn vlan_op(id: u16, name: &str) -> PlanOperation {
        PlanOperation::create(VlanDefinition::new(id, name))
    }

    #[tokio::test]
    async fn missing_file_reads_as_blank_device() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = StateFileDevice::new(dir.path().join("sw1.json"));
        assert!(device.read_live().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn push_persists_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sw1.json");
        let mut device = StateFileDevice::new(&path);
        device.push(&vlan_op(20, "Eng")).await.unwrap();
        device.push(&vlan_op(10, "Sales")).await.unwrap();

        let live = device.read_live().await.unwrap();
        let ids: Vec<u16> = live.vlans().iter().map(|v| v.id.get()).collect();
        assert_eq!(ids, [10, 20]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn interface_with_missing_vlan_is_rejected() {
        let op = PlanOperation::create(InterfaceAssignment::access("Gi0/1", Some(VlanId::from(30))));
        let err = apply_to(Topology::default(), &op).unwrap_err();
        assert_eq!(err.kind(), DeviceErrorKind::Rejected);
        assert_eq!(err.message(), "VLAN 30 does not exist");
    }

    #[test]
    fn vlan_in_use_cannot_be_deleted() {
        let live = Topology::from_parts(
            vec![VlanDefinition::new(10, "Sales")],
            vec![InterfaceAssignment::access("Gi0/1", Some(VlanId::from(10)))],
            vec![],
        );
        let err = apply_to(live, &PlanOperation::delete("vlan:10".parse().unwrap())).unwrap_err();
        assert_eq!(err.message(), "VLAN 10 is still used by interface:Gi0/1");
    }

    #[test]
    fn creating_twice_is_rejected() {
        let live = apply_to(Topology::default(), &vlan_op(10, "Sales")).unwrap();
        let err = apply_to(live, &vlan_op(10, "Sales")).unwrap_err();
        assert_eq!(err.message(), "vlan:10 already exists");
    }

    #[test]
    fn update_replaces_in_place() {
        let live = apply_to(Topology::default(), &vlan_op(10, "Sales")).unwrap();
        let current = VlanDefinition::new(10, "Sales");
        let desired = VlanDefinition::new(10, "Sales-Floor");
        let op = PlanOperation::update(desired.clone(), current.changes_to(&desired), false);
        let live = apply_to(live, &op).unwrap();
        assert_eq!(live.vlans(), [desired]);
    }

    #[test]
    fn deleting_absent_entity_is_rejected() {
        let err = apply_to(Topology::default(), &PlanOperation::delete("interface:Gi0/9".parse().unwrap()))
            .unwrap_err();
        assert_eq!(err.message(), "interface:Gi0/9 does not exist");
    }
}
