// ── Live device state ──

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::SchemaError;
use crate::model::{Entity, EntityKey, InterfaceAssignment, Subinterface, VlanDefinition};
use crate::topology::Topology;

/// Whether vlanops owns an entity's lifecycle on the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Ownership {
    Managed,
    #[default]
    Unmanaged,
}

/// A device entity together with its ownership tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Owned<T> {
    #[serde(default)]
    pub ownership: Ownership,
    pub spec: T,
}

impl<T> Owned<T> {
    pub fn managed(spec: T) -> Self {
        Self {
            ownership: Ownership::Managed,
            spec,
        }
    }

    pub fn unmanaged(spec: T) -> Self {
        Self {
            ownership: Ownership::Unmanaged,
            spec,
        }
    }

    pub fn is_managed(&self) -> bool {
        self.ownership == Ownership::Managed
    }
}

/// Current device configuration, each entity tagged with ownership.
///
/// Same shape as [`Topology`]. Produced by a device state reader and
/// only ever read by the planner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceSnapshot {
    #[serde(default)]
    vlans: Vec<Owned<VlanDefinition>>,
    #[serde(default)]
    interfaces: Vec<Owned<InterfaceAssignment>>,
    #[serde(default)]
    subinterfaces: Vec<Owned<Subinterface>>,
}

impl DeviceSnapshot {
    /// An empty device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every entity of a live topology using `ownership_of`.
    pub fn tag(live: Topology, ownership_of: impl Fn(&EntityKey) -> Ownership) -> Self {
        fn wrap<T: Entity>(items: Vec<T>, ownership_of: &impl Fn(&EntityKey) -> Ownership) -> Vec<Owned<T>> {
            items
                .into_iter()
                .map(|spec| Owned {
                    ownership: ownership_of(&spec.key()),
                    spec,
                })
                .collect()
        }

        let (vlans, interfaces, subinterfaces) = live.into_parts();
        Self {
            vlans: wrap(vlans, &ownership_of),
            interfaces: wrap(interfaces, &ownership_of),
            subinterfaces: wrap(subinterfaces, &ownership_of),
        }
    }

    /// Every entity tagged managed: the state a device is in right after
    /// vlanops has converged it.
    pub fn all_managed(live: Topology) -> Self {
        Self::tag(live, |_| Ownership::Managed)
    }

    /// Every entity tagged unmanaged: a device vlanops has never touched.
    pub fn all_unmanaged(live: Topology) -> Self {
        Self::tag(live, |_| Ownership::Unmanaged)
    }

    /// Parse a tagged snapshot document.
    pub fn load(raw: &str) -> Result<Self, SchemaError> {
        let de = &mut serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize(de).map_err(|e| SchemaError::from_path_error(&e))
    }

    pub fn vlans(&self) -> &[Owned<VlanDefinition>] {
        &self.vlans
    }

    pub fn interfaces(&self) -> &[Owned<InterfaceAssignment>] {
        &self.interfaces
    }

    pub fn subinterfaces(&self) -> &[Owned<Subinterface>] {
        &self.subinterfaces
    }

    /// Identity and ownership of every entity, in plan order.
    pub fn entries(&self) -> Vec<(EntityKey, Ownership)> {
        let mut entries: Vec<(EntityKey, Ownership)> = self
            .vlans
            .iter()
            .map(|o| (o.spec.key(), o.ownership))
            .chain(self.interfaces.iter().map(|o| (o.spec.key(), o.ownership)))
            .chain(self.subinterfaces.iter().map(|o| (o.spec.key(), o.ownership)))
            .collect();
        entries.sort();
        entries
    }

    pub fn managed_keys(&self) -> BTreeSet<EntityKey> {
        self.entries()
            .into_iter()
            .filter(|(_, ownership)| *ownership == Ownership::Managed)
            .map(|(key, _)| key)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.vlans.is_empty() && self.interfaces.is_empty() && self.subinterfaces.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ownership_defaults_to_unmanaged() {
        let raw = r#"{"vlans": [{"spec": {"id": 1, "name": "default"}}]}"#;
        let snapshot = DeviceSnapshot::load(raw).unwrap();
        assert_eq!(snapshot.vlans()[0].ownership, Ownership::Unmanaged);
        assert!(snapshot.managed_keys().is_empty());
    }

    #[test]
    fn tag_consults_the_callback_per_entity() {
        let live = Topology::from_parts(
            vec![VlanDefinition::new(10, "Mgmt"), VlanDefinition::new(20, "Voice")],
            vec![],
            vec![],
        );
        let snapshot = DeviceSnapshot::tag(live, |key| {
            if key.to_string() == "vlan:10" {
                Ownership::Managed
            } else {
                Ownership::Unmanaged
            }
        });
        let keys: Vec<String> = snapshot.managed_keys().iter().map(ToString::to_string).collect();
        assert_eq!(keys, ["vlan:10"]);
    }

    #[test]
    fn snapshot_rejects_untagged_entities() {
        let raw = r#"{"vlans": [{"id": 1, "name": "default"}]}"#;
        assert!(DeviceSnapshot::load(raw).is_err());
    }
}
