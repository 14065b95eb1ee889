// ── Desired topology ──
//
// The declared end state: loaded once per run, validated, diffed, then
// dropped. Nothing mutates a `Topology` after it is built.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SchemaError;
use crate::model::{Entity, EntityKey, InterfaceAssignment, Subinterface, VlanDefinition};

/// Desired VLANs, interface assignments and subinterfaces, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Topology {
    vlans: Vec<VlanDefinition>,
    interfaces: Vec<InterfaceAssignment>,
    subinterfaces: Vec<Subinterface>,
}

/// Wire shape of a topology document. All three collections are optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TopologyDocument {
    #[serde(default)]
    vlans: Vec<VlanDefinition>,
    #[serde(default)]
    interfaces: Vec<InterfaceAssignment>,
    #[serde(default)]
    subinterfaces: Vec<Subinterface>,
}

impl Topology {
    /// Parse and strictly check a JSON topology document.
    ///
    /// Rejects malformed JSON, missing or unknown fields, VLAN definitions
    /// outside 1-4094, and duplicate identities within one collection.
    /// Cross-entity consistency is the validator's job.
    pub fn load(raw: &str) -> Result<Self, SchemaError> {
        let de = &mut serde_json::Deserializer::from_str(raw);
        let doc: TopologyDocument =
            serde_path_to_error::deserialize(de).map_err(|e| SchemaError::from_path_error(&e))?;

        for vlan in &doc.vlans {
            if !vlan.id.is_valid() {
                return Err(SchemaError::VlanIdOutOfRange {
                    entity: vlan.key(),
                    vlan_id: vlan.id.get(),
                });
            }
        }
        reject_duplicates("vlans", &doc.vlans)?;
        reject_duplicates("interfaces", &doc.interfaces)?;
        reject_duplicates("subinterfaces", &doc.subinterfaces)?;

        debug!(
            vlans = doc.vlans.len(),
            interfaces = doc.interfaces.len(),
            subinterfaces = doc.subinterfaces.len(),
            "topology loaded"
        );
        Ok(Self::from_parts(doc.vlans, doc.interfaces, doc.subinterfaces))
    }

    /// Read a topology document from disk and [`load`](Self::load) it.
    pub fn load_file(path: &Path) -> Result<Self, SchemaError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load(&raw)
    }

    /// Assemble a topology without load-time checks. Run the validator
    /// before planning against one of these.
    pub fn from_parts(
        vlans: Vec<VlanDefinition>,
        interfaces: Vec<InterfaceAssignment>,
        subinterfaces: Vec<Subinterface>,
    ) -> Self {
        Self {
            vlans,
            interfaces,
            subinterfaces,
        }
    }

    pub fn vlans(&self) -> &[VlanDefinition] {
        &self.vlans
    }

    pub fn interfaces(&self) -> &[InterfaceAssignment] {
        &self.interfaces
    }

    pub fn subinterfaces(&self) -> &[Subinterface] {
        &self.subinterfaces
    }

    pub fn is_empty(&self) -> bool {
        self.vlans.is_empty() && self.interfaces.is_empty() && self.subinterfaces.is_empty()
    }

    /// Every entity identity, in plan order (VLANs, interfaces, subinterfaces).
    pub fn keys(&self) -> BTreeSet<EntityKey> {
        self.vlans
            .iter()
            .map(Entity::key)
            .chain(self.interfaces.iter().map(Entity::key))
            .chain(self.subinterfaces.iter().map(Entity::key))
            .collect()
    }

    pub fn into_parts(self) -> (Vec<VlanDefinition>, Vec<InterfaceAssignment>, Vec<Subinterface>) {
        (self.vlans, self.interfaces, self.subinterfaces)
    }
}

fn reject_duplicates<T: Entity>(collection: &'static str, items: &[T]) -> Result<(), SchemaError> {
    let mut seen = BTreeSet::new();
    for item in items {
        let key = item.key();
        if !seen.insert(key.clone()) {
            return Err(SchemaError::Duplicate {
                collection,
                entity: key,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BRANCH: &str = r#"{
        "vlans": [
            {"id": 10, "name": "Sales", "description": "Sales VLAN"},
            {"id": 20, "name": "Engineering"}
        ],
        "interfaces": [
            {"name": "Gi0/1", "mode": "access", "access_vlan": 10},
            {"name": "Gi0/24", "mode": "trunk", "trunk_vlans": [10, 20]},
            {"name": "Gi0/0", "mode": "routed"}
        ],
        "subinterfaces": [
            {"parent_interface": "Gi0/0", "subinterface_id": 10, "vlan_id": 10,
             "ip_address": "10.10.10.1", "subnet_mask": "255.255.255.0"}
        ]
    }"#;

    #[test]
    fn loads_all_three_collections() {
        let topo = Topology::load(BRANCH).unwrap();
        assert_eq!(topo.vlans().len(), 2);
        assert_eq!(topo.interfaces().len(), 3);
        assert_eq!(topo.subinterfaces().len(), 1);
        assert_eq!(topo.vlans()[0].description, "Sales VLAN");
    }

    #[test]
    fn empty_document_is_an_empty_topology() {
        let topo = Topology::load("{}").unwrap();
        assert!(topo.is_empty());
    }

    #[test]
    fn missing_field_reports_json_path() {
        let err = Topology::load(r#"{"vlans": [{"id": 10, "name": "a"}, {"id": 20}]}"#).unwrap_err();
        match err {
            SchemaError::Malformed { path, message } => {
                assert_eq!(path, "vlans[1]");
                assert!(message.contains("name"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let err = Topology::load(r#"{"vlan": []}"#).unwrap_err();
        assert!(matches!(err, SchemaError::Malformed { .. }));
    }

    #[test]
    fn out_of_range_vlan_definition_is_rejected() {
        let err = Topology::load(r#"{"vlans": [{"id": 4095, "name": "bad"}]}"#).unwrap_err();
        match err {
            SchemaError::VlanIdOutOfRange { entity, vlan_id } => {
                assert_eq!(entity.to_string(), "vlan:4095");
                assert_eq!(vlan_id, 4095);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_vlan_id_is_rejected_at_load() {
        let raw = r#"{"vlans": [{"id": 10, "name": "a"}, {"id": 10, "name": "b"}]}"#;
        let err = Topology::load(raw).unwrap_err();
        assert_eq!(err.to_string(), "duplicate vlan:10 in `vlans`");
    }

    #[test]
    fn duplicate_subinterface_is_rejected_at_load() {
        let raw = r#"{"subinterfaces": [
            {"parent_interface": "Gi0/0", "subinterface_id": 10, "vlan_id": 10,
             "ip_address": "10.0.0.1", "subnet_mask": "255.255.255.0"},
            {"parent_interface": "Gi0/0", "subinterface_id": 10, "vlan_id": 20,
             "ip_address": "10.0.1.1", "subnet_mask": "255.255.255.0"}
        ]}"#;
        let err = Topology::load(raw).unwrap_err();
        assert!(matches!(err, SchemaError::Duplicate { collection: "subinterfaces", .. }));
    }

    #[test]
    fn keys_come_out_in_plan_order() {
        let topo = Topology::load(BRANCH).unwrap();
        let keys: Vec<String> = topo.keys().iter().map(ToString::to_string).collect();
        assert_eq!(
            keys,
            [
                "vlan:10",
                "vlan:20",
                "interface:Gi0/0",
                "interface:Gi0/1",
                "interface:Gi0/24",
                "subinterface:Gi0/0.10",
            ]
        );
    }

    #[test]
    fn load_file_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Topology::load_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SchemaError::Io { .. }));
    }

    #[test]
    fn serializes_back_to_document_shape() {
        let topo = Topology::from_parts(vec![VlanDefinition::new(10, "Mgmt")], vec![], vec![]);
        let value = serde_json::to_value(&topo).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"vlans": [{"id": 10, "name": "Mgmt"}], "interfaces": [], "subinterfaces": []})
        );
    }
}
