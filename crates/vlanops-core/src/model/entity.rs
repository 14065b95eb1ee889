// ── Entity identity ──
//
// Every entity kind has a stable identity (`EntityKey`) used to line up
// desired and current state, and a field-level diff used to decide
// between "no change", "update" and "conflict".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::Display;

use super::interface::{InterfaceAssignment, InterfaceName, PortMode};
use super::subinterface::Subinterface;
use super::vlan::{VlanDefinition, VlanId};

/// The three kinds of configuration entity vlanops manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
    Vlan,
    Interface,
    Subinterface,
}

// ── EntityKey ───────────────────────────────────────────────────────

/// Stable identity of an entity: VLAN id, interface name, or parent + id.
///
/// Ordering is kind first (VLANs, interfaces, subinterfaces), then
/// ascending identity within the kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EntityKey {
    Vlan(VlanId),
    Interface(InterfaceName),
    Subinterface { parent: InterfaceName, id: u32 },
}

impl EntityKey {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Vlan(_) => EntityKind::Vlan,
            Self::Interface(_) => EntityKind::Interface,
            Self::Subinterface { .. } => EntityKind::Subinterface,
        }
    }

    /// The identity without the kind prefix (`10`, `Gi0/1`, `Gi0/0.10`).
    pub fn identity(&self) -> String {
        match self {
            Self::Vlan(id) => id.to_string(),
            Self::Interface(name) => name.to_string(),
            Self::Subinterface { parent, id } => format!("{parent}.{id}"),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.identity())
    }
}

impl FromStr for EntityKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, identity) = s
            .split_once(':')
            .ok_or_else(|| format!("'{s}' is not of the form <kind>:<identity>"))?;
        match kind {
            "vlan" => identity
                .parse::<u16>()
                .map(|id| Self::Vlan(VlanId::from(id)))
                .map_err(|_| format!("'{identity}' is not a VLAN id")),
            "interface" if identity.is_empty() => Err("empty interface name".into()),
            "interface" => Ok(Self::Interface(identity.into())),
            "subinterface" => {
                let (parent, id) = identity
                    .rsplit_once('.')
                    .ok_or_else(|| format!("'{identity}' is not of the form <parent>.<id>"))?;
                if parent.is_empty() {
                    return Err("empty parent interface name".into());
                }
                let id = id
                    .parse::<u32>()
                    .map_err(|_| format!("'{id}' is not a subinterface id"))?;
                Ok(Self::Subinterface {
                    parent: parent.into(),
                    id,
                })
            }
            other => Err(format!(
                "unknown entity kind '{other}' (expected vlan, interface or subinterface)"
            )),
        }
    }
}

impl TryFrom<String> for EntityKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EntityKey> for String {
    fn from(key: EntityKey) -> Self {
        key.to_string()
    }
}

// ── FieldChange ─────────────────────────────────────────────────────

/// One field that differs between current and desired state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub from: String,
    pub to: String,
}

impl FieldChange {
    fn new(field: &str, from: impl fmt::Display, to: impl fmt::Display) -> Self {
        Self {
            field: field.to_owned(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?} -> {:?}", self.field, self.from, self.to)
    }
}

fn push_if_changed<T: PartialEq + fmt::Display>(
    changes: &mut Vec<FieldChange>,
    field: &str,
    current: &T,
    desired: &T,
) {
    if current != desired {
        changes.push(FieldChange::new(field, current, desired));
    }
}

// ── EntitySpec ──────────────────────────────────────────────────────

/// Any one entity, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "spec", rename_all = "lowercase")]
pub enum EntitySpec {
    Vlan(VlanDefinition),
    Interface(InterfaceAssignment),
    Subinterface(Subinterface),
}

impl EntitySpec {
    pub fn key(&self) -> EntityKey {
        match self {
            Self::Vlan(v) => v.key(),
            Self::Interface(i) => i.key(),
            Self::Subinterface(s) => s.key(),
        }
    }
}

// ── Entity trait ────────────────────────────────────────────────────

/// Shared behaviour the planner needs from every entity kind.
pub trait Entity: Clone + PartialEq {
    const KIND: EntityKind;

    /// Fields that cannot be changed in place; a difference is a conflict.
    const IMMUTABLE_FIELDS: &'static [&'static str] = &[];

    fn key(&self) -> EntityKey;

    /// VLAN ids this entity depends on.
    fn vlan_refs(&self) -> Vec<VlanId>;

    /// Field-level differences going from `self` (current) to `desired`.
    fn changes_to(&self, desired: &Self) -> Vec<FieldChange>;

    fn into_spec(self) -> EntitySpec;

    /// One-line human summary of the entity's desired state.
    fn summary(&self) -> String;
}

impl Entity for VlanDefinition {
    const KIND: EntityKind = EntityKind::Vlan;

    fn key(&self) -> EntityKey {
        EntityKey::Vlan(self.id)
    }

    fn vlan_refs(&self) -> Vec<VlanId> {
        Vec::new()
    }

    fn changes_to(&self, desired: &Self) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        push_if_changed(&mut changes, "name", &self.name, &desired.name);
        push_if_changed(&mut changes, "description", &self.description, &desired.description);
        changes
    }

    fn into_spec(self) -> EntitySpec {
        EntitySpec::Vlan(self)
    }

    fn summary(&self) -> String {
        format!("vlan {} name {:?}", self.id, self.name)
    }
}

impl Entity for InterfaceAssignment {
    const KIND: EntityKind = EntityKind::Interface;

    fn key(&self) -> EntityKey {
        EntityKey::Interface(self.name.clone())
    }

    fn vlan_refs(&self) -> Vec<VlanId> {
        self.mode.referenced_vlans()
    }

    fn changes_to(&self, desired: &Self) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        match (&self.mode, &desired.mode) {
            (PortMode::Access { vlan: current }, PortMode::Access { vlan: wanted }) => {
                if current != wanted {
                    changes.push(FieldChange::new(
                        "access_vlan",
                        display_opt(*current),
                        display_opt(*wanted),
                    ));
                }
            }
            (PortMode::Trunk { allowed: current }, PortMode::Trunk { allowed: wanted }) => {
                if current != wanted {
                    changes.push(FieldChange::new(
                        "trunk_vlans",
                        join_vlans(current),
                        join_vlans(wanted),
                    ));
                }
            }
            (PortMode::Routed, PortMode::Routed) => {}
            (current, wanted) => changes.push(FieldChange::new("mode", current, wanted)),
        }
        push_if_changed(&mut changes, "description", &self.description, &desired.description);
        changes
    }

    fn into_spec(self) -> EntitySpec {
        EntitySpec::Interface(self)
    }

    fn summary(&self) -> String {
        format!("interface {} {}", self.name, self.mode)
    }
}

impl Entity for Subinterface {
    const KIND: EntityKind = EntityKind::Subinterface;
    const IMMUTABLE_FIELDS: &'static [&'static str] = &["vlan_id"];

    fn key(&self) -> EntityKey {
        EntityKey::Subinterface {
            parent: self.parent_interface.clone(),
            id: self.subinterface_id,
        }
    }

    fn vlan_refs(&self) -> Vec<VlanId> {
        vec![self.vlan_id]
    }

    fn changes_to(&self, desired: &Self) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        push_if_changed(&mut changes, "vlan_id", &self.vlan_id, &desired.vlan_id);
        push_if_changed(&mut changes, "ip_address", &self.ip_address, &desired.ip_address);
        push_if_changed(&mut changes, "subnet_mask", &self.subnet_mask, &desired.subnet_mask);
        push_if_changed(&mut changes, "description", &self.description, &desired.description);
        changes
    }

    fn into_spec(self) -> EntitySpec {
        EntitySpec::Subinterface(self)
    }

    fn summary(&self) -> String {
        format!(
            "subinterface {} dot1q {} address {} {}",
            self.name(),
            self.vlan_id,
            self.ip_address,
            self.subnet_mask
        )
    }
}

fn display_opt(vlan: Option<VlanId>) -> String {
    vlan.map_or_else(|| "none".to_owned(), |v| v.to_string())
}

fn join_vlans<'a>(vlans: impl IntoIterator<Item = &'a VlanId>) -> String {
    vlans
        .into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn entity_key_round_trips_through_strings() {
        for raw in ["vlan:10", "interface:Gi0/1", "subinterface:GigabitEthernet0/0/0/0.10"] {
            let key: EntityKey = raw.parse().unwrap();
            assert_eq!(key.to_string(), raw);
        }
    }

    #[test]
    fn entity_key_rejects_malformed_input() {
        assert!("vlan".parse::<EntityKey>().is_err());
        assert!("vlan:ten".parse::<EntityKey>().is_err());
        assert!("port:Gi0/1".parse::<EntityKey>().is_err());
        assert!("subinterface:Gi0/0".parse::<EntityKey>().is_err());
        assert!("interface:".parse::<EntityKey>().is_err());
    }

    #[test]
    fn entity_key_names_the_empty_interface() {
        assert_eq!(
            "interface:".parse::<EntityKey>().unwrap_err(),
            "empty interface name"
        );
        assert_eq!(
            "subinterface:.10".parse::<EntityKey>().unwrap_err(),
            "empty parent interface name"
        );
    }

    #[test]
    fn entity_keys_order_by_kind_then_identity() {
        let mut keys: Vec<EntityKey> = [
            "subinterface:Gi0/0.20",
            "interface:Gi0/10",
            "vlan:20",
            "interface:Gi0/2",
            "subinterface:Gi0/0.3",
            "vlan:3",
        ]
        .into_iter()
        .map(|k| k.parse().unwrap())
        .collect();
        keys.sort();
        let ordered: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(
            ordered,
            [
                "vlan:3",
                "vlan:20",
                "interface:Gi0/2",
                "interface:Gi0/10",
                "subinterface:Gi0/0.3",
                "subinterface:Gi0/0.20",
            ]
        );
    }

    #[test]
    fn vlan_changes_report_renames() {
        let current = VlanDefinition::new(10, "Mgmt");
        let desired = VlanDefinition::new(10, "Management");
        let changes = current.changes_to(&desired);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].to_string(), r#"name: "Mgmt" -> "Management""#);
    }

    #[test]
    fn interface_mode_switch_is_a_single_change() {
        let current = InterfaceAssignment::access("Gi0/1", Some(VlanId::from(10)));
        let desired = InterfaceAssignment::trunk("Gi0/1", [VlanId::from(10), VlanId::from(20)]);
        let changes = current.changes_to(&desired);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "mode");
        assert_eq!(changes[0].to, "trunk allowed [10,20]");
    }

    #[test]
    fn entity_spec_uses_adjacent_tagging() {
        let spec = VlanDefinition::new(10, "Mgmt").into_spec();
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"kind": "vlan", "spec": {"id": 10, "name": "Mgmt"}})
        );
        let back: EntitySpec = serde_json::from_value(value).unwrap();
        assert_eq!(back.key().to_string(), "vlan:10");
    }
}
