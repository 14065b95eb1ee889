// ── Physical interface assignments ──

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::Display;

use super::vlan::VlanId;

// ── InterfaceName ───────────────────────────────────────────────────

/// Interface name as the device spells it (`GigabitEthernet0/0/0/1`, `Gi0/10`).
///
/// Ordering is "natural": numeric runs compare by value, so `Gi0/2`
/// sorts before `Gi0/10`. Names that compare naturally equal but differ
/// textually (`Gi01` vs `Gi1`) fall back to plain string order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceName(String);

impl InterfaceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InterfaceName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for InterfaceName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Ord for InterfaceName {
    fn cmp(&self, other: &Self) -> Ordering {
        natural_cmp(&self.0, &other.0).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for InterfaceName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Splits a name into alternating digit / non-digit runs.
struct Runs<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Runs<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let first = self.rest.chars().next()?;
        let numeric = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != numeric)
            .map_or(self.rest.len(), |(i, _)| i);
        let (run, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(run)
    }
}

fn is_numeric(run: &str) -> bool {
    run.bytes().all(|b| b.is_ascii_digit())
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Runs { rest: a };
    let mut right = Runs { rest: b };
    loop {
        let ord = match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if is_numeric(x) && is_numeric(y) => {
                let x = x.trim_start_matches('0');
                let y = y.trim_start_matches('0');
                x.len().cmp(&y.len()).then_with(|| x.cmp(y))
            }
            (Some(x), Some(y)) => x.cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
}

// ── Port mode ───────────────────────────────────────────────────────

/// The `mode` discriminator as it appears in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModeKind {
    Access,
    Trunk,
    Routed,
}

/// Switchport configuration of a physical interface.
///
/// `Routed` has no switchport VLANs; it is the parent of dot1q
/// subinterfaces on routed platforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortMode {
    Access { vlan: Option<VlanId> },
    Trunk { allowed: BTreeSet<VlanId> },
    Routed,
}

impl PortMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Self::Access { .. } => ModeKind::Access,
            Self::Trunk { .. } => ModeKind::Trunk,
            Self::Routed => ModeKind::Routed,
        }
    }

    /// VLAN ids this mode depends on, ascending.
    pub fn referenced_vlans(&self) -> Vec<VlanId> {
        match self {
            Self::Access { vlan } => vlan.iter().copied().collect(),
            Self::Trunk { allowed } => allowed.iter().copied().collect(),
            Self::Routed => Vec::new(),
        }
    }
}

impl fmt::Display for PortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access { vlan: Some(vlan) } => write!(f, "access vlan {vlan}"),
            Self::Access { vlan: None } => f.write_str("access"),
            Self::Trunk { allowed } => {
                let list: Vec<String> = allowed.iter().map(ToString::to_string).collect();
                write!(f, "trunk allowed [{}]", list.join(","))
            }
            Self::Routed => f.write_str("routed"),
        }
    }
}

// ── InterfaceAssignment ─────────────────────────────────────────────

/// Desired (or observed) configuration of one physical interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "InterfaceRecord", into = "InterfaceRecord")]
pub struct InterfaceAssignment {
    pub name: InterfaceName,
    pub mode: PortMode,
    pub description: String,
}

impl InterfaceAssignment {
    pub fn access(name: impl Into<InterfaceName>, vlan: Option<VlanId>) -> Self {
        Self {
            name: name.into(),
            mode: PortMode::Access { vlan },
            description: String::new(),
        }
    }

    pub fn trunk(name: impl Into<InterfaceName>, allowed: impl IntoIterator<Item = VlanId>) -> Self {
        Self {
            name: name.into(),
            mode: PortMode::Trunk {
                allowed: allowed.into_iter().collect(),
            },
            description: String::new(),
        }
    }

    pub fn routed(name: impl Into<InterfaceName>) -> Self {
        Self {
            name: name.into(),
            mode: PortMode::Routed,
            description: String::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Flat JSON shape: `{name, mode, access_vlan?, trunk_vlans?, description?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct InterfaceRecord {
    #[serde(alias = "interface", alias = "physical_interface")]
    name: InterfaceName,
    mode: ModeKind,
    #[serde(default, alias = "vlan", skip_serializing_if = "Option::is_none")]
    access_vlan: Option<VlanId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trunk_vlans: Option<Vec<VlanId>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
}

impl TryFrom<InterfaceRecord> for InterfaceAssignment {
    type Error = String;

    fn try_from(record: InterfaceRecord) -> Result<Self, Self::Error> {
        let mode = match (record.mode, record.access_vlan, record.trunk_vlans) {
            (ModeKind::Access, vlan, None) => PortMode::Access { vlan },
            (ModeKind::Trunk, None, allowed) => PortMode::Trunk {
                allowed: allowed.unwrap_or_default().into_iter().collect(),
            },
            (ModeKind::Routed, None, None) => PortMode::Routed,
            (ModeKind::Access, _, Some(_)) => {
                return Err(format!(
                    "interface {}: trunk_vlans is not allowed in access mode",
                    record.name
                ));
            }
            (kind, Some(_), _) => {
                return Err(format!(
                    "interface {}: access_vlan is not allowed in {kind} mode",
                    record.name
                ));
            }
            (ModeKind::Routed, None, Some(_)) => {
                return Err(format!(
                    "interface {}: trunk_vlans is not allowed in routed mode",
                    record.name
                ));
            }
        };
        Ok(Self {
            name: record.name,
            mode,
            description: record.description,
        })
    }
}

impl From<InterfaceAssignment> for InterfaceRecord {
    fn from(assignment: InterfaceAssignment) -> Self {
        let kind = assignment.mode.kind();
        let (access_vlan, trunk_vlans) = match assignment.mode {
            PortMode::Access { vlan } => (vlan, None),
            PortMode::Trunk { allowed } => (None, Some(allowed.into_iter().collect())),
            PortMode::Routed => (None, None),
        };
        Self {
            name: assignment.name,
            mode: kind,
            access_vlan,
            trunk_vlans,
            description: assignment.description,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn natural_ordering_compares_numbers_by_value() {
        let mut names: Vec<InterfaceName> = ["Gi0/10", "Gi0/2", "Gi0/1", "Fa0/24", "Gi1/0"]
            .into_iter()
            .map(InterfaceName::from)
            .collect();
        names.sort();
        let sorted: Vec<&str> = names.iter().map(InterfaceName::as_str).collect();
        assert_eq!(sorted, ["Fa0/24", "Gi0/1", "Gi0/2", "Gi0/10", "Gi1/0"]);
    }

    #[test]
    fn natural_ordering_is_consistent_with_eq() {
        let a = InterfaceName::from("Gi01");
        let b = InterfaceName::from("Gi1");
        assert_ne!(a, b);
        assert_ne!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn access_interface_accepts_legacy_field_names() {
        let json = r#"{"interface": "Gi0/1", "mode": "access", "vlan": 10, "description": "PC"}"#;
        let iface: InterfaceAssignment = serde_json::from_str(json).unwrap();
        assert_eq!(
            iface,
            InterfaceAssignment::access("Gi0/1", Some(VlanId::from(10))).with_description("PC")
        );
    }

    #[test]
    fn trunk_interface_deduplicates_allowed_vlans() {
        let json = r#"{"name": "Gi0/24", "mode": "trunk", "trunk_vlans": [30, 10, 30]}"#;
        let iface: InterfaceAssignment = serde_json::from_str(json).unwrap();
        assert_eq!(iface.mode.referenced_vlans(), vec![VlanId::from(10), VlanId::from(30)]);
    }

    #[test]
    fn access_vlan_rejected_in_trunk_mode() {
        let json = r#"{"name": "Gi0/24", "mode": "trunk", "access_vlan": 10}"#;
        let err = serde_json::from_str::<InterfaceAssignment>(json).unwrap_err();
        assert!(err.to_string().contains("access_vlan is not allowed in trunk mode"));
    }

    #[test]
    fn trunk_vlans_rejected_in_access_mode() {
        let json = r#"{"name": "Gi0/1", "mode": "access", "trunk_vlans": [10]}"#;
        assert!(serde_json::from_str::<InterfaceAssignment>(json).is_err());
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let json = r#"{"name": "Gi0/1", "mode": "dynamic"}"#;
        assert!(serde_json::from_str::<InterfaceAssignment>(json).is_err());
    }

    #[test]
    fn serializes_back_to_flat_shape() {
        let iface = InterfaceAssignment::trunk("Gi0/24", [VlanId::from(20), VlanId::from(10)]);
        let value = serde_json::to_value(&iface).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"name": "Gi0/24", "mode": "trunk", "trunk_vlans": [10, 20]})
        );
    }

    #[test]
    fn port_mode_display() {
        assert_eq!(
            PortMode::Access { vlan: Some(VlanId::from(10)) }.to_string(),
            "access vlan 10"
        );
        assert_eq!(
            InterfaceAssignment::trunk("Gi0/1", [VlanId::from(10), VlanId::from(20)])
                .mode
                .to_string(),
            "trunk allowed [10,20]"
        );
    }
}
