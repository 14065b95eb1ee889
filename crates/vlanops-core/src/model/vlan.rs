// ── VLAN domain types ──

use serde::{Deserialize, Serialize};
use std::fmt;

/// 802.1Q VLAN identifier.
///
/// Deserialization does not range-check: definitions are checked when a
/// topology is loaded, references are checked by the validator, so a bad id
/// is always reported with the entity that carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VlanId(u16);

impl VlanId {
    /// Lowest assignable VLAN id.
    pub const MIN: u16 = 1;
    /// Highest assignable VLAN id (4095 is reserved).
    pub const MAX: u16 = 4094;

    /// Wrap a raw id, rejecting values outside `1..=4094`.
    pub fn new(raw: u16) -> Option<Self> {
        let id = Self(raw);
        id.is_valid().then_some(id)
    }

    pub const fn get(self) -> u16 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 >= Self::MIN && self.0 <= Self::MAX
    }
}

impl From<u16> for VlanId {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A VLAN declared in the desired topology or found on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VlanDefinition {
    pub id: VlanId,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl VlanDefinition {
    pub fn new(id: u16, name: impl Into<String>) -> Self {
        Self {
            id: VlanId::from(id),
            name: name.into(),
            description: String::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn vlan_id_range() {
        assert!(VlanId::new(0).is_none());
        assert!(VlanId::new(1).is_some());
        assert!(VlanId::new(4094).is_some());
        assert!(VlanId::new(4095).is_none());
        assert!(!VlanId::from(4095).is_valid());
    }

    #[test]
    fn vlan_definition_description_defaults_to_empty() {
        let vlan: VlanDefinition = serde_json::from_str(r#"{"id": 10, "name": "Mgmt"}"#).unwrap();
        assert_eq!(vlan, VlanDefinition::new(10, "Mgmt"));
    }

    #[test]
    fn vlan_definition_rejects_unknown_fields() {
        let err = serde_json::from_str::<VlanDefinition>(r#"{"id": 10, "name": "Mgmt", "mtu": 9000}"#)
            .unwrap_err();
        assert!(err.to_string().contains("mtu"));
    }
}
