// ── Dot1q subinterfaces and IPv4 addressing ──

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::interface::InterfaceName;
use super::vlan::VlanId;

// ── Ipv4Mask ────────────────────────────────────────────────────────

/// A contiguous dotted-quad netmask (`255.255.255.0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Mask {
    prefix_len: u8,
}

impl Ipv4Mask {
    pub const MAX_PREFIX: u8 = 32;

    pub fn from_prefix(prefix_len: u8) -> Option<Self> {
        (prefix_len <= Self::MAX_PREFIX).then_some(Self { prefix_len })
    }

    /// Accepts only masks whose set bits are contiguous from the left.
    pub fn from_addr(mask: Ipv4Addr) -> Option<Self> {
        let bits = u32::from(mask);
        let prefix_len = bits.leading_ones();
        if bits.checked_shl(prefix_len).unwrap_or(0) != 0 {
            return None;
        }
        u8::try_from(prefix_len).ok().map(|prefix_len| Self { prefix_len })
    }

    pub const fn prefix_len(self) -> u8 {
        self.prefix_len
    }

    pub fn bits(self) -> u32 {
        match self.prefix_len {
            0 => 0,
            len => u32::MAX << (Self::MAX_PREFIX - len),
        }
    }

    pub fn as_addr(self) -> Ipv4Addr {
        Ipv4Addr::from(self.bits())
    }
}

impl fmt::Display for Ipv4Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_addr())
    }
}

impl TryFrom<String> for Ipv4Mask {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let addr: Ipv4Addr = raw
            .parse()
            .map_err(|_| format!("invalid subnet mask '{raw}'"))?;
        Self::from_addr(addr).ok_or_else(|| format!("subnet mask '{raw}' is not contiguous"))
    }
}

impl From<Ipv4Mask> for String {
    fn from(mask: Ipv4Mask) -> Self {
        mask.to_string()
    }
}

// ── Ipv4Subnet ──────────────────────────────────────────────────────

/// Network address plus prefix, derived from an interface address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Subnet {
    network: Ipv4Addr,
    mask: Ipv4Mask,
}

impl Ipv4Subnet {
    pub fn new(address: Ipv4Addr, mask: Ipv4Mask) -> Self {
        Self {
            network: Ipv4Addr::from(u32::from(address) & mask.bits()),
            mask,
        }
    }

    pub const fn network(self) -> Ipv4Addr {
        self.network
    }

    pub const fn mask(self) -> Ipv4Mask {
        self.mask
    }

    /// Two subnets overlap when one contains the other's network address.
    pub fn overlaps(self, other: Self) -> bool {
        let shorter = if self.mask.prefix_len <= other.mask.prefix_len {
            self.mask
        } else {
            other.mask
        };
        u32::from(self.network) & shorter.bits() == u32::from(other.network) & shorter.bits()
    }
}

impl fmt::Display for Ipv4Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.mask.prefix_len)
    }
}

// ── Subinterface ────────────────────────────────────────────────────

/// A dot1q subinterface (`GigabitEthernet0/0/0/0.10`) carrying one VLAN
/// and one IPv4 address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SubinterfaceRecord", into = "SubinterfaceRecord")]
pub struct Subinterface {
    pub parent_interface: InterfaceName,
    pub subinterface_id: u32,
    pub vlan_id: VlanId,
    pub ip_address: Ipv4Addr,
    pub subnet_mask: Ipv4Mask,
    pub description: String,
}

impl Subinterface {
    pub fn new(
        parent: impl Into<InterfaceName>,
        subinterface_id: u32,
        vlan_id: u16,
        ip_address: Ipv4Addr,
        subnet_mask: Ipv4Mask,
    ) -> Self {
        Self {
            parent_interface: parent.into(),
            subinterface_id,
            vlan_id: VlanId::from(vlan_id),
            ip_address,
            subnet_mask,
            description: String::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Device-facing name, `{parent}.{id}`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.parent_interface, self.subinterface_id)
    }

    pub fn subnet(&self) -> Ipv4Subnet {
        Ipv4Subnet::new(self.ip_address, self.subnet_mask)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SubinterfaceRecord {
    parent_interface: InterfaceName,
    subinterface_id: u32,
    /// Redundant full name written by older configs; must agree with parent + id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subinterface: Option<String>,
    vlan_id: VlanId,
    ip_address: Ipv4Addr,
    subnet_mask: Ipv4Mask,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
}

impl TryFrom<SubinterfaceRecord> for Subinterface {
    type Error = String;

    fn try_from(record: SubinterfaceRecord) -> Result<Self, Self::Error> {
        let subif = Self {
            parent_interface: record.parent_interface,
            subinterface_id: record.subinterface_id,
            vlan_id: record.vlan_id,
            ip_address: record.ip_address,
            subnet_mask: record.subnet_mask,
            description: record.description,
        };
        match record.subinterface {
            Some(declared) if declared != subif.name() => Err(format!(
                "subinterface name '{declared}' does not match parent_interface.subinterface_id ('{}')",
                subif.name()
            )),
            _ => Ok(subif),
        }
    }
}

impl From<Subinterface> for SubinterfaceRecord {
    fn from(subif: Subinterface) -> Self {
        Self {
            parent_interface: subif.parent_interface,
            subinterface_id: subif.subinterface_id,
            subinterface: None,
            vlan_id: subif.vlan_id,
            ip_address: subif.ip_address,
            subnet_mask: subif.subnet_mask,
            description: subif.description,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn mask(raw: &str) -> Ipv4Mask {
        Ipv4Mask::try_from(raw.to_owned()).unwrap()
    }

    #[test]
    fn mask_parses_contiguous_masks() {
        assert_eq!(mask("255.255.255.0").prefix_len(), 24);
        assert_eq!(mask("255.255.255.252").prefix_len(), 30);
        assert_eq!(mask("0.0.0.0").prefix_len(), 0);
        assert_eq!(mask("255.255.255.255").prefix_len(), 32);
    }

    #[test]
    fn mask_rejects_holes_and_garbage() {
        assert!(Ipv4Mask::try_from("255.0.255.0".to_owned()).is_err());
        assert!(Ipv4Mask::try_from("255.255.255.1".to_owned()).is_err());
        assert!(Ipv4Mask::try_from("/24".to_owned()).is_err());
    }

    #[test]
    fn subnet_normalizes_network_address() {
        let subnet = Ipv4Subnet::new("10.10.10.1".parse().unwrap(), mask("255.255.255.0"));
        assert_eq!(subnet.to_string(), "10.10.10.0/24");
    }

    #[test]
    fn overlap_detects_containment_both_ways() {
        let wide = Ipv4Subnet::new("10.10.0.1".parse().unwrap(), mask("255.255.0.0"));
        let narrow = Ipv4Subnet::new("10.10.20.1".parse().unwrap(), mask("255.255.255.0"));
        let other = Ipv4Subnet::new("10.11.20.1".parse().unwrap(), mask("255.255.255.0"));
        assert!(wide.overlaps(narrow));
        assert!(narrow.overlaps(wide));
        assert!(!narrow.overlaps(other));
        assert!(!wide.overlaps(other));
    }

    #[test]
    fn subinterface_parses_iosxr_shape() {
        let json = r#"{
            "parent_interface": "GigabitEthernet0/0/0/0",
            "subinterface": "GigabitEthernet0/0/0/0.10",
            "subinterface_id": 10,
            "vlan_id": 10,
            "ip_address": "10.10.10.1",
            "subnet_mask": "255.255.255.0",
            "description": "Sales"
        }"#;
        let subif: Subinterface = serde_json::from_str(json).unwrap();
        assert_eq!(subif.name(), "GigabitEthernet0/0/0/0.10");
        assert_eq!(subif.vlan_id, VlanId::from(10));
        assert_eq!(subif.subnet().to_string(), "10.10.10.0/24");
    }

    #[test]
    fn subinterface_rejects_mismatched_name() {
        let json = r#"{
            "parent_interface": "Gi0/0",
            "subinterface": "Gi0/0.20",
            "subinterface_id": 10,
            "vlan_id": 10,
            "ip_address": "10.10.10.1",
            "subnet_mask": "255.255.255.0"
        }"#;
        let err = serde_json::from_str::<Subinterface>(json).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }
}
