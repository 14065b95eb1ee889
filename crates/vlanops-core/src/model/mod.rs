// ── Topology domain model ──
//
// Typed representation of the three entity kinds vlanops manages. Every
// type rejects unknown or conflicting fields at the JSON boundary.

pub mod entity;
pub mod interface;
pub mod subinterface;
pub mod vlan;

// ── Re-exports ──────────────────────────────────────────────────────

pub use entity::{Entity, EntityKey, EntityKind, EntitySpec, FieldChange};
pub use interface::{InterfaceAssignment, InterfaceName, ModeKind, PortMode};
pub use subinterface::{Ipv4Mask, Ipv4Subnet, Subinterface};
pub use vlan::{VlanDefinition, VlanId};
