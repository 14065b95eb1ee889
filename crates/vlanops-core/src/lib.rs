//! Validating differ/planner for VLAN, interface and subinterface deployments.
//!
//! The pipeline is load → validate → plan → (approval) → execute:
//!
//! - **[`Topology`]**: the declared desired state, parsed strictly from
//!   JSON by [`Topology::load`].
//! - **[`validate()`]**: accumulating consistency checks (dangling VLAN and
//!   parent references, duplicate ids, overlapping subnets, VLAN range).
//! - **[`plan()`]**: three-way diff of a `Topology` against an
//!   ownership-tagged [`DeviceSnapshot`], emitting an ordered, minimal
//!   list of [`PlanOperation`]s. Unmanaged device entities are never
//!   deleted or left without their VLAN or parent; updating one adopts it.
//! - **[`execute()`]**: sequential, fail-fast dispatch of a [`Plan`] to an
//!   [`Executor`].
//! - **[`OwnershipLedger`]**: the persisted set of entities vlanops owns on
//!   a device, used to tag live state.
//!
//! Device transports live in `vlanops-device`; this crate performs no I/O
//! beyond reading topology files and the ledger.

pub mod device;
pub mod error;
pub mod execute;
pub mod ledger;
pub mod model;
pub mod plan;
pub mod snapshot;
pub mod topology;
pub mod validate;

// ── Primary re-exports ──────────────────────────────────────────────
pub use device::{DeviceStateReader, Executor};
pub use error::{CoreError, DeviceError, DeviceErrorKind, SchemaError};
pub use execute::{ApplyFailure, ApplyReport, execute};
pub use ledger::{LedgerError, OwnershipLedger};
pub use plan::{
    ConflictReason, OperationKind, Plan, PlanError, PlanOperation, PlanSummary, PlannerOptions,
    UnresolvableConflict, plan,
};
pub use snapshot::{DeviceSnapshot, Owned, Ownership};
pub use topology::Topology;
pub use validate::{ValidationError, ValidationReport, validate};

pub use model::{
    Entity, EntityKey, EntityKind, EntitySpec, FieldChange, InterfaceAssignment, InterfaceName,
    Ipv4Mask, Ipv4Subnet, ModeKind, PortMode, Subinterface, VlanDefinition, VlanId,
};

pub use tokio_util::sync::CancellationToken;
