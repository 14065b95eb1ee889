// ── Three-way planner ──
//
// Desired (topology) vs current (snapshot), per entity kind, keyed by
// identity. Produces the minimal operation list in dependency order, or
// every conflict that makes such a list impossible.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

use super::operation::{Plan, PlanOperation};
use crate::model::{Entity, EntityKey, FieldChange, Subinterface, VlanId};
use crate::snapshot::{DeviceSnapshot, Owned};
use crate::topology::Topology;

/// Planner knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlannerOptions {
    /// Refuse to update unmanaged device entities whose desired state
    /// differs, instead of adopting them with the update.
    pub protect_unmanaged: bool,
}

// ── Conflicts ───────────────────────────────────────────────────────

/// Why an entity cannot be reconciled by create/update/delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ConflictReason {
    /// The device entity is not managed by vlanops, differs from the
    /// desired state, and unmanaged entities are protected.
    Unmanaged { changes: Vec<FieldChange> },
    /// A field that cannot be changed in place differs.
    ImmutableField {
        field: String,
        expected: String,
        actual: String,
    },
    /// Deleting the VLAN would strand an unmanaged entity that uses it.
    ReferencedByUnmanaged { referrer: EntityKey },
    /// Deleting the interface would strand an unmanaged subinterface on it.
    ParentOfUnmanaged { child: EntityKey },
}

/// A desired/current disagreement the planner refuses to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvableConflict {
    pub target: EntityKey,
    #[serde(flatten)]
    pub reason: ConflictReason,
}

impl fmt::Display for UnresolvableConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            ConflictReason::Unmanaged { changes } => {
                let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
                write!(
                    f,
                    "{} is not managed by vlanops and differs in {}",
                    self.target,
                    fields.join(", ")
                )
            }
            ConflictReason::ImmutableField {
                field,
                expected,
                actual,
            } => write!(
                f,
                "{}: immutable field {field} is {actual:?} on the device but {expected:?} is desired",
                self.target
            ),
            ConflictReason::ReferencedByUnmanaged { referrer } => write!(
                f,
                "{} cannot be deleted: still used by unmanaged {referrer}",
                self.target
            ),
            ConflictReason::ParentOfUnmanaged { child } => write!(
                f,
                "{} cannot be deleted: unmanaged {child} is still configured on it",
                self.target
            ),
        }
    }
}

/// Planning failed; every conflict found is listed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{} unresolvable conflict(s) between desired and device state", .conflicts.len())]
pub struct PlanError {
    conflicts: Vec<UnresolvableConflict>,
}

impl PlanError {
    pub fn conflicts(&self) -> &[UnresolvableConflict] {
        &self.conflicts
    }
}

// ── Planner ─────────────────────────────────────────────────────────

/// Per-kind diff result, each list ascending by identity.
struct KindDiff {
    upserts: Vec<PlanOperation>,
    deletes: Vec<PlanOperation>,
}

fn diff_kind<T: Entity>(
    desired: &[T],
    current: &[Owned<T>],
    options: PlannerOptions,
    conflicts: &mut Vec<UnresolvableConflict>,
) -> KindDiff {
    let desired: BTreeMap<EntityKey, &T> = desired.iter().map(|d| (d.key(), d)).collect();
    let current: BTreeMap<EntityKey, &Owned<T>> = current.iter().map(|c| (c.spec.key(), c)).collect();
    let mut upserts = Vec::new();

    for (key, wanted) in &desired {
        let Some(existing) = current.get(key) else {
            trace!(%key, "create");
            upserts.push(PlanOperation::create((*wanted).clone()));
            continue;
        };

        let changes = existing.spec.changes_to(wanted);
        if changes.is_empty() {
            continue;
        }

        let immutable: Vec<&FieldChange> = changes
            .iter()
            .filter(|c| T::IMMUTABLE_FIELDS.contains(&c.field.as_str()))
            .collect();
        if !immutable.is_empty() {
            conflicts.extend(immutable.into_iter().map(|c| UnresolvableConflict {
                target: key.clone(),
                reason: ConflictReason::ImmutableField {
                    field: c.field.clone(),
                    expected: c.to.clone(),
                    actual: c.from.clone(),
                },
            }));
            continue;
        }

        if !existing.is_managed() && options.protect_unmanaged {
            conflicts.push(UnresolvableConflict {
                target: key.clone(),
                reason: ConflictReason::Unmanaged { changes },
            });
            continue;
        }

        trace!(%key, changes = changes.len(), "update");
        upserts.push(PlanOperation::update(
            (*wanted).clone(),
            changes,
            !existing.is_managed(),
        ));
    }

    let deletes = current
        .iter()
        .filter(|(key, existing)| existing.is_managed() && !desired.contains_key(*key))
        .map(|(key, _)| PlanOperation::delete(key.clone()))
        .collect();

    KindDiff { upserts, deletes }
}

/// Unmanaged device entities the plan leaves in place, since they are
/// neither desired nor ever deleted.
fn survivors<'a, T: Entity>(
    items: &'a [Owned<T>],
    desired: &'a BTreeSet<EntityKey>,
) -> impl Iterator<Item = &'a T> {
    items
        .iter()
        .filter(|o| !o.is_managed())
        .map(|o| &o.spec)
        .filter(|spec| !desired.contains(&spec.key()))
}

/// Deletes that would pull a VLAN or parent interface out from under a
/// surviving unmanaged entity.
fn stranding_conflicts(
    vlan_deletes: &[PlanOperation],
    interface_deletes: &[PlanOperation],
    desired: &BTreeSet<EntityKey>,
    current: &DeviceSnapshot,
) -> Vec<UnresolvableConflict> {
    let vlan_users: Vec<(EntityKey, Vec<VlanId>)> = survivors(current.interfaces(), desired)
        .map(|i| (i.key(), i.vlan_refs()))
        .chain(survivors(current.subinterfaces(), desired).map(|s| (s.key(), s.vlan_refs())))
        .collect();
    let children: Vec<&Subinterface> = survivors(current.subinterfaces(), desired).collect();

    let mut conflicts = Vec::new();
    for delete in vlan_deletes {
        let EntityKey::Vlan(vlan_id) = delete.target_id() else {
            continue;
        };
        conflicts.extend(
            vlan_users
                .iter()
                .filter(|(_, refs)| refs.contains(vlan_id))
                .map(|(referrer, _)| UnresolvableConflict {
                    target: delete.target_id().clone(),
                    reason: ConflictReason::ReferencedByUnmanaged {
                        referrer: referrer.clone(),
                    },
                }),
        );
    }
    for delete in interface_deletes {
        let EntityKey::Interface(name) = delete.target_id() else {
            continue;
        };
        conflicts.extend(
            children
                .iter()
                .filter(|child| child.parent_interface == *name)
                .map(|child| UnresolvableConflict {
                    target: delete.target_id().clone(),
                    reason: ConflictReason::ParentOfUnmanaged { child: child.key() },
                }),
        );
    }
    conflicts
}

/// Compute the ordered, minimal plan turning `current` into `desired`.
///
/// Phases: VLAN creates/updates, subinterface deletes, interface deletes,
/// interface creates/updates, subinterface creates/updates, VLAN deletes.
/// Each phase is ascending by identity. Unmanaged device entities are
/// never deleted. Updating one adopts it, unless `protect_unmanaged` is set.
pub fn plan(
    desired: &Topology,
    current: &DeviceSnapshot,
    options: &PlannerOptions,
) -> Result<Plan, PlanError> {
    let mut conflicts = Vec::new();
    let vlans = diff_kind(desired.vlans(), current.vlans(), *options, &mut conflicts);
    let interfaces = diff_kind(desired.interfaces(), current.interfaces(), *options, &mut conflicts);
    let subinterfaces = diff_kind(
        desired.subinterfaces(),
        current.subinterfaces(),
        *options,
        &mut conflicts,
    );

    conflicts.extend(stranding_conflicts(
        &vlans.deletes,
        &interfaces.deletes,
        &desired.keys(),
        current,
    ));

    if !conflicts.is_empty() {
        conflicts.sort_by(|a, b| a.target.cmp(&b.target));
        debug!(conflicts = conflicts.len(), "planning refused");
        return Err(PlanError { conflicts });
    }

    let plan: Plan = vlans
        .upserts
        .into_iter()
        .chain(subinterfaces.deletes)
        .chain(interfaces.deletes)
        .chain(interfaces.upserts)
        .chain(subinterfaces.upserts)
        .chain(vlans.deletes)
        .collect();

    debug!(operations = plan.len(), summary = %plan.summary(), "plan computed");
    Ok(plan)
}
