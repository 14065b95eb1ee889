// ── Topology validation ──
//
// Cross-entity consistency checks run before planning. Each check is
// independent and every violation is reported, so one run surfaces the
// full list.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::model::{Entity, EntityKey, InterfaceName, Ipv4Subnet, VlanId};
use crate::topology::Topology;

/// One semantic violation in a desired topology.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("VLAN id {vlan_id} used by {referrer} is outside {}-{}", VlanId::MIN, VlanId::MAX)]
    OutOfRangeVlanId { vlan_id: VlanId, referrer: EntityKey },

    #[error("VLAN id {vlan_id} is defined {occurrences} times")]
    DuplicateVlanId { vlan_id: VlanId, occurrences: usize },

    #[error("interface {name} is declared {occurrences} times")]
    DuplicateInterface { name: InterfaceName, occurrences: usize },

    #[error("subinterface {name} is declared {occurrences} times")]
    DuplicateSubinterface { name: String, occurrences: usize },

    #[error("{referrer} references VLAN {vlan_id}, which is not defined")]
    DanglingVlanReference { vlan_id: VlanId, referrer: EntityKey },

    #[error("{subinterface} has parent interface {parent}, which is not declared")]
    DanglingParentInterface {
        subinterface: EntityKey,
        parent: InterfaceName,
    },

    #[error("{first} ({first_subnet}) overlaps {second} ({second_subnet})")]
    SubnetOverlap {
        first: EntityKey,
        second: EntityKey,
        #[serde(serialize_with = "serialize_display")]
        first_subnet: Ipv4Subnet,
        #[serde(serialize_with = "serialize_display")]
        second_subnet: Ipv4Subnet,
    },
}

fn serialize_display<S: serde::Serializer>(
    value: &impl fmt::Display,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Every violation found in one topology, in check order then identity order.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("topology failed validation with {} error(s)", .errors.len())]
pub struct ValidationReport {
    errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl IntoIterator for ValidationReport {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// Run every check against `topology` and return all violations found.
pub fn validate(topology: &Topology) -> Result<(), ValidationReport> {
    let mut errors = Vec::new();
    check_ranges(topology, &mut errors);
    check_duplicates(topology, &mut errors);
    check_vlan_references(topology, &mut errors);
    check_parents(topology, &mut errors);
    check_overlaps(topology, &mut errors);

    debug!(violations = errors.len(), "validation finished");
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationReport { errors })
    }
}

/// Every (referrer, VLAN id) pair for interfaces and subinterfaces.
fn references(topology: &Topology) -> Vec<(EntityKey, VlanId)> {
    let mut refs = Vec::new();
    for iface in topology.interfaces() {
        refs.extend(iface.vlan_refs().into_iter().map(|id| (iface.key(), id)));
    }
    for subif in topology.subinterfaces() {
        refs.extend(subif.vlan_refs().into_iter().map(|id| (subif.key(), id)));
    }
    refs.sort();
    refs.dedup();
    refs
}

fn check_ranges(topology: &Topology, errors: &mut Vec<ValidationError>) {
    let definitions = topology.vlans().iter().map(|v| (v.key(), v.id));
    let mut found: Vec<_> = definitions
        .chain(references(topology))
        .filter(|(_, id)| !id.is_valid())
        .collect();
    found.sort();
    found.dedup();
    errors.extend(
        found
            .into_iter()
            .map(|(referrer, vlan_id)| ValidationError::OutOfRangeVlanId { vlan_id, referrer }),
    );
}

fn count_by<K: Ord>(keys: impl IntoIterator<Item = K>) -> BTreeMap<K, usize> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

fn check_duplicates(topology: &Topology, errors: &mut Vec<ValidationError>) {
    for (vlan_id, occurrences) in count_by(topology.vlans().iter().map(|v| v.id)) {
        if occurrences > 1 {
            errors.push(ValidationError::DuplicateVlanId { vlan_id, occurrences });
        }
    }
    for (name, occurrences) in count_by(topology.interfaces().iter().map(|i| i.name.clone())) {
        if occurrences > 1 {
            errors.push(ValidationError::DuplicateInterface { name, occurrences });
        }
    }
    for (key, occurrences) in count_by(topology.subinterfaces().iter().map(Entity::key)) {
        if occurrences > 1 {
            errors.push(ValidationError::DuplicateSubinterface {
                name: key.identity(),
                occurrences,
            });
        }
    }
}

fn check_vlan_references(topology: &Topology, errors: &mut Vec<ValidationError>) {
    let defined: BTreeSet<VlanId> = topology.vlans().iter().map(|v| v.id).collect();
    errors.extend(
        references(topology)
            .into_iter()
            .filter(|(_, id)| id.is_valid() && !defined.contains(id))
            .map(|(referrer, vlan_id)| ValidationError::DanglingVlanReference { vlan_id, referrer }),
    );
}

fn check_parents(topology: &Topology, errors: &mut Vec<ValidationError>) {
    let declared: BTreeSet<&InterfaceName> = topology.interfaces().iter().map(|i| &i.name).collect();
    let mut dangling: Vec<_> = topology
        .subinterfaces()
        .iter()
        .filter(|s| !declared.contains(&s.parent_interface))
        .map(|s| (s.key(), s.parent_interface.clone()))
        .collect();
    dangling.sort();
    dangling.dedup();
    errors.extend(
        dangling
            .into_iter()
            .map(|(subinterface, parent)| ValidationError::DanglingParentInterface { subinterface, parent }),
    );
}

fn check_overlaps(topology: &Topology, errors: &mut Vec<ValidationError>) {
    let mut subnets: Vec<(EntityKey, Ipv4Subnet)> = topology
        .subinterfaces()
        .iter()
        .map(|s| (s.key(), s.subnet()))
        .collect();
    subnets.sort_by(|a, b| a.0.cmp(&b.0));

    for (i, (first, first_subnet)) in subnets.iter().enumerate() {
        for (second, second_subnet) in &subnets[i + 1..] {
            // Same identity twice is a duplicate, reported above.
            if first == second {
                continue;
            }
            if first_subnet.overlaps(*second_subnet) {
                errors.push(ValidationError::SubnetOverlap {
                    first: first.clone(),
                    second: second.clone(),
                    first_subnet: *first_subnet,
                    second_subnet: *second_subnet,
                });
            }
        }
    }
}
