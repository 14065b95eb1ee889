// ── Plan operations ──

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::model::{Entity, EntityKey, EntityKind, EntitySpec, FieldChange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

/// One change to apply to the device. Immutable once built: an audit
/// record that travels from planner to executor unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOperation {
    kind: OperationKind,
    target_kind: EntityKind,
    target_id: EntityKey,
    rendered_intent: String,
    /// Desired entity for creates and updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spec: Option<EntitySpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    changes: Vec<FieldChange>,
    /// Set when the update takes ownership of an unmanaged entity.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    adopt: bool,
}

impl PlanOperation {
    pub fn create<T: Entity>(desired: T) -> Self {
        let target_id = desired.key();
        let rendered_intent = format!("create {}", desired.summary());
        Self {
            kind: OperationKind::Create,
            target_kind: T::KIND,
            target_id,
            rendered_intent,
            spec: Some(desired.into_spec()),
            changes: Vec::new(),
            adopt: false,
        }
    }

    pub fn update<T: Entity>(desired: T, changes: Vec<FieldChange>, adopt: bool) -> Self {
        let target_id = desired.key();
        let detail: Vec<String> = changes.iter().map(ToString::to_string).collect();
        let rendered_intent = format!(
            "{} {} {}: {}",
            if adopt { "adopt and update" } else { "update" },
            T::KIND,
            target_id.identity(),
            detail.join(", ")
        );
        Self {
            kind: OperationKind::Update,
            target_kind: T::KIND,
            target_id,
            rendered_intent,
            spec: Some(desired.into_spec()),
            changes,
            adopt,
        }
    }

    pub fn delete(target_id: EntityKey) -> Self {
        let target_kind = target_id.kind();
        let rendered_intent = format!("delete {target_kind} {}", target_id.identity());
        Self {
            kind: OperationKind::Delete,
            target_kind,
            target_id,
            rendered_intent,
            spec: None,
            changes: Vec::new(),
            adopt: false,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn target_kind(&self) -> EntityKind {
        self.target_kind
    }

    pub fn target_id(&self) -> &EntityKey {
        &self.target_id
    }

    pub fn rendered_intent(&self) -> &str {
        &self.rendered_intent
    }

    pub fn spec(&self) -> Option<&EntitySpec> {
        self.spec.as_ref()
    }

    pub fn changes(&self) -> &[FieldChange] {
        &self.changes
    }

    pub fn adopts(&self) -> bool {
        self.adopt
    }
}

impl fmt::Display for PlanOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered_intent)
    }
}

// ── Plan ────────────────────────────────────────────────────────────

/// Counts per operation kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete",
            self.create, self.update, self.delete
        )
    }
}

/// Ordered operations that move the device from current to desired state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    operations: Vec<PlanOperation>,
}

impl Plan {
    pub(crate) fn new(operations: Vec<PlanOperation>) -> Self {
        Self { operations }
    }

    /// Parse a plan previously written with `serde_json`.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn operations(&self) -> &[PlanOperation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlanOperation> {
        self.operations.iter()
    }

    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for op in &self.operations {
            match op.kind {
                OperationKind::Create => summary.create += 1,
                OperationKind::Update => summary.update += 1,
                OperationKind::Delete => summary.delete += 1,
            }
        }
        summary
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a PlanOperation;
    type IntoIter = std::slice::Iter<'a, PlanOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}

impl FromIterator<PlanOperation> for Plan {
    fn from_iter<I: IntoIterator<Item = PlanOperation>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{InterfaceAssignment, VlanDefinition, VlanId};

    #[test]
    fn create_renders_intent_from_summary() {
        let op = PlanOperation::create(VlanDefinition::new(10, "Mgmt"));
        assert_eq!(op.kind(), OperationKind::Create);
        assert_eq!(op.target_kind(), EntityKind::Vlan);
        assert_eq!(op.rendered_intent(), r#"create vlan 10 name "Mgmt""#);
    }

    #[test]
    fn update_lists_field_changes() {
        let current = InterfaceAssignment::access("Gi0/1", Some(VlanId::from(10)));
        let desired = InterfaceAssignment::access("Gi0/1", Some(VlanId::from(20)));
        let changes = current.changes_to(&desired);
        let op = PlanOperation::update(desired, changes, true);
        assert!(op.adopts());
        assert_eq!(
            op.rendered_intent(),
            r#"adopt and update interface Gi0/1: access_vlan: "10" -> "20""#
        );
    }

    #[test]
    fn delete_carries_no_spec() {
        let op = PlanOperation::delete("subinterface:Gi0/0.10".parse().unwrap());
        assert_eq!(op.target_kind(), EntityKind::Subinterface);
        assert!(op.spec().is_none());
        assert_eq!(op.to_string(), "delete subinterface Gi0/0.10");
    }

    #[test]
    fn plan_survives_a_json_round_trip() {
        let plan: Plan = [
            PlanOperation::create(VlanDefinition::new(10, "Mgmt")),
            PlanOperation::delete("vlan:30".parse().unwrap()),
        ]
        .into_iter()
        .collect();
        let raw = serde_json::to_string(&plan).unwrap();
        assert_eq!(Plan::from_json(&raw).unwrap(), plan);
        assert_eq!(plan.summary().to_string(), "1 to create, 0 to update, 1 to delete");
    }
}
