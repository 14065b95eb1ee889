// ── Planning ──
//
// `diff` computes what to do; `operation` is the immutable record of it.

mod diff;
mod operation;

pub use diff::{ConflictReason, PlanError, PlannerOptions, UnresolvableConflict, plan};
pub use operation::{OperationKind, Plan, PlanOperation, PlanSummary};
