// ── Plan execution ──
//
// Strictly sequential, fail-fast dispatch of a plan to an executor. No
// rollback: a failed run reports what was applied and what was not, and
// recovery is a fresh plan against the new live state.

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::device::Executor;
use crate::error::DeviceError;
use crate::plan::{Plan, PlanOperation};

/// Every operation in the plan was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub applied: Vec<PlanOperation>,
}

/// A run that did not apply the whole plan.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApplyFailure {
    /// Cancelled before the first operation was dispatched; the device is
    /// untouched.
    #[error("run cancelled before any operation was applied")]
    Cancelled { pending: Vec<PlanOperation> },

    /// An operation failed. Everything before it was applied, nothing
    /// after it was attempted.
    #[error("{failed} failed after {} applied operation(s): {error}", .applied.len())]
    Device {
        applied: Vec<PlanOperation>,
        failed: PlanOperation,
        error: DeviceError,
        remaining: Vec<PlanOperation>,
    },
}

impl ApplyFailure {
    /// Operations that reached the device successfully.
    pub fn applied(&self) -> &[PlanOperation] {
        match self {
            Self::Cancelled { .. } => &[],
            Self::Device { applied, .. } => applied,
        }
    }
}

/// Apply `plan` through `executor`, in order, stopping at the first error.
///
/// `cancel` is only consulted before the first operation is dispatched;
/// once the device has been touched the run continues to its fail-fast end.
pub async fn execute<E: Executor>(
    plan: &Plan,
    executor: &mut E,
    cancel: &CancellationToken,
) -> Result<ApplyReport, ApplyFailure> {
    if cancel.is_cancelled() {
        warn!("apply cancelled before the first operation");
        return Err(ApplyFailure::Cancelled {
            pending: plan.operations().to_vec(),
        });
    }

    let ops = plan.operations();
    for (index, op) in ops.iter().enumerate() {
        debug!(step = index + 1, total = ops.len(), target = %op.target_id(), "applying");
        if let Err(error) = executor.apply(op).await {
            warn!(target = %op.target_id(), %error, "operation failed, stopping");
            return Err(ApplyFailure::Device {
                applied: ops[..index].to_vec(),
                failed: op.clone(),
                error,
                remaining: ops[index + 1..].to_vec(),
            });
        }
    }

    info!(applied = ops.len(), "plan applied");
    Ok(ApplyReport {
        applied: ops.to_vec(),
    })
}
