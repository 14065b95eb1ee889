// ── Device collaborator contracts ──
//
// The core never talks to a device itself. Backends implement these two
// traits; the planner only ever sees the snapshot, and `execute` only
// ever sees the executor.

use std::future::Future;

use crate::error::DeviceError;
use crate::plan::PlanOperation;
use crate::snapshot::DeviceSnapshot;

/// Produces the current, ownership-tagged configuration of a device.
pub trait DeviceStateReader {
    fn read_snapshot(&mut self) -> impl Future<Output = Result<DeviceSnapshot, DeviceError>> + Send;
}

/// Applies one operation to a device.
///
/// Called once per operation, in plan order, never concurrently. A
/// timeout must surface as a `DeviceError` of kind `Timeout`.
pub trait Executor {
    fn apply(&mut self, op: &PlanOperation) -> impl Future<Output = Result<(), DeviceError>> + Send;
}
