//! Device transports for vlanops.
//!
//! A [`DeviceBackend`] knows how to read a device's running configuration
//! and push one operation to it. It knows nothing about ownership: wrap it
//! in a [`ManagedDevice`] to get the `DeviceStateReader` / `Executor` pair
//! the core planner and executor work with.
//!
//! Backends:
//! - [`StateFileDevice`]: a JSON file acting as a lab switch.
//! - [`CommandDevice`]: an external transport program (netmiko, NETCONF
//!   client, vendor CLI wrapper) speaking a small JSON protocol.

use std::future::Future;

use vlanops_core::{DeviceError, PlanOperation, Topology};

pub mod command;
pub mod managed;
pub mod state_file;

pub use command::{CommandDevice, Connection, ExecResult};
pub use managed::ManagedDevice;
pub use state_file::StateFileDevice;

/// Raw access to one device: untagged live state in, single operations out.
pub trait DeviceBackend {
    /// Short human description for logs and status output.
    fn describe(&self) -> String;

    fn read_live(&mut self) -> impl Future<Output = Result<Topology, DeviceError>> + Send;

    fn push(&mut self, op: &PlanOperation) -> impl Future<Output = Result<(), DeviceError>> + Send;
}

/// Runtime choice of backend, as selected by a profile.
#[derive(Debug)]
pub enum Transport {
    StateFile(StateFileDevice),
    Command(CommandDevice),
}

impl DeviceBackend for Transport {
    fn describe(&self) -> String {
        match self {
            Self::StateFile(device) => device.describe(),
            Self::Command(device) => device.describe(),
        }
    }

    async fn read_live(&mut self) -> Result<Topology, DeviceError> {
        match self {
            Self::StateFile(device) => device.read_live().await,
            Self::Command(device) => device.read_live().await,
        }
    }

    async fn push(&mut self, op: &PlanOperation) -> Result<(), DeviceError> {
        match self {
            Self::StateFile(device) => device.push(op).await,
            Self::Command(device) => device.push(op).await,
        }
    }
}
