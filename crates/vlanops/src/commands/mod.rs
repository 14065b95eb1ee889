//! Command dispatch: bridges CLI args -> core pipeline -> output formatting.

pub mod apply;
pub mod config_cmd;
pub mod plan;
pub mod state;
pub mod util;
pub mod validate;

use vlanops_core::CancellationToken;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a topology or device command to its handler.
pub async fn dispatch(
    cmd: Command,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    match cmd {
        Command::Validate(args) => validate::handle(&args, global),
        Command::Plan(args) => plan::handle(&args, global).await,
        Command::Apply(args) => apply::handle(&args, global, cancel).await,
        Command::State(args) => state::handle(&args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
