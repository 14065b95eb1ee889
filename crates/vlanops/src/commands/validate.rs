//! `vlanops validate`: schema and consistency checks, no device needed.

use serde::Serialize;

use crate::cli::{GlobalOpts, ValidateArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct Counts {
    valid: bool,
    vlans: usize,
    interfaces: usize,
    subinterfaces: usize,
}

pub fn handle(args: &ValidateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let topology = util::load_topology(&args.topology, global)?;

    let counts = Counts {
        valid: true,
        vlans: topology.vlans().len(),
        interfaces: topology.interfaces().len(),
        subinterfaces: topology.subinterfaces().len(),
    };
    let out = output::render_single(
        &global.output,
        &counts,
        |c| {
            format!(
                "{} is valid: {} VLAN(s), {} interface(s), {} subinterface(s)",
                args.topology.display(),
                c.vlans,
                c.interfaces,
                c.subinterfaces
            )
        },
        |_| "valid".into(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
