//! `vlanops plan`: show what apply would do, without touching the device.

use vlanops_core::PlannerOptions;

use crate::cli::{GlobalOpts, PlanArgs};
use crate::error::CliError;
use crate::{config, output};

use super::util;

pub async fn handle(args: &PlanArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let topology = util::load_topology(&args.topology, global)?;
    let mut device = config::open_device(global)?;
    let options = PlannerOptions {
        protect_unmanaged: args.protect_unmanaged,
    };
    let plan = util::compute_plan(&topology, &mut device, &options)
        .await
        .map_err(|err| util::report(err, global))?;

    if let Some(path) = &args.out {
        std::fs::write(path, serde_json::to_string_pretty(&plan)?)?;
        tracing::info!(path = %path.display(), operations = plan.len(), "plan written");
    }

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &plan,
        |p| output::plan_detail(p, color),
        |p| {
            p.iter()
                .map(|op| op.rendered_intent().to_owned())
                .collect::<Vec<_>>()
                .join("\n")
        },
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
