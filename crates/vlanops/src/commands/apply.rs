//! `vlanops apply`: plan, confirm, execute, verify.

use owo_colors::OwoColorize;
use vlanops_core::{ApplyFailure, CancellationToken, Plan, PlannerOptions, Topology, execute};
use vlanops_device::{DeviceBackend, ManagedDevice, Transport};

use crate::cli::{ApplyArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::{config, output};

use super::util;

pub async fn handle(
    args: &ApplyArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let topology = util::load_topology(&args.topology, global)?;
    let mut device = config::open_device(global)?;
    let options = PlannerOptions {
        protect_unmanaged: args.protect_unmanaged,
    };
    let plan = util::compute_plan(&topology, &mut device, &options)
        .await
        .map_err(|err| util::report(err, global))?;

    if let Some(path) = &args.plan {
        let reviewed = read_plan(path)?;
        if reviewed != plan {
            tracing::warn!(
                reviewed = reviewed.len(),
                current = plan.len(),
                "plan no longer matches the device"
            );
            return Err(CliError::PlanDrift {
                path: path.display().to_string(),
            });
        }
    }

    let color = output::should_color(&global.color);
    if plan.is_empty() {
        if !global.quiet {
            eprintln!("{}", output::plan_detail(&plan, color));
        }
        return Ok(());
    }

    if !global.quiet && matches!(global.output, OutputFormat::Table) {
        eprintln!("{}\n", output::plan_detail(&plan, color));
    }
    let target = device.backend().describe();
    let approved = util::confirm(
        "apply",
        &format!("Apply {} operation(s) to {target}?", plan.len()),
        global.yes,
    )?;
    if !approved {
        return Err(CliError::Declined);
    }

    match execute(&plan, &mut device, cancel).await {
        Ok(report) => {
            let out = output::render_single(
                &global.output,
                &report,
                |r| {
                    let done = format!("Applied {} operation(s) to {target}.", r.applied.len());
                    if color { done.green().to_string() } else { done }
                },
                |r| {
                    r.applied
                        .iter()
                        .map(|op| op.rendered_intent().to_owned())
                        .collect::<Vec<_>>()
                        .join("\n")
                },
            );
            output::print_output(&out, global.quiet);
            verify(&topology, &mut device, &options, global, color).await
        }
        Err(failure) => {
            print_failure(&failure, global, color);
            Err(failure.into())
        }
    }
}

/// Re-read the device and plan again. Anything left to do means the
/// device did not end up where the accepted operations said it would.
async fn verify(
    topology: &Topology,
    device: &mut ManagedDevice<Transport>,
    options: &PlannerOptions,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    let leftover = util::compute_plan(topology, device, options)
        .await
        .map_err(|err| util::report(err, global))?;
    if leftover.is_empty() {
        tracing::info!("device verified against the topology");
        return Ok(());
    }
    tracing::warn!(remaining = leftover.len(), "device not converged after apply");
    if !global.quiet {
        eprintln!("{}", output::plan_detail(&leftover, color));
    }
    Err(CliError::NotConverged {
        remaining: leftover.len(),
    })
}

fn read_plan(path: &std::path::Path) -> Result<Plan, CliError> {
    let raw = std::fs::read_to_string(path)?;
    Plan::from_json(&raw).map_err(|source| CliError::PlanFile {
        path: path.display().to_string(),
        source,
    })
}

/// What got through, what broke, what never ran.
fn print_failure(failure: &ApplyFailure, global: &GlobalOpts, color: bool) {
    let ApplyFailure::Device {
        applied,
        failed,
        remaining,
        ..
    } = failure
    else {
        return;
    };
    let out = output::render_single(
        &global.output,
        failure,
        |_| {
            let mut lines = Vec::new();
            for op in applied {
                lines.push(format!("applied  {op}"));
            }
            let broken = format!("FAILED   {failed}");
            lines.push(if color { broken.red().to_string() } else { broken });
            for op in remaining {
                lines.push(format!("skipped  {op}"));
            }
            lines.join("\n")
        },
        |_| failed.rendered_intent().to_owned(),
    );
    output::print_output(&out, global.quiet);
}
