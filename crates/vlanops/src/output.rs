//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one line per item.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};
use vlanops_core::{OperationKind, Plan, PlanOperation};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// `+ create ...`, `~ update ...`, `- delete ...`, coloured by kind.
pub fn plan_line(op: &PlanOperation, color: bool) -> String {
    let marker = match op.kind() {
        OperationKind::Create => '+',
        OperationKind::Update => '~',
        OperationKind::Delete => '-',
    };
    let line = format!("{marker} {}", op.rendered_intent());
    if !color {
        return line;
    }
    match op.kind() {
        OperationKind::Create => line.green().to_string(),
        OperationKind::Update => line.yellow().to_string(),
        OperationKind::Delete => line.red().to_string(),
    }
}

/// Human view of a plan: one line per operation, then the summary.
pub fn plan_detail(plan: &Plan, color: bool) -> String {
    if plan.is_empty() {
        return "No changes. The device matches the topology.".into();
    }
    let mut lines: Vec<String> = plan.iter().map(|op| plan_line(op, color)).collect();
    lines.push(String::new());
    let summary = format!("Plan: {}.", plan.summary());
    lines.push(if color {
        summary.bold().to_string()
    } else {
        summary
    });
    lines.join("\n")
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `line_fn` on each item
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&line_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item views don't use
/// `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => plain_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\": \"cannot serialize output: {e}\"}}"))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("error: cannot serialize output: {e}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vlanops_core::{EntityKey, VlanDefinition};

    use super::*;

    fn sample() -> Plan {
        [
            PlanOperation::create(VlanDefinition::new(20, "Eng")),
            PlanOperation::delete("vlan:10".parse::<EntityKey>().unwrap()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn plan_detail_marks_each_kind() {
        let text = plan_detail(&sample(), false);
        assert_eq!(
            text,
            "+ create vlan 20 name \"Eng\"\n- delete vlan 10\n\nPlan: 1 to create, 0 to update, 1 to delete."
        );
    }

    #[test]
    fn empty_plan_says_no_changes() {
        assert!(plan_detail(&Plan::default(), false).starts_with("No changes"));
    }

    #[test]
    fn plain_list_is_one_line_per_item() {
        let plan = sample();
        let text = render_list(
            &OutputFormat::Plain,
            plan.operations(),
            |op| PlanRowForTest {
                action: op.kind().to_string(),
            },
            |op| op.rendered_intent().to_owned(),
        );
        assert_eq!(text.lines().count(), 2);
    }

    #[derive(Tabled)]
    struct PlanRowForTest {
        action: String,
    }
}
