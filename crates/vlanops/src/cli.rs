//! Clap derive structures for the `vlanops` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// vlanops -- plan and apply VLAN, interface and subinterface changes
#[derive(Debug, Parser)]
#[command(
    name = "vlanops",
    version,
    about = "Plan and apply VLAN, interface and subinterface changes",
    long_about = "Validates a declared topology, diffs it against a device's live state,\n\
        and applies the resulting ordered plan after approval.\n\n\
        Only entities recorded in the device's ownership ledger are ever\n\
        deleted. Updating an unrecorded entity adopts it.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Device profile to use
    #[arg(long, short = 'p', env = "VLANOPS_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "VLANOPS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format [default: `defaults.output` from the config, else table]
    #[arg(
        id = "output",
        long = "output",
        short = 'o',
        env = "VLANOPS_OUTPUT",
        value_name = "FORMAT",
        global = true
    )]
    pub output_flag: Option<OutputFormat>,

    /// When to use color output [default: `defaults.color` from the config, else auto]
    #[arg(id = "color", long = "color", value_name = "WHEN", global = true)]
    pub color_flag: Option<ColorMode>,

    /// Output format in effect once config defaults are applied.
    #[arg(skip)]
    pub output: OutputFormat,

    #[arg(skip)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Transport timeout in seconds (overrides profile and defaults)
    #[arg(long, env = "VLANOPS_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Default, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    #[default]
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check a topology file without contacting any device
    #[command(alias = "check")]
    Validate(ValidateArgs),

    /// Show the operations that would bring the device to the topology
    Plan(PlanArgs),

    /// Plan, confirm, then apply to the device
    Apply(ApplyArgs),

    /// Inspect and edit the ownership ledger
    State(StateArgs),

    /// Manage CLI configuration and device profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  VALIDATE / PLAN / APPLY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Topology JSON file
    pub topology: PathBuf,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Topology JSON file
    pub topology: PathBuf,

    /// Refuse to update device entities vlanops does not manage, instead of adopting them
    #[arg(long)]
    pub protect_unmanaged: bool,

    /// Also write the plan as JSON, for review and `apply --plan`
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Topology JSON file
    pub topology: PathBuf,

    /// Refuse to update device entities vlanops does not manage, instead of adopting them
    #[arg(long)]
    pub protect_unmanaged: bool,

    /// Reviewed plan from `plan --out`; refuse to apply if the device drifted
    #[arg(long, value_name = "FILE")]
    pub plan: Option<PathBuf>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  STATE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct StateArgs {
    #[command(subcommand)]
    pub command: StateCommand,
}

#[derive(Debug, Subcommand)]
pub enum StateCommand {
    /// List device entities and who owns them
    #[command(alias = "ls")]
    Show,

    /// Record existing device entities as managed
    Adopt {
        /// Entity keys, e.g. `vlan:10`, `interface:Gi0/1`, `subinterface:Gi0/0.10`
        #[arg(required_unless_present = "all")]
        keys: Vec<String>,

        /// Adopt everything currently on the device
        #[arg(long, conflicts_with = "keys")]
        all: bool,
    },

    /// Stop managing entities; they are left on the device untouched
    Release {
        /// Entity keys to release
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create a config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Set a value on the active profile
    Set {
        /// Profile key (e.g. `host`, `state_file`, `timeout`)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a device password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,

        /// Store the enable secret instead of the login password
        #[arg(long)]
        enable: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
