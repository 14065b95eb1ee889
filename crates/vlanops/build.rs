use std::fs;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::Shell;

// cli.rs only depends on clap + clap_complete, so it can be compiled
// into the build script on its own.
#[path = "src/cli.rs"]
mod cli;

/// Packagers point this at a staging directory to collect the generated
/// man pages and completions; otherwise they stay in OUT_DIR.
const ASSET_DIR_ENV: &str = "VLANOPS_ASSET_DIR";

fn main() {
    println!("cargo::rerun-if-changed=src/cli.rs");
    println!("cargo::rerun-if-env-changed={ASSET_DIR_ENV}");

    let root: PathBuf = std::env::var_os(ASSET_DIR_ENV)
        .or_else(|| std::env::var_os("OUT_DIR"))
        .expect("OUT_DIR not set by Cargo")
        .into();

    let mut cmd = cli::Cli::command();

    let man_dir = root.join("man").join("man1");
    fs::create_dir_all(&man_dir).expect("failed to create man output directory");
    generate_manpages(&cmd, &man_dir);

    let completion_dir = root.join("completions");
    fs::create_dir_all(&completion_dir).expect("failed to create completions directory");
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        clap_complete::generate_to(shell, &mut cmd, "vlanops", &completion_dir)
            .unwrap_or_else(|e| panic!("failed to write {shell} completions: {e}"));
    }
}

/// Man page for a command, then one per visible subcommand (`vlanops-state-adopt.1`).
/// Hidden subcommands and `help` get no page.
fn generate_manpages(cmd: &clap::Command, dir: &Path) {
    let name = cmd.get_name().to_owned();
    let path = dir.join(format!("{name}.1"));

    let mut buf = Vec::new();
    clap_mangen::Man::new(cmd.clone())
        .render(&mut buf)
        .unwrap_or_else(|e| panic!("failed to render man page for `{name}`: {e}"));
    fs::write(&path, buf).unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));

    for sub in cmd
        .get_subcommands()
        .filter(|sub| !sub.is_hide_set() && sub.get_name() != "help")
    {
        let sub = sub.clone().name(format!("{name}-{}", sub.get_name()));
        generate_manpages(&sub, dir);
    }
}
