//! Profile resolution for commands that talk to a device.
//!
//! The heavy lifting lives in `vlanops-config`; this module applies the
//! global flags and turns a profile into a ledger-backed device.

use std::path::PathBuf;

use clap::ValueEnum;
use vlanops_config::{Config, ConfigError, Defaults, Profile};
use vlanops_core::OwnershipLedger;
use vlanops_device::{ManagedDevice, Transport};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Config file in effect: `--config` / `VLANOPS_CONFIG`, else the platform path.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(vlanops_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(vlanops_config::load_config_from(&config_path(global))?)
}

/// Fill in `--output` and `--color` from the config's `[defaults]` when
/// the flags are absent.
pub fn apply_display_defaults(global: &mut GlobalOpts) {
    let defaults = load(global).map_or_else(
        |err| {
            tracing::debug!(error = %err, "config unreadable, using built-in display defaults");
            Defaults::default()
        },
        |config| config.defaults,
    );
    global.output = global
        .output_flag
        .clone()
        .unwrap_or_else(|| parse_default("defaults.output", &defaults.output));
    global.color = global
        .color_flag
        .clone()
        .unwrap_or_else(|| parse_default("defaults.color", &defaults.color));
}

fn parse_default<T: ValueEnum + Default>(key: &str, raw: &str) -> T {
    T::from_str(raw, true).unwrap_or_else(|_| {
        tracing::warn!(key, value = raw, "ignoring unrecognised config value");
        T::default()
    })
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Comma-separated profile names for help text.
pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

fn select<'a>(global: &GlobalOpts, config: &'a Config) -> Result<(&'a str, &'a Profile), CliError> {
    if config.profiles.is_empty() {
        return Err(CliError::NoConfig {
            path: config_path(global).display().to_string(),
        });
    }
    config
        .profile(global.profile.as_deref())
        .map_err(|err| match err {
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: available_profiles(config),
            },
            other => other.into(),
        })
}

/// The active profile's ledger and where it is stored.
pub fn open_ledger(global: &GlobalOpts) -> Result<(OwnershipLedger, PathBuf), CliError> {
    let config = load(global)?;
    let (name, profile) = select(global, &config)?;
    let path = vlanops_config::ledger_path(profile, name);
    let ledger = OwnershipLedger::load_or_new(&path, profile.device_name(name))?;
    Ok((ledger, path))
}

/// Build the active profile's transport wrapped with its ownership ledger.
pub fn open_device(global: &GlobalOpts) -> Result<ManagedDevice<Transport>, CliError> {
    let config = load(global)?;
    let (name, profile) = select(global, &config)?;

    let timeout = vlanops_config::effective_timeout(&config, profile, global.timeout);
    let transport = vlanops_config::profile_to_transport(profile, name, timeout)?;
    let ledger_path = vlanops_config::ledger_path(profile, name);
    let ledger = OwnershipLedger::load_or_new(&ledger_path, profile.device_name(name))?;

    tracing::debug!(
        profile = name,
        ledger = %ledger_path.display(),
        managed = ledger.managed().len(),
        "device opened"
    );
    Ok(ManagedDevice::new(transport, ledger, ledger_path))
}
