//! Shared configuration for vlanops.
//!
//! TOML profiles (one per device), credential resolution (env + keyring +
//! plaintext), and translation of a profile into a `vlanops_device`
//! transport and ownership-ledger location.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use vlanops_device::{CommandDevice, Connection, StateFileDevice, Transport};

/// Keyring service name under which device passwords are stored.
pub const KEYRING_SERVICE: &str = "vlanops";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("no profile selected and no default profile configured")]
    NoProfile,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Pick a profile: explicit name first, then `default_profile`.
    pub fn profile(&self, requested: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = requested
            .or(self.default_profile.as_deref())
            .ok_or(ConfigError::NoProfile)?;
        self.profiles
            .get_key_value(name)
            .map(|(name, profile)| (name.as_str(), profile))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

/// Settings that apply to every profile. `output` and `color` take the
/// same values as the `--output` and `--color` flags, which override them.
#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Transport timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// How vlanops reaches the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// A local JSON file acting as the device (labs, CI dry runs).
    #[default]
    StateFile,
    /// An external transport program.
    Command,
}

/// A named device profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    #[serde(default)]
    pub backend: BackendKind,

    /// Device name recorded in the ownership ledger. Defaults to the
    /// profile name.
    pub device: Option<String>,

    /// Running-config file for the `state-file` backend.
    pub state_file: Option<PathBuf>,

    /// Transport program for the `command` backend.
    pub command: Option<PathBuf>,

    /// Arguments placed before the transport verb.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command_args: Vec<String>,

    /// Management address of the device.
    pub host: Option<String>,

    pub port: Option<u16>,

    pub username: Option<String>,

    /// Password (plaintext, prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Enable/privileged-mode secret (plaintext, prefer keyring).
    pub enable_password: Option<String>,

    /// Environment variable name containing the enable secret.
    pub enable_password_env: Option<String>,

    /// Device type passed to the transport (`cisco_ios`, `cisco_xr`).
    pub platform: Option<String>,

    /// Ownership ledger location. Defaults to the data directory.
    pub ledger: Option<PathBuf>,

    /// Override the default timeout, in seconds.
    pub timeout: Option<u64>,
}

impl Profile {
    pub fn device_name<'a>(&'a self, profile_name: &'a str) -> &'a str {
        self.device.as_deref().unwrap_or(profile_name)
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "vlanops", "vlanops")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("vlanops");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory for ledgers when a profile does not name one.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("data"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

/// Where the ownership ledger for a profile lives.
pub fn ledger_path(profile: &Profile, profile_name: &str) -> PathBuf {
    profile.ledger.clone().unwrap_or_else(|| {
        data_dir()
            .join("ledgers")
            .join(format!("{}.json", profile.device_name(profile_name)))
    })
}

// ── Config loading ──────────────────────────────────────────────────

/// Load config from `path` + `VLANOPS_` environment overrides.
///
/// Nested keys use a double underscore: `VLANOPS_DEFAULTS__TIMEOUT=60`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("VLANOPS_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Which secret of a profile a keyring entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Password,
    EnablePassword,
}

impl SecretKind {
    fn keyring_user(self, profile_name: &str) -> String {
        match self {
            Self::Password => format!("{profile_name}/password"),
            Self::EnablePassword => format!("{profile_name}/enable-password"),
        }
    }
}

/// Store a secret for `profile_name` in the system keyring.
pub fn store_secret(profile_name: &str, kind: SecretKind, secret: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &kind.keyring_user(profile_name))?;
    entry.set_password(secret)?;
    Ok(())
}

fn resolve_secret(
    env_name: Option<&String>,
    plaintext: Option<&String>,
    profile_name: &str,
    kind: SecretKind,
) -> Option<SecretString> {
    // 1. Profile's *_env → env var lookup
    if let Some(val) = env_name.and_then(|name| std::env::var(name).ok()) {
        return Some(SecretString::from(val));
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &kind.keyring_user(profile_name)) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    plaintext.map(|pw| SecretString::from(pw.clone()))
}

/// Resolve the login password: env var, then keyring, then plaintext.
/// `None` means the transport authenticates some other way (SSH keys).
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    resolve_secret(
        profile.password_env.as_ref(),
        profile.password.as_ref(),
        profile_name,
        SecretKind::Password,
    )
}

/// Resolve the enable secret with the same chain as the password.
pub fn resolve_enable_password(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    resolve_secret(
        profile.enable_password_env.as_ref(),
        profile.enable_password.as_ref(),
        profile_name,
        SecretKind::EnablePassword,
    )
}

// ── Transport wiring ────────────────────────────────────────────────

fn missing(field: &str, backend: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: format!("required by the {backend} backend"),
    }
}

/// Build the device transport a profile describes.
///
/// `timeout` overrides the profile's own timeout (and the global default).
pub fn profile_to_transport(
    profile: &Profile,
    profile_name: &str,
    timeout: Duration,
) -> Result<Transport, ConfigError> {
    match profile.backend {
        BackendKind::StateFile => {
            let path = profile
                .state_file
                .clone()
                .ok_or_else(|| missing("state_file", "state-file"))?;
            Ok(Transport::StateFile(StateFileDevice::new(path)))
        }
        BackendKind::Command => {
            let program = profile
                .command
                .clone()
                .ok_or_else(|| missing("command", "command"))?;
            let host = profile
                .host
                .clone()
                .ok_or_else(|| missing("host", "command"))?;
            let connection = Connection {
                host,
                port: profile.port.unwrap_or(22),
                username: profile.username.clone().unwrap_or_default(),
                password: resolve_password(profile, profile_name),
                enable_password: resolve_enable_password(profile, profile_name),
                platform: profile
                    .platform
                    .clone()
                    .unwrap_or_else(|| "cisco_ios".into()),
            };
            Ok(Transport::Command(
                CommandDevice::new(program, connection)
                    .with_args(profile.command_args.iter().cloned())
                    .with_timeout(timeout),
            ))
        }
    }
}

/// Effective timeout: explicit override, then profile, then defaults.
pub fn effective_timeout(config: &Config, profile: &Profile, cli_override: Option<u64>) -> Duration {
    Duration::from_secs(
        cli_override
            .or(profile.timeout)
            .unwrap_or(config.defaults.timeout),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use vlanops_device::DeviceBackend;

    use super::*;

    const SAMPLE: &str = r#"
default_profile = "lab"

[defaults]
timeout = 45

[profiles.lab]
backend = "state-file"
state_file = "/tmp/lab-sw1.json"

[profiles.core]
backend = "command"
device = "core-rtr1"
command = "/usr/local/bin/netmiko-transport"
command_args = ["--verbose"]
host = "10.0.0.1"
username = "netops"
password = "plain"
platform = "cisco_xr"
timeout = 90
"#;

    fn sample() -> Config {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        load_config_from(&path).unwrap()
    }

    #[test]
    fn loads_profiles_and_defaults() {
        let cfg = sample();
        assert_eq!(cfg.defaults.timeout, 45);
        assert_eq!(cfg.defaults.output, "table");
        let names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
        assert_eq!(names, ["core", "lab"]);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn profile_selection_prefers_explicit_name() {
        let cfg = sample();
        assert_eq!(cfg.profile(None).unwrap().0, "lab");
        assert_eq!(cfg.profile(Some("core")).unwrap().0, "core");
        assert!(matches!(
            cfg.profile(Some("nope")),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn timeout_precedence() {
        let cfg = sample();
        let (_, core) = cfg.profile(Some("core")).unwrap();
        let (_, lab) = cfg.profile(Some("lab")).unwrap();
        assert_eq!(effective_timeout(&cfg, core, None), Duration::from_secs(90));
        assert_eq!(effective_timeout(&cfg, lab, None), Duration::from_secs(45));
        assert_eq!(effective_timeout(&cfg, core, Some(5)), Duration::from_secs(5));
    }

    #[test]
    fn ledger_defaults_to_device_name() {
        let cfg = sample();
        let (name, core) = cfg.profile(Some("core")).unwrap();
        let path = ledger_path(core, name);
        assert!(path.ends_with("ledgers/core-rtr1.json"), "{}", path.display());
    }

    #[test]
    fn state_file_profile_builds_state_file_transport() {
        let cfg = sample();
        let (name, lab) = cfg.profile(Some("lab")).unwrap();
        let transport = profile_to_transport(lab, name, Duration::from_secs(1)).unwrap();
        assert_eq!(transport.describe(), "state file /tmp/lab-sw1.json");
    }

    #[test]
    fn command_profile_builds_command_transport() {
        let cfg = sample();
        let (name, core) = cfg.profile(Some("core")).unwrap();
        let transport = profile_to_transport(core, name, Duration::from_secs(1)).unwrap();
        assert_eq!(
            transport.describe(),
            "/usr/local/bin/netmiko-transport -> netops@10.0.0.1:22"
        );
    }

    #[test]
    fn command_backend_requires_host() {
        let profile = Profile {
            backend: BackendKind::Command,
            command: Some("/bin/true".into()),
            ..Profile::default()
        };
        let err = profile_to_transport(&profile, "x", Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.to_string(), "invalid host: required by the command backend");
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                state_file: Some("/tmp/sw.json".into()),
                ..Profile::default()
            },
        );
        save_config_to(&cfg, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        let (_, profile) = loaded.profile(None).unwrap();
        assert_eq!(profile.state_file.as_deref(), Some(Path::new("/tmp/sw.json")));
        assert_eq!(profile.backend, BackendKind::StateFile);
    }
}
