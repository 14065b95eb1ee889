//! Config subcommand handlers.

use dialoguer::{Input, Select};
use vlanops_config::{BackendKind, Config, Profile, SecretKind};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

fn invalid(field: &str, reason: impl Into<String>) -> CliError {
    CliError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

fn save(cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    Ok(vlanops_config::save_config_to(cfg, &config::config_path(global))?)
}

/// Ask for a secret and keep it in the keyring, or return it for the file.
fn prompt_secret(profile_name: &str, kind: SecretKind, label: &str) -> Result<Option<String>, CliError> {
    let secret = rpassword::prompt_password(format!("{label} (empty for none): ")).map_err(prompt_err)?;
    if secret.is_empty() {
        return Ok(None);
    }

    let store_choices = &["Store in system keyring (recommended)", "Save to config file (plaintext)"];
    let store_selection = Select::new()
        .with_prompt(format!("Where to store the {}?", label.to_lowercase()))
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if store_selection == 0 {
        vlanops_config::store_secret(profile_name, kind, &secret)?;
        eprintln!("   ✓ {label} stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(secret))
    }
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path(global);
            eprintln!("vlanops configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let mut cfg = config::load(global)?;

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let backend_choices = &[
                "Transport program (SSH / NETCONF wrapper)",
                "State file (lab / dry run)",
            ];
            let backend_selection = Select::new()
                .with_prompt("How is the device reached?")
                .items(backend_choices)
                .default(0)
                .interact()
                .map_err(prompt_err)?;

            let mut profile = Profile::default();
            if backend_selection == 0 {
                profile.backend = BackendKind::Command;
                let command: String = Input::new()
                    .with_prompt("Transport program")
                    .interact_text()
                    .map_err(prompt_err)?;
                let host: String = Input::new()
                    .with_prompt("Device address")
                    .interact_text()
                    .map_err(prompt_err)?;
                let username: String = Input::new()
                    .with_prompt("Username")
                    .interact_text()
                    .map_err(prompt_err)?;
                let platform: String = Input::new()
                    .with_prompt("Platform")
                    .default("cisco_ios".into())
                    .interact_text()
                    .map_err(prompt_err)?;
                if command.is_empty() || host.is_empty() {
                    return Err(invalid("profile", "transport program and address cannot be empty"));
                }
                profile.command = Some(command.into());
                profile.host = Some(host);
                profile.username = Some(username);
                profile.platform = Some(platform);
                profile.password = prompt_secret(&profile_name, SecretKind::Password, "Password")?;
                profile.enable_password =
                    prompt_secret(&profile_name, SecretKind::EnablePassword, "Enable secret")?;
            } else {
                profile.backend = BackendKind::StateFile;
                let path: String = Input::new()
                    .with_prompt("State file")
                    .default(format!("{profile_name}.json"))
                    .interact_text()
                    .map_err(prompt_err)?;
                profile.state_file = Some(path.into());
            }

            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());
            save(&cfg, global)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Try it: vlanops state show");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|_| format!("{c:#?}")),
                |c| c.profiles.keys().cloned().collect::<Vec<_>>().join("\n"),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load(global)?;
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();

            match key.as_str() {
                "backend" => {
                    profile.backend = match value.as_str() {
                        "state-file" | "state_file" => BackendKind::StateFile,
                        "command" => BackendKind::Command,
                        _ => return Err(invalid("backend", "must be 'state-file' or 'command'")),
                    };
                }
                "device" => profile.device = Some(value),
                "state_file" | "state-file" => profile.state_file = Some(value.into()),
                "command" => profile.command = Some(value.into()),
                "host" => profile.host = Some(value),
                "port" => {
                    profile.port =
                        Some(value.parse().map_err(|_| invalid("port", "must be a port number"))?);
                }
                "username" => profile.username = Some(value),
                "password_env" | "password-env" => profile.password_env = Some(value),
                "enable_password_env" | "enable-password-env" => {
                    profile.enable_password_env = Some(value);
                }
                "platform" => profile.platform = Some(value),
                "ledger" => profile.ledger = Some(value.into()),
                "timeout" => {
                    profile.timeout = Some(
                        value
                            .parse()
                            .map_err(|_| invalid("timeout", "must be a number (seconds)"))?,
                    );
                }
                other => {
                    return Err(invalid(
                        other,
                        format!(
                            "unknown config key '{other}'. Valid keys: backend, device, state_file, \
                             command, host, port, username, password_env, enable_password_env, \
                             platform, ledger, timeout"
                        ),
                    ));
                }
            }

            save(&cfg, global)?;
            if !global.quiet {
                eprintln!("✓ Set {key} on profile '{profile_name}'");
            }
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load(global)?;
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: vlanops config init");
            } else {
                for name in cfg.profiles.keys() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load(global)?;
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    name,
                    available: config::available_profiles(&cfg),
                });
            }
            cfg.default_profile = Some(name.clone());
            save(&cfg, global)?;
            if !global.quiet {
                eprintln!("✓ Default profile set to '{name}'");
            }
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword { profile, enable } => {
            let cfg = config::load(global)?;
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    name: profile_name,
                    available: config::available_profiles(&cfg),
                });
            }

            let (kind, label) = if enable {
                (SecretKind::EnablePassword, "Enable secret: ")
            } else {
                (SecretKind::Password, "Password: ")
            };
            let secret = rpassword::prompt_password(label).map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(invalid("secret", "value cannot be empty"));
            }
            vlanops_config::store_secret(&profile_name, kind, &secret)?;

            eprintln!("✓ Secret stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}
