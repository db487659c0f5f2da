//! Config subcommand handlers.

use dialoguer::{Input, Select};
use secrecy::SecretString;

use thermo_config::{self as config, Config, ConfigCredentialStore, DEFAULT_ENDPOINT, DeviceSettings};
use thermo_core::{CredentialPair, CredentialStore};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    let d = &cfg.device;
    let _ = writeln!(out, "[device]");
    let _ = writeln!(out, "endpoint = \"{}\"", d.endpoint);
    let _ = writeln!(out, "component = \"{}\"", d.component);
    if d.api_key.is_some() {
        let _ = writeln!(out, "api_key = \"****\"");
    }
    if let Some(ref id) = d.api_key_id {
        let _ = writeln!(out, "api_key_id = \"{id}\"");
    }
    if let Some(ref ca) = d.ca_cert {
        let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
    }
    let _ = writeln!(out, "insecure = {}", d.insecure);
    let _ = writeln!(out, "connect_timeout = {}", d.connect_timeout);
    let _ = writeln!(out, "timeout = {}", d.timeout);
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = write!(out, "color = \"{}\"", cfg.defaults.color);

    out
}

/// Copy of the config with plaintext secrets masked, for structured output.
fn redacted(cfg: &Config) -> Config {
    Config {
        device: DeviceSettings {
            api_key: cfg.device.api_key.as_ref().map(|_| "****".into()),
            api_key_id: cfg.device.api_key_id.clone(),
            endpoint: cfg.device.endpoint.clone(),
            component: cfg.device.component.clone(),
            ca_cert: cfg.device.ca_cert.clone(),
            insecure: cfg.device.insecure,
            connect_timeout: cfg.device.connect_timeout,
            timeout: cfg.device.timeout,
        },
        defaults: config::Defaults {
            output: cfg.defaults.output.clone(),
            color: cfg.defaults.color.clone(),
        },
    }
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Prompt for the key id (unless given) and the key itself.
fn prompt_pair(id: Option<String>) -> Result<CredentialPair, CliError> {
    let id = match id {
        Some(id) => id,
        None => Input::new()
            .with_prompt("API key id")
            .interact_text()
            .map_err(prompt_err)?,
    };
    let key = rpassword::prompt_password("API key: ").map_err(prompt_err)?;
    Ok(CredentialPair::new(SecretString::from(key), id)?)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let source = ConfigCredentialStore::new(&cfg.device)
                .resolve()
                .map(|(_, source)| source);
            let out = output::render_single(
                &global.output,
                &redacted(&cfg),
                format_config_redacted,
                |c| c.device.endpoint.clone(),
            );
            output::print_output(&out, global.quiet);
            if !global.quiet {
                match source {
                    Some(source) => eprintln!("API key: found in {source}"),
                    None => eprintln!("API key: not configured"),
                }
            }
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        ConfigCommand::SetKey { id } => {
            let cfg = config::load_config_or_default();
            let pair = prompt_pair(id)?;
            let key_id = pair.id().to_owned();
            ConfigCredentialStore::new(&cfg.device).set(pair)?;
            eprintln!("✓ API key '{key_id}' stored in system keyring");
            Ok(())
        }

        ConfigCommand::ResetKey => {
            let mut cfg = config::load_config_or_default();
            // The environment is reported below rather than refused.
            ConfigCredentialStore::new(&cfg.device).without_env().clear()?;

            if cfg.device.api_key.take().is_some() {
                cfg.device.api_key_id = None;
                config::save_config(&cfg)?;
                eprintln!("✓ Removed plaintext API key from config file");
            }
            eprintln!("✓ API key removed from system keyring");
            if std::env::var(thermo_config::ENV_API_KEY).is_ok() {
                eprintln!("  Note: {} is still set in the environment", thermo_config::ENV_API_KEY);
            }
            Ok(())
        }
    }
}

// ── Init: interactive wizard ─────────────────────────────────────────

fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("thermo configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let endpoint: String = Input::new()
        .with_prompt("Robot URL")
        .default(DEFAULT_ENDPOINT.into())
        .interact_text()
        .map_err(prompt_err)?;

    let component: String = Input::new()
        .with_prompt("Servo component")
        .default(thermo_core::config::DEFAULT_COMPONENT.into())
        .interact_text()
        .map_err(prompt_err)?;

    let mut settings = DeviceSettings {
        endpoint,
        component,
        ..DeviceSettings::default()
    };
    // Validate before anything is written.
    config::to_dial_config(&settings)?;

    let pair = prompt_pair(None)?;

    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the API key?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        ConfigCredentialStore::new(&settings).set(pair)?;
        eprintln!("   ✓ API key stored in system keyring");
    } else {
        use secrecy::ExposeSecret;
        settings.api_key = Some(pair.key().expose_secret().to_owned());
        settings.api_key_id = Some(pair.id().to_owned());
    }

    let cfg = Config {
        device: settings,
        defaults: config::Defaults::default(),
    };
    config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("\n  Test it: thermo status");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redaction_masks_plaintext_key() {
        let cfg = Config {
            device: DeviceSettings {
                api_key: Some("hunter2".into()),
                api_key_id: Some("id-1".into()),
                ..DeviceSettings::default()
            },
            ..Config::default()
        };
        let text = format_config_redacted(&cfg);
        assert!(!text.contains("hunter2"));
        assert!(text.contains("api_key_id = \"id-1\""));
        assert_eq!(redacted(&cfg).device.api_key.as_deref(), Some("****"));
    }
}
