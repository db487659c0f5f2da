//! Shared configuration for the thermo dial.
//!
//! TOML config file, credential resolution (env + keyring + plaintext),
//! and translation to `thermo_core::DialConfig`. The CLI adds
//! `GlobalOpts`-aware overrides on top.

mod credentials;

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use thermo_core::{DialConfig, TlsVerification};

pub use credentials::{
    CredentialSource, ConfigCredentialStore, ENV_API_KEY, ENV_API_KEY_ID, KEYRING_SERVICE,
};

/// Robot the dial is installed on.
///
/// The client speaks the JSON gateway protocol (`/v1/auth`,
/// `/v1/components/servo/...`), which this host does not serve by itself.
/// Point `device.endpoint` at the gateway running in front of the robot.
pub const DEFAULT_ENDPOINT: &str = "https://thermo-main.jfep7z3w9l.viam.cloud";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

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
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceSettings,

    #[serde(default)]
    pub defaults: Defaults,
}

/// Which robot and servo to talk to.
#[derive(Debug, Deserialize, Serialize)]
pub struct DeviceSettings {
    /// Robot gateway URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Servo component name.
    #[serde(default = "default_component")]
    pub component: String,

    /// API key (plaintext, prefer keyring or env var).
    pub api_key: Option<String>,

    /// Key id paired with `api_key`.
    pub api_key_id: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    #[serde(default)]
    pub insecure: bool,

    /// Seconds allowed for establishing the device session.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Seconds allowed for one position read or move.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            component: default_component(),
            api_key: None,
            api_key_id: None,
            ca_cert: None,
            insecure: false,
            connect_timeout: default_connect_timeout(),
            timeout: default_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}
fn default_component() -> String {
    thermo_core::config::DEFAULT_COMPONENT.into()
}
fn default_connect_timeout() -> u64 {
    15
}
fn default_timeout() -> u64 {
    10
}
fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "thermo", "thermo").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("thermo");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Environment keys use `__` between section and field, e.g.
/// `THERMO_DEVICE__ENDPOINT`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("THERMO_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `DialConfig` from the `[device]` section.
pub fn to_dial_config(settings: &DeviceSettings) -> Result<DialConfig, ConfigError> {
    let endpoint: url::Url = settings
        .endpoint
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "endpoint".into(),
            reason: format!("invalid URL: {}", settings.endpoint),
        })?;

    if settings.component.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "component".into(),
            reason: "must not be empty".into(),
        });
    }

    let tls = if settings.insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = settings.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(DialConfig {
        component: settings.component.clone(),
        tls,
        connect_timeout: Duration::from_secs(settings.connect_timeout),
        request_timeout: Duration::from_secs(settings.timeout),
        ..DialConfig::new(endpoint)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_installed_dial() {
        let dial = to_dial_config(&DeviceSettings::default()).unwrap();
        assert_eq!(dial.endpoint.as_str(), "https://thermo-main.jfep7z3w9l.viam.cloud/");
        assert_eq!(dial.component, "thermo-dial");
        assert_eq!(dial.tls, TlsVerification::SystemDefaults);
        assert_eq!(dial.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn rejects_bad_endpoint() {
        let settings = DeviceSettings {
            endpoint: "not a url".into(),
            ..DeviceSettings::default()
        };
        assert!(matches!(
            to_dial_config(&settings),
            Err(ConfigError::Validation { ref field, .. }) if field == "endpoint"
        ));
    }

    #[test]
    fn insecure_wins_over_custom_ca() {
        let settings = DeviceSettings {
            insecure: true,
            ca_cert: Some("/tmp/ca.pem".into()),
            ..DeviceSettings::default()
        };
        assert_eq!(
            to_dial_config(&settings).unwrap().tls,
            TlsVerification::DangerAcceptInvalid
        );
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[device]\nendpoint = \"https://robot.local\"\ntimeout = 3\n",
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.device.endpoint, "https://robot.local");
        assert_eq!(cfg.device.timeout, 3);
        assert_eq!(cfg.device.component, "thermo-dial");
        assert_eq!(cfg.defaults.output, "table");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.device.component = "spare-dial".into();

        save_config_to(&cfg, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.device.component, "spare-dial");
    }
}
