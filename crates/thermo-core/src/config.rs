// ── Runtime device configuration ──
//
// Describes *which* robot and servo to talk to and how long to wait.
// Never touches disk: the CLI loads its profile and builds a `DialConfig`.

use std::time::Duration;

use url::Url;

/// Servo component the dial is attached to.
pub const DEFAULT_COMPONENT: &str = "thermo-dial";

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). Default for the cloud-hosted robot.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed local gateways).
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for thermo_api::TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => Self::System,
            TlsVerification::CustomCa(path) => Self::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => Self::DangerAcceptInvalid,
        }
    }
}

/// Configuration for one dial.
#[derive(Debug, Clone)]
pub struct DialConfig {
    /// Robot gateway URL.
    pub endpoint: Url,
    /// Name of the servo component on the robot.
    pub component: String,
    pub tls: TlsVerification,
    /// Upper bound on establishing a device session.
    pub connect_timeout: Duration,
    /// Upper bound on a single position read or move.
    pub request_timeout: Duration,
}

impl DialConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            component: DEFAULT_COMPONENT.into(),
            tls: TlsVerification::default(),
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(10),
        }
    }
}
