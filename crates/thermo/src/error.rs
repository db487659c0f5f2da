//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use thermo_config::ConfigError;
use thermo_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the dial at {endpoint}")]
    #[diagnostic(
        code(thermo::connection_failed),
        help(
            "An unexpected error occurred. Please try again later or verify API key.\n\
             Endpoint: {endpoint}"
        )
    )]
    ConnectionFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(thermo::auth_failed),
        help("Verify the API key and its id.\nRun: thermo config set-key")
    )]
    AuthFailed { message: String },

    #[error("No API key configured")]
    #[diagnostic(
        code(thermo::no_credentials),
        help(
            "Store one with: thermo config set-key\n\
             Or set THERMO_API_KEY and THERMO_API_KEY_ID."
        )
    )]
    NoCredentials,

    // ── Device ───────────────────────────────────────────────────────
    #[error("Dial position unreadable: {reason}")]
    #[diagnostic(
        code(thermo::position_unreadable),
        help("The robot is reachable but the servo did not report a position.\nCheck --component.")
    )]
    PositionUnreadable { reason: String },

    #[error("Dial did not move to {position}: {reason}")]
    #[diagnostic(code(thermo::move_failed), help("The last known position is unchanged."))]
    MoveFailed { position: u32, reason: String },

    #[error("The dial is not ready ({state})")]
    #[diagnostic(code(thermo::not_ready), help("Run: thermo status"))]
    NotReady { state: String },

    #[error("Internal error: {message}")]
    #[diagnostic(code(thermo::internal))]
    Internal { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(thermo::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(thermo::config), help("Inspect with: thermo config show"))]
    Config(#[from] ConfigError),

    #[error("Credential store error: {message}")]
    #[diagnostic(
        code(thermo::keyring),
        help("The system keyring may be locked or unavailable.\nAlternatively set THERMO_API_KEY and THERMO_API_KEY_ID.")
    )]
    CredentialStore { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials | Self::CredentialStore { .. } => {
                exit_code::AUTH
            }
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { endpoint, reason } => Self::ConnectionFailed {
                endpoint,
                source: reason.into(),
            },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::FetchFailed { reason } => Self::PositionUnreadable { reason },
            CoreError::MutationFailed { position, reason } => Self::MoveFailed {
                position: position.degrees(),
                reason,
            },
            CoreError::NotReady { state } => Self::NotReady {
                state: state.replace('_', " "),
            },
            CoreError::InvalidCredentials { message } => Self::Validation {
                field: "api key".into(),
                reason: message,
            },
            CoreError::CredentialStore { message } => Self::CredentialStore { message },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Inactive => Self::Internal {
                message: "device session was never activated".into(),
            },
            CoreError::Superseded => Self::Internal {
                message: "credentials changed while the command was running".into(),
            },
            CoreError::Internal(message) => Self::Internal { message },
        }
    }
}
