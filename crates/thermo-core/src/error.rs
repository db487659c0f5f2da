// ── Core error types ──
//
// User-facing errors from thermo-core. Consumers never see HTTP statuses
// or JSON failures directly: device-library errors are translated per
// phase (connect, fetch, move) so the surface can tell "can't reach the
// device" apart from "device reachable but position unreadable".

use thiserror::Error;

use crate::model::Position;

/// Coarse classification used by the control surface and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No device handle could be obtained.
    Connection,
    /// Handle obtained, current position unreadable.
    Fetch,
    /// A position change failed or could not be submitted.
    Mutation,
    /// Lifecycle, configuration and internal failures.
    Other,
}

/// Unified error type for the core crate.
///
/// `Clone` so cache entries can hand the same error to every reader.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to device at {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Position errors ──────────────────────────────────────────────
    #[error("Device reachable but position unreadable: {reason}")]
    FetchFailed { reason: String },

    // ── Mutation errors ──────────────────────────────────────────────
    #[error("Move to position {position} failed: {reason}")]
    MutationFailed { position: Position, reason: String },

    #[error("Control surface is not ready (currently {state})")]
    NotReady { state: &'static str },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Device session has not been activated")]
    Inactive,

    #[error("Superseded by a credential change")]
    Superseded,

    // ── Credential / configuration errors ────────────────────────────
    #[error("Invalid credentials: {message}")]
    InvalidCredentials { message: String },

    #[error("Credential store error: {message}")]
    CredentialStore { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionFailed { .. } | Self::AuthenticationFailed { .. } => {
                ErrorKind::Connection
            }
            Self::FetchFailed { .. } => ErrorKind::Fetch,
            Self::MutationFailed { .. } | Self::NotReady { .. } => ErrorKind::Mutation,
            Self::Inactive
            | Self::Superseded
            | Self::InvalidCredentials { .. }
            | Self::CredentialStore { .. }
            | Self::Config { .. }
            | Self::Internal(_) => ErrorKind::Other,
        }
    }

    // ── Conversion from device-library errors, per phase ─────────────

    /// A failure while obtaining the device handle.
    pub(crate) fn connection(endpoint: &str, err: &thermo_api::Error) -> Self {
        if err.is_auth_error() {
            Self::AuthenticationFailed {
                message: err.to_string(),
            }
        } else {
            Self::ConnectionFailed {
                endpoint: endpoint.to_owned(),
                reason: err.to_string(),
            }
        }
    }

    /// A failure while reading the position from a connected device.
    pub(crate) fn fetch(err: &thermo_api::Error) -> Self {
        Self::FetchFailed {
            reason: err.to_string(),
        }
    }

    /// A failure while moving the device to `position`.
    pub(crate) fn mutation(position: Position, err: &thermo_api::Error) -> Self {
        Self::MutationFailed {
            position,
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_credentials_are_connection_errors() {
        let err = CoreError::connection("https://robot", &thermo_api::Error::InvalidApiKey);
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn timeouts_map_onto_the_phase_error() {
        let timeout = thermo_api::Error::Timeout {
            timeout: std::time::Duration::from_secs(7),
        };

        let err = CoreError::connection("https://robot", &timeout);
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.to_string().contains("7s"));

        assert_eq!(CoreError::fetch(&timeout).kind(), ErrorKind::Fetch);
        assert_eq!(
            CoreError::mutation(Position::MIN, &timeout).kind(),
            ErrorKind::Mutation
        );
    }

    #[test]
    fn fetch_and_connection_stay_distinct() {
        let api = thermo_api::Error::Api {
            message: "boom".into(),
            status: 500,
        };
        assert_ne!(
            CoreError::fetch(&api).kind(),
            CoreError::connection("https://robot", &api).kind()
        );
    }
}
