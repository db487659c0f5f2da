// HTTP client construction for the robot gateway.
//
// One anonymous client performs the auth handshake; a second one, carrying
// the issued bearer token, is shared by every component client.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::error::Error;

/// How the gateway's TLS certificate is verified.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Trust the PEM-encoded CA at this path in addition to the system roots.
    CustomCa(PathBuf),
    /// Skip verification entirely. Only for gateways on a local network.
    DangerAcceptInvalid,
}

/// TLS and per-request deadline shared by all gateway requests.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    /// Client for unauthenticated requests (the auth handshake).
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        self.build_client_with_headers(HeaderMap::new())
    }

    /// Client that sends `headers` on every request.
    pub fn build_client_with_headers(&self, headers: HeaderMap) -> Result<reqwest::Client, Error> {
        let builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("thermo/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers);

        self.tls
            .apply(builder)?
            .build()
            .map_err(|e| Error::Tls(format!("cannot build gateway client: {e}")))
    }
}

impl TlsMode {
    fn apply(&self, builder: reqwest::ClientBuilder) -> Result<reqwest::ClientBuilder, Error> {
        Ok(match self {
            Self::System => builder,
            Self::CustomCa(path) => {
                let pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("cannot read CA {}: {e}", path.display())))?;
                let ca = reqwest::Certificate::from_pem(&pem)
                    .map_err(|e| Error::Tls(format!("{} is not a PEM certificate: {e}", path.display())))?;
                builder.add_root_certificate(ca)
            }
            Self::DangerAcceptInvalid => builder.danger_accept_invalid_certs(true),
        })
    }
}
