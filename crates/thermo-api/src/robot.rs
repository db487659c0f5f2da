// Robot gateway client
//
// Authenticates an API key against the gateway, then hands out component
// clients that share the resulting bearer-token `reqwest::Client`.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use crate::auth::ApiKeyCredential;
use crate::error::Error;
use crate::servo::ServoClient;
use crate::transport::TransportConfig;

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
}

/// An authenticated connection to one robot.
///
/// Cheap to clone: the inner `reqwest::Client` is reference counted, so
/// every [`ServoClient`] derived from it reuses the same connection pool.
#[derive(Debug, Clone)]
pub struct RobotClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl RobotClient {
    /// Authenticate against the gateway at `base_url`.
    ///
    /// Sends the credential to `POST /v1/auth` and builds a client that
    /// carries the issued access token on every later request.
    pub async fn connect(
        base_url: Url,
        credential: &ApiKeyCredential,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let timeout = transport.timeout;
        let anonymous = transport.build_client()?;
        let url = endpoint_url(&base_url, "v1/auth")?;
        debug!("POST {}", url);

        let resp = anonymous
            .post(url)
            .json(&credential.auth_request())
            .send()
            .await
            .map_err(|e| map_send_error(e, timeout))?;

        match resp.status() {
            StatusCode::UNAUTHORIZED => return Err(Error::InvalidApiKey),
            StatusCode::FORBIDDEN => {
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::Authentication {
                    message: preview(&body, "credential rejected"),
                });
            }
            _ => {}
        }

        let auth: AuthResponse = parse_json(resp).await?;

        let mut token = HeaderValue::from_str(&format!("Bearer {}", auth.access_token))
            .map_err(|_| Error::Authentication {
                message: "gateway issued an unusable access token".into(),
            })?;
        token.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, token);
        let http = transport.build_client_with_headers(headers)?;

        info!(endpoint = %base_url, entity = %credential.key_id, "authenticated with robot gateway");
        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    /// The gateway base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// A client for the servo component `name` on this robot.
    pub fn servo(&self, name: impl Into<String>) -> ServoClient {
        ServoClient::new(
            self.http.clone(),
            self.base_url.clone(),
            name.into(),
            self.timeout,
        )
    }
}

// ── Shared request helpers ───────────────────────────────────────────

/// Build `{base}/{path}` without `Url::join` dropping a trailing base segment.
pub(crate) fn endpoint_url(base: &Url, path: &str) -> Result<Url, Error> {
    let base = base.as_str().trim_end_matches('/');
    Ok(Url::parse(&format!("{base}/{path}"))?)
}

/// Translate a send failure, surfacing timeouts as [`Error::Timeout`].
pub(crate) fn map_send_error(err: reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        Error::Timeout { timeout }
    } else {
        Error::Transport(err)
    }
}

/// Decode a JSON body, mapping non-success statuses to [`Error::Api`].
pub(crate) async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(Error::Transport)?;

    if !status.is_success() {
        return Err(Error::Api {
            message: preview(&body, status.canonical_reason().unwrap_or("request failed")),
            status: status.as_u16(),
        });
    }

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body, "")),
        body,
    })
}

/// First 200 chars of a response body, or `fallback` when it is empty.
pub(crate) fn preview(body: &str, fallback: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return fallback.to_owned();
    }
    trimmed.chars().take(200).collect()
}
