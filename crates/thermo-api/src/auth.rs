use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

/// An API key credential for the robot gateway.
///
/// The gateway authenticates an *entity* (the key id) with a typed
/// credential payload (the key itself).
#[derive(Debug, Clone)]
pub struct ApiKeyCredential {
    /// Key id, sent as the authenticated entity.
    pub key_id: String,
    /// Secret key material.
    pub key: SecretString,
}

impl ApiKeyCredential {
    pub fn new(key_id: impl Into<String>, key: SecretString) -> Self {
        Self {
            key_id: key_id.into(),
            key,
        }
    }

    /// Build the JSON body for `POST /v1/auth`.
    pub(crate) fn auth_request(&self) -> AuthRequest<'_> {
        AuthRequest {
            entity: &self.key_id,
            credential: CredentialPayload {
                kind: "api-key",
                payload: self.key.expose_secret(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AuthRequest<'a> {
    entity: &'a str,
    credential: CredentialPayload<'a>,
}

#[derive(Debug, Serialize)]
struct CredentialPayload<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    payload: &'a str,
}
