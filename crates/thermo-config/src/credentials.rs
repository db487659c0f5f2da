// ── Credential resolution ──
//
// The pair is looked up in order: environment, system keyring, plaintext
// in the config file. The keyring entry holds `{"key": …, "id": …}` as
// JSON. Keyring failures (no secret service, locked store) count as
// "not stored" so the chain can fall through.
//
// `clear` removes the keyring entry and forgets the plaintext pair for the
// lifetime of the store. A pair taken from the environment cannot be
// cleared from here, so `clear` refuses it instead of pretending.

use std::sync::{Mutex, PoisonError};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use thermo_core::{CREDENTIAL_SLOT, CoreError, CredentialPair, CredentialStore};

use crate::DeviceSettings;

pub const KEYRING_SERVICE: &str = "thermo";
pub const ENV_API_KEY: &str = "THERMO_API_KEY";
pub const ENV_API_KEY_ID: &str = "THERMO_API_KEY_ID";

/// Where a resolved pair came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    Keyring,
    ConfigFile,
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Environment => "environment",
            Self::Keyring => "keyring",
            Self::ConfigFile => "config file",
        })
    }
}

#[derive(Serialize, Deserialize)]
struct StoredPair {
    key: String,
    id: String,
}

/// `CredentialStore` backed by env, keyring and config file.
pub struct ConfigCredentialStore {
    keyring_service: Option<String>,
    env: Option<(String, String)>,
    plaintext: Mutex<Option<(String, String)>>,
}

impl ConfigCredentialStore {
    pub fn new(settings: &DeviceSettings) -> Self {
        Self {
            keyring_service: Some(KEYRING_SERVICE.into()),
            env: std::env::var(ENV_API_KEY)
                .ok()
                .zip(std::env::var(ENV_API_KEY_ID).ok()),
            plaintext: Mutex::new(settings.api_key.clone().zip(settings.api_key_id.clone())),
        }
    }

    /// Skip the system keyring entirely.
    pub fn without_keyring(mut self) -> Self {
        self.keyring_service = None;
        self
    }

    /// Ignore `THERMO_API_KEY` / `THERMO_API_KEY_ID`.
    pub fn without_env(mut self) -> Self {
        self.env = None;
        self
    }

    /// Resolve the pair together with where it was found.
    pub fn resolve(&self) -> Option<(CredentialPair, CredentialSource)> {
        if let Some(pair) = self.env_pair() {
            return Some((pair, CredentialSource::Environment));
        }
        if let Some(pair) = self.keyring_pair() {
            return Some((pair, CredentialSource::Keyring));
        }
        self.plaintext_pair()
            .map(|pair| (pair, CredentialSource::ConfigFile))
    }

    fn env_pair(&self) -> Option<CredentialPair> {
        let (key, id) = self.env.as_ref()?;
        CredentialPair::new(SecretString::from(key.clone()), id.clone()).ok()
    }

    fn keyring_pair(&self) -> Option<CredentialPair> {
        let entry = self.entry().ok().flatten()?;
        let raw = match entry.get_password() {
            Ok(raw) => raw,
            Err(keyring::Error::NoEntry) => return None,
            Err(e) => {
                debug!(error = %e, "keyring unavailable");
                return None;
            }
        };
        match serde_json::from_str::<StoredPair>(&raw) {
            Ok(stored) => CredentialPair::new(SecretString::from(stored.key), stored.id).ok(),
            Err(e) => {
                debug!(error = %e, "ignoring malformed keyring entry");
                None
            }
        }
    }

    fn plaintext_pair(&self) -> Option<CredentialPair> {
        let plaintext = self.plaintext.lock().unwrap_or_else(PoisonError::into_inner);
        let (key, id) = plaintext.as_ref()?;
        CredentialPair::new(SecretString::from(key.clone()), id.clone()).ok()
    }

    fn entry(&self) -> Result<Option<keyring::Entry>, CoreError> {
        let Some(service) = &self.keyring_service else {
            return Ok(None);
        };
        keyring::Entry::new(service, CREDENTIAL_SLOT)
            .map(Some)
            .map_err(|e| CoreError::CredentialStore {
                message: e.to_string(),
            })
    }
}

impl CredentialStore for ConfigCredentialStore {
    fn get(&self) -> Result<Option<CredentialPair>, CoreError> {
        Ok(self.resolve().map(|(pair, _)| pair))
    }

    fn set(&self, credentials: CredentialPair) -> Result<(), CoreError> {
        let Some(entry) = self.entry()? else {
            return Err(CoreError::CredentialStore {
                message: "keyring disabled".into(),
            });
        };
        let stored = StoredPair {
            key: credentials.key().expose_secret().to_owned(),
            id: credentials.id().to_owned(),
        };
        let raw = serde_json::to_string(&stored).map_err(|e| CoreError::Internal(e.to_string()))?;
        entry
            .set_password(&raw)
            .map_err(|e| CoreError::CredentialStore {
                message: e.to_string(),
            })
    }

    fn clear(&self) -> Result<(), CoreError> {
        if self.env_pair().is_some() {
            return Err(CoreError::CredentialStore {
                message: format!("{ENV_API_KEY} is set in the environment; unset it to clear the key"),
            });
        }

        if let Some(entry) = self.entry()? {
            match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => {}
                Err(e) => {
                    return Err(CoreError::CredentialStore {
                        message: e.to_string(),
                    });
                }
            }
        }

        if self
            .plaintext
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            debug!("plaintext API key forgotten");
        }
        Ok(())
    }
}
