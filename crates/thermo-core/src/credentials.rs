// ── Credentials ──
//
// The API key pair the device session authenticates with, and the storage
// seam it is read from. The store is the single source of truth: the
// control surface re-reads it on every state evaluation.

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;

use crate::error::CoreError;

/// Name of the persistent slot holding the serialized credential pair.
pub const CREDENTIAL_SLOT: &str = "API_KEY";

/// An API key and the key id it belongs to. Both are non-empty.
#[derive(Debug, Clone)]
pub struct CredentialPair {
    key: SecretString,
    id: String,
}

impl CredentialPair {
    pub fn new(key: SecretString, id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        if key.expose_secret().trim().is_empty() {
            return Err(CoreError::InvalidCredentials {
                message: "API key is empty".into(),
            });
        }
        if id.trim().is_empty() {
            return Err(CoreError::InvalidCredentials {
                message: "API key id is empty".into(),
            });
        }
        Ok(Self { key, id })
    }

    pub fn key(&self) -> &SecretString {
        &self.key
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether both halves of the pair are identical.
    pub fn same_as(&self, other: &Self) -> bool {
        self.id == other.id && self.key.expose_secret() == other.key.expose_secret()
    }

    pub(crate) fn to_api_credential(&self) -> thermo_api::ApiKeyCredential {
        thermo_api::ApiKeyCredential::new(self.id.clone(), self.key.clone())
    }
}

/// Persistent storage for the credential pair.
///
/// `get` returns `Ok(None)` when nothing is stored. Implementations must be
/// cheap to call: it runs on every state evaluation.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Result<Option<CredentialPair>, CoreError>;
    fn set(&self, credentials: CredentialPair) -> Result<(), CoreError>;
    fn clear(&self) -> Result<(), CoreError>;
}

impl<T: CredentialStore + ?Sized> CredentialStore for std::sync::Arc<T> {
    fn get(&self) -> Result<Option<CredentialPair>, CoreError> {
        (**self).get()
    }

    fn set(&self, credentials: CredentialPair) -> Result<(), CoreError> {
        (**self).set(credentials)
    }

    fn clear(&self) -> Result<(), CoreError> {
        (**self).clear()
    }
}

/// In-process store. Used by tests and by callers that take credentials
/// from the command line without persisting them.
pub struct MemoryCredentialStore {
    slot: watch::Sender<Option<CredentialPair>>,
}

impl MemoryCredentialStore {
    pub fn new(initial: Option<CredentialPair>) -> Self {
        let (slot, _) = watch::channel(initial);
        Self { slot }
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<CredentialPair>, CoreError> {
        Ok(self.slot.borrow().clone())
    }

    fn set(&self, credentials: CredentialPair) -> Result<(), CoreError> {
        self.slot.send_replace(Some(credentials));
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        self.slot.send_replace(None);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pair(key: &str, id: &str) -> CredentialPair {
        CredentialPair::new(SecretString::from(key.to_string()), id).unwrap()
    }

    #[test]
    fn rejects_empty_halves() {
        assert!(CredentialPair::new(SecretString::from(String::new()), "id").is_err());
        assert!(CredentialPair::new(SecretString::from("key".to_string()), "  ").is_err());
    }

    #[test]
    fn pair_identity_covers_both_halves() {
        assert!(pair("k", "i").same_as(&pair("k", "i")));
        assert!(!pair("k", "i").same_as(&pair("k2", "i")));
        assert!(!pair("k", "i").same_as(&pair("k", "i2")));
    }

    #[test]
    fn debug_output_redacts_the_key() {
        let rendered = format!("{:?}", pair("super-secret", "id"));
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryCredentialStore::default();
        assert!(store.get().unwrap().is_none());

        store.set(pair("k", "i")).unwrap();
        assert_eq!(store.get().unwrap().unwrap().id(), "i");

        store.clear().unwrap();
        assert!(store.get().unwrap().is_none());
    }
}
