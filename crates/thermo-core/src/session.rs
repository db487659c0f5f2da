// ── Device session ──
//
// Lazily establishes the connection to the robot. Nothing connects until
// the session is activated, and then at most once per credential pair.
// Binding a different pair (or unbinding) resets the device entry and, by
// dependency, the position entry, which bumps their epochs so that a
// connect still in flight for the old pair is discarded on arrival.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheKey, QueryCache};
use crate::credentials::CredentialPair;
use crate::device::{DeviceConnector, bounded};
use crate::error::CoreError;

/// Whether the host environment has signalled that the session may connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionPhase {
    /// Constructed but not yet activated. Connecting is refused.
    Idle,
    /// Activated. Connects on first demand.
    Active,
}

pub struct DeviceSession<C: DeviceConnector> {
    connector: C,
    cache: Arc<QueryCache<C::Handle>>,
    phase: watch::Sender<SessionPhase>,
    bound: watch::Sender<Option<CredentialPair>>,
    connect_timeout: Duration,
}

impl<C: DeviceConnector> DeviceSession<C> {
    pub fn new(connector: C, cache: Arc<QueryCache<C::Handle>>, connect_timeout: Duration) -> Self {
        let (phase, _) = watch::channel(SessionPhase::Idle);
        let (bound, _) = watch::channel(None);
        Self {
            connector,
            cache,
            phase,
            bound,
            connect_timeout,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    pub fn is_active(&self) -> bool {
        self.phase() == SessionPhase::Active
    }

    /// Allow connecting from now on. Idempotent.
    pub fn activate(&self) {
        let changed = self.phase.send_if_modified(|phase| {
            if *phase == SessionPhase::Idle {
                *phase = SessionPhase::Active;
                true
            } else {
                false
            }
        });
        if changed {
            info!("device session activated");
        }
    }

    /// Generation of the current credential context.
    pub fn epoch(&self) -> u64 {
        self.cache.device().epoch()
    }

    pub fn entry(&self) -> CacheEntry<Arc<C::Handle>> {
        self.cache.device().entry()
    }

    /// The connected handle, if any.
    pub fn handle(&self) -> Option<Arc<C::Handle>> {
        self.cache.ready_handle()
    }

    /// Bind the session to `credentials`. Returns `true` if this replaced a
    /// different pair, in which case all device state was dropped.
    pub fn bind(&self, credentials: &CredentialPair) -> bool {
        let mut replaced = false;
        self.bound.send_if_modified(|bound| match bound {
            Some(current) if current.same_as(credentials) => false,
            Some(_) => {
                replaced = true;
                *bound = Some(credentials.clone());
                true
            }
            None => {
                *bound = Some(credentials.clone());
                true
            }
        });
        if replaced {
            info!(key_id = credentials.id(), "credentials changed, dropping device session");
            self.cache.reset(CacheKey::Device);
        }
        replaced
    }

    /// Forget the bound credentials and drop all device state.
    pub fn unbind(&self) -> bool {
        let had = self.bound.send_replace(None).is_some();
        if had {
            info!("credentials removed, dropping device session");
            self.cache.reset(CacheKey::Device);
        }
        had
    }

    /// Connect with `credentials`, or return the handle already held.
    ///
    /// Concurrent calls share one connect attempt. A failed attempt is
    /// recorded on the device entry and not retried automatically.
    pub async fn connect(&self, credentials: &CredentialPair) -> Result<Arc<C::Handle>, CoreError> {
        if !self.is_active() {
            return Err(CoreError::Inactive);
        }
        self.bind(credentials);

        self.cache
            .device()
            .get(|| async {
                debug!(endpoint = self.connector.endpoint(), key_id = credentials.id(), "connecting");
                match bounded(self.connect_timeout, self.connector.connect(credentials)).await {
                    Ok(handle) => {
                        info!(endpoint = self.connector.endpoint(), "device connected");
                        Ok(Arc::new(handle))
                    }
                    Err(e) => {
                        let err = CoreError::connection(self.connector.endpoint(), &e);
                        warn!(error = %err, transient = e.is_transient(), "device connect failed");
                        Err(err)
                    }
                }
            })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use secrecy::SecretString;

    use super::*;
    use crate::cache::EntryStatus;

    #[derive(Debug)]
    struct FakeHandle(u32);

    impl crate::device::DeviceHandle for FakeHandle {
        async fn position(&self) -> Result<u32, thermo_api::Error> {
            Ok(95)
        }

        async fn move_to(&self, _angle_deg: u32) -> Result<(), thermo_api::Error> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingConnector {
        calls: AtomicU32,
        fail: bool,
        delay: Option<Duration>,
    }

    impl DeviceConnector for CountingConnector {
        type Handle = FakeHandle;

        fn endpoint(&self) -> &str {
            "https://robot.test"
        }

        async fn connect(&self, _credentials: &CredentialPair) -> Result<FakeHandle, thermo_api::Error> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                Err(thermo_api::Error::Api {
                    message: "unreachable".into(),
                    status: 502,
                })
            } else {
                Ok(FakeHandle(n))
            }
        }
    }

    fn pair(key: &str) -> CredentialPair {
        CredentialPair::new(SecretString::from(key.to_string()), "key-id").unwrap()
    }

    fn session(connector: CountingConnector) -> DeviceSession<CountingConnector> {
        DeviceSession::new(connector, Arc::new(QueryCache::new()), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn refuses_to_connect_before_activation() {
        let session = session(CountingConnector::default());
        let result = session.connect(&pair("k")).await;
        assert!(matches!(result, Err(CoreError::Inactive)));
        assert_eq!(session.connector.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn connects_once_per_credential_pair() {
        let session = session(CountingConnector::default());
        session.activate();

        let first = session.connect(&pair("k")).await.unwrap();
        let second = session.connect(&pair("k")).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(session.connector.calls.load(Ordering::SeqCst), 1);

        let third = session.connect(&pair("other")).await.unwrap();
        assert_eq!(third.0, 1);
        assert_eq!(session.connector.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_connects_are_deduplicated() {
        let session = Arc::new(session(CountingConnector {
            delay: Some(Duration::from_millis(20)),
            ..CountingConnector::default()
        }));
        session.activate();

        let creds = pair("k");
        let (a, b) = tokio::join!(session.connect(&creds), session.connect(&creds));
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(session.connector.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_is_recorded_and_not_retried() {
        let session = session(CountingConnector {
            fail: true,
            ..CountingConnector::default()
        });
        session.activate();

        let err = session.connect(&pair("k")).await.unwrap_err();
        assert!(matches!(err, CoreError::ConnectionFailed { .. }));
        assert_eq!(session.entry().status, EntryStatus::Error);
        assert!(session.handle().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_connect_times_out_as_connection_failure() {
        let session = DeviceSession::new(
            CountingConnector {
                delay: Some(Duration::from_secs(120)),
                ..CountingConnector::default()
            },
            Arc::new(QueryCache::new()),
            Duration::from_secs(5),
        );
        session.activate();

        let err = session.connect(&pair("k")).await.unwrap_err();
        match err {
            CoreError::ConnectionFailed { reason, .. } => assert!(reason.contains("5s")),
            other => panic!("expected ConnectionFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unbinding_discards_a_connect_in_flight() {
        let session = Arc::new(session(CountingConnector {
            delay: Some(Duration::from_millis(50)),
            ..CountingConnector::default()
        }));
        session.activate();

        let task = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.connect(&pair("k")).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(session.unbind());

        assert!(matches!(task.await.unwrap(), Err(CoreError::Superseded)));
        assert_eq!(session.entry().status, EntryStatus::Idle);
        assert!(session.handle().is_none());
    }
}
