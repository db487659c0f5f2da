// ── Control surface ──
//
// Composition root tying the credential store, device session, position
// cache and mutation controller together, plus the render state machine.
//
// State precedence, first match wins:
//   1. no stored credentials            → NoCredentials
//   2. session not activated            → Idle
//   3. device entry failed              → DeviceError
//   4. position entry failed            → PositionError
//   5. position entry holds a value     → Ready
//   6. otherwise                        → Connecting
//
// The credential store is re-read on every evaluation. Clearing it, or
// replacing the pair, drops the session and both cache entries.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{EntryStatus, QueryCache};
use crate::config::DialConfig;
use crate::credentials::{CredentialPair, CredentialStore};
use crate::device::DeviceConnector;
use crate::error::CoreError;
use crate::model::{Intent, Position};
use crate::mutation::{MutationController, MutationOutcome};
use crate::position::PositionCache;
use crate::session::DeviceSession;
use crate::stream::{EntryStream, SurfaceChanges};
use crate::units::DisplayValues;

/// What a renderer should show.
#[derive(Debug, Clone, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SurfaceState {
    /// No credential pair stored. Prompt for one.
    NoCredentials,
    /// Credentials present but the session has not been activated.
    Idle,
    /// Connecting or reading the first position.
    Connecting,
    /// No device handle could be obtained.
    DeviceError { error: CoreError },
    /// Handle obtained, position unreadable.
    PositionError { error: CoreError },
    /// Position known. `refreshing` is set while a refetch is due or in flight.
    Ready {
        position: Position,
        display: DisplayValues,
        refreshing: bool,
    },
}

impl SurfaceState {
    pub fn label(&self) -> &'static str {
        self.into()
    }

    pub fn error(&self) -> Option<&CoreError> {
        match self {
            Self::DeviceError { error } | Self::PositionError { error } => Some(error),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

pub struct ControlSurface<C: DeviceConnector, S: CredentialStore> {
    store: S,
    cache: Arc<QueryCache<C::Handle>>,
    session: Arc<DeviceSession<C>>,
    positions: Arc<PositionCache<C::Handle>>,
    mutations: MutationController<C>,
}

impl<C: DeviceConnector, S: CredentialStore> ControlSurface<C, S> {
    pub fn new(connector: C, store: S, config: &DialConfig) -> Self {
        let cache = Arc::new(QueryCache::new());
        let session = Arc::new(DeviceSession::new(
            connector,
            Arc::clone(&cache),
            config.connect_timeout,
        ));
        let positions = Arc::new(PositionCache::new(
            Arc::clone(&cache),
            config.request_timeout,
        ));
        let mutations = MutationController::new(
            Arc::clone(&session),
            Arc::clone(&positions),
            config.request_timeout,
        );
        Self {
            store,
            cache,
            session,
            positions,
            mutations,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session(&self) -> &DeviceSession<C> {
        &self.session
    }

    pub fn positions(&self) -> &PositionCache<C::Handle> {
        &self.positions
    }

    pub fn cache(&self) -> &QueryCache<C::Handle> {
        &self.cache
    }

    // ── State evaluation ─────────────────────────────────────────────

    /// Current render state. Never contacts the device, but does read the
    /// credential store, which may be backed by the system keyring.
    pub fn state(&self) -> SurfaceState {
        if self.reconcile().is_none() {
            return SurfaceState::NoCredentials;
        }
        if !self.session.is_active() {
            return SurfaceState::Idle;
        }

        let device = self.cache.device().entry();
        if let (EntryStatus::Error, Some(error)) = (device.status, device.error) {
            return SurfaceState::DeviceError { error };
        }

        let position = self.cache.position().entry();
        if let (EntryStatus::Error, Some(error)) = (position.status, position.error) {
            return SurfaceState::PositionError { error };
        }
        if let (EntryStatus::Ready, Some(p)) = (position.status, position.value) {
            return SurfaceState::Ready {
                position: p,
                display: DisplayValues::of(p),
                refreshing: position.fetching || position.stale,
            };
        }
        SurfaceState::Connecting
    }

    /// Read the store and bring the session in line with it.
    fn reconcile(&self) -> Option<CredentialPair> {
        let credentials = match self.store.get() {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(error = %e, "credential store unreadable, treating as empty");
                None
            }
        };
        match &credentials {
            Some(pair) => {
                self.session.bind(pair);
            }
            None => {
                self.session.unbind();
            }
        }
        credentials
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Signal that the host is ready: activate the session and sync.
    pub async fn environment_ready(&self) -> SurfaceState {
        self.session.activate();
        self.sync().await
    }

    /// Fetch whatever is missing or stale. Failed entries are not retried;
    /// use [`retry`](Self::retry) for that.
    pub async fn sync(&self) -> SurfaceState {
        let Some(credentials) = self.reconcile() else {
            return SurfaceState::NoCredentials;
        };
        if !self.session.is_active() {
            return SurfaceState::Idle;
        }

        if self.cache.device().status() != EntryStatus::Error {
            if let Err(e) = self.session.connect(&credentials).await {
                debug!(error = %e, "sync stopped at connect");
                return self.state();
            }
        }

        let position = self.cache.position().entry();
        if position.status != EntryStatus::Error && !position.is_fresh() {
            if let Some(Err(e)) = self.positions.read().await {
                debug!(error = %e, "sync stopped at position read");
            }
        }
        self.state()
    }

    /// Clear failed entries and sync again.
    pub async fn retry(&self) -> SurfaceState {
        if self.cache.clear_errors() {
            debug!("retrying after error");
        }
        self.sync().await
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Move to `requested` (clamped), then refetch the position.
    pub async fn set_position(&self, requested: i64) -> Result<MutationOutcome, CoreError> {
        let outcome = self.mutations.set_position(requested).await?;
        if matches!(outcome, MutationOutcome::Applied { .. }) {
            self.sync().await;
        }
        Ok(outcome)
    }

    /// Apply a warmer/cooler intent. Only valid while `Ready`.
    pub async fn dispatch(&self, intent: Intent) -> Result<MutationOutcome, CoreError> {
        let state = self.state();
        let SurfaceState::Ready { position, .. } = state else {
            return Err(CoreError::NotReady {
                state: state.label(),
            });
        };
        debug!(%intent, from = %position, "dispatching intent");
        self.set_position(intent.request_from(position)).await
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Notified whenever either cache entry changes.
    pub fn subscribe(&self) -> SurfaceChanges<C::Handle> {
        SurfaceChanges::new(self.cache.device().subscribe(), self.cache.position().subscribe())
    }

    /// Follow the position entry alone.
    pub fn position_stream(&self) -> EntryStream<Position> {
        EntryStream::new(self.cache.position().subscribe())
    }

    /// Stop background work.
    pub async fn shutdown(&self) {
        self.mutations.shutdown().await;
    }
}
