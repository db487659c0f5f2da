// ── Mutation controller ──
//
// Position changes go through a single-slot mailbox drained by one worker
// task. Only one move is in flight at a time; a request submitted while
// another is waiting replaces it (last submitted wins) and the replaced
// caller is told so. After a successful move the position entry is
// invalidated, which is how the surface learns the new position: there
// is no optimistic write.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::device::{DeviceConnector, DeviceHandle, bounded};
use crate::error::CoreError;
use crate::model::Position;
use crate::position::PositionCache;
use crate::session::DeviceSession;

/// Result of a submitted position change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The device accepted the move. `submitted` is the clamped position.
    Applied { requested: i64, submitted: Position },
    /// A newer request replaced this one before it was sent.
    Superseded { requested: i64 },
}

struct MutationRequest {
    requested: i64,
    target: Position,
    epoch: u64,
    respond: oneshot::Sender<Result<MutationOutcome, CoreError>>,
}

struct Shared<C: DeviceConnector> {
    session: Arc<DeviceSession<C>>,
    positions: Arc<PositionCache<C::Handle>>,
    pending: Mutex<Option<MutationRequest>>,
    wake: Notify,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    request_timeout: Duration,
}

/// Submits clamped position changes to the device.
pub struct MutationController<C: DeviceConnector> {
    shared: Arc<Shared<C>>,
}

impl<C: DeviceConnector> Clone for MutationController<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: DeviceConnector> MutationController<C> {
    pub fn new(
        session: Arc<DeviceSession<C>>,
        positions: Arc<PositionCache<C::Handle>>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                session,
                positions,
                pending: Mutex::new(None),
                wake: Notify::new(),
                cancel: CancellationToken::new(),
                worker: Mutex::new(None),
                request_timeout,
            }),
        }
    }

    /// Clamp `requested` into range and move the servo there.
    ///
    /// Resolves once the device has accepted the move (and the position
    /// entry has been invalidated), or when a newer request supersedes
    /// this one. On failure the cached position is left untouched.
    pub async fn set_position(&self, requested: i64) -> Result<MutationOutcome, CoreError> {
        let target = Position::clamped(requested);
        if i64::from(target.degrees()) != requested {
            debug!(requested, %target, "clamped position request");
        }
        if self.shared.cancel.is_cancelled() {
            return Err(shut_down(target));
        }

        let outcome = self.submit(requested, target).await;
        outcome.await.map_err(|_| CoreError::Internal("mutation worker stopped".into()))?
    }

    /// Stop the worker. Requests still waiting are failed.
    pub async fn shutdown(&self) {
        self.shared.cancel.cancel();
        let worker = self.shared.worker.lock().await.take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }

    /// Put a request in the mailbox, replacing any request still waiting.
    async fn submit(
        &self,
        requested: i64,
        target: Position,
    ) -> oneshot::Receiver<Result<MutationOutcome, CoreError>> {
        self.ensure_worker().await;

        let (respond, outcome) = oneshot::channel();
        let request = MutationRequest {
            requested,
            target,
            epoch: self.shared.session.epoch(),
            respond,
        };
        let replaced = self.shared.pending.lock().await.replace(request);
        if let Some(previous) = replaced {
            debug!(superseded = previous.requested, requested, "pending move replaced");
            let _ = previous.respond.send(Ok(MutationOutcome::Superseded {
                requested: previous.requested,
            }));
        }
        self.shared.wake.notify_one();

        // A shutdown that landed before the enqueue may have outlived the
        // worker's final drain; nobody else would answer this request.
        if self.shared.cancel.is_cancelled() {
            if let Some(stranded) = self.shared.pending.lock().await.take() {
                let _ = stranded.respond.send(Err(shut_down(stranded.target)));
            }
        }
        outcome
    }

    async fn ensure_worker(&self) {
        let mut worker = self.shared.worker.lock().await;
        if worker.as_ref().is_some_and(|w| !w.is_finished()) {
            return;
        }
        debug!("spawning mutation worker");
        *worker = Some(tokio::spawn(run_worker(Arc::clone(&self.shared))));
    }
}

// ── Worker ──────────────────────────────────────────────────────────

async fn run_worker<C: DeviceConnector>(shared: Arc<Shared<C>>) {
    loop {
        tokio::select! {
            biased;
            () = shared.cancel.cancelled() => break,
            () = shared.wake.notified() => {}
        }

        loop {
            let next = shared.pending.lock().await.take();
            let Some(request) = next else { break };
            let result = apply(&shared, &request).await;
            let _ = request.respond.send(result);
        }
    }

    if let Some(request) = shared.pending.lock().await.take() {
        let _ = request.respond.send(Err(shut_down(request.target)));
    }
    debug!("mutation worker stopped");
}

fn shut_down(position: Position) -> CoreError {
    CoreError::MutationFailed {
        position,
        reason: "controller shut down".into(),
    }
}

async fn apply<C: DeviceConnector>(
    shared: &Shared<C>,
    request: &MutationRequest,
) -> Result<MutationOutcome, CoreError> {
    if shared.session.epoch() != request.epoch {
        return Err(CoreError::Superseded);
    }
    let Some(handle) = shared.session.handle() else {
        return Err(CoreError::MutationFailed {
            position: request.target,
            reason: "device not connected".into(),
        });
    };

    match bounded(shared.request_timeout, handle.move_to(request.target.degrees())).await {
        Ok(()) => {
            if shared.session.epoch() != request.epoch {
                return Err(CoreError::Superseded);
            }
            shared.positions.invalidate();
            info!(position = %request.target, "dial moved");
            Ok(MutationOutcome::Applied {
                requested: request.requested,
                submitted: request.target,
            })
        }
        Err(e) => {
            let err = CoreError::mutation(request.target, &e);
            warn!(error = %err, "move failed, keeping last known position");
            Err(err)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use pretty_assertions::assert_eq;
    use secrecy::SecretString;

    use super::*;
    use crate::cache::QueryCache;
    use crate::credentials::CredentialPair;

    #[derive(Default)]
    struct Servo {
        moves: StdMutex<Vec<u32>>,
        reject: AtomicBool,
        gate: Option<Arc<Notify>>,
    }

    impl DeviceHandle for Servo {
        async fn position(&self) -> Result<u32, thermo_api::Error> {
            Ok(self.moves.lock().unwrap().last().copied().unwrap_or(95))
        }

        async fn move_to(&self, angle_deg: u32) -> Result<(), thermo_api::Error> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.reject.load(Ordering::SeqCst) {
                return Err(thermo_api::Error::Api {
                    message: "servo busy".into(),
                    status: 503,
                });
            }
            self.moves.lock().unwrap().push(angle_deg);
            Ok(())
        }
    }

    struct Connector(Arc<Servo>);

    impl DeviceConnector for Connector {
        type Handle = Servo;

        fn endpoint(&self) -> &str {
            "https://robot.test"
        }

        async fn connect(&self, _credentials: &CredentialPair) -> Result<Servo, thermo_api::Error> {
            Ok(Servo {
                gate: self.0.gate.clone(),
                reject: AtomicBool::new(self.0.reject.load(Ordering::SeqCst)),
                ..Servo::default()
            })
        }
    }

    struct Rig {
        session: Arc<DeviceSession<Connector>>,
        positions: Arc<PositionCache<Servo>>,
        mutations: MutationController<Connector>,
    }

    async fn rig(template: Servo) -> Rig {
        let cache = Arc::new(QueryCache::new());
        let session = Arc::new(DeviceSession::new(
            Connector(Arc::new(template)),
            Arc::clone(&cache),
            Duration::from_secs(5),
        ));
        session.activate();
        let creds = CredentialPair::new(SecretString::from("k".to_string()), "id").unwrap();
        session.connect(&creds).await.unwrap();

        let positions = Arc::new(PositionCache::new(cache, Duration::from_secs(5)));
        positions.read().await.unwrap().unwrap();
        let mutations =
            MutationController::new(Arc::clone(&session), Arc::clone(&positions), Duration::from_secs(5));
        Rig {
            session,
            positions,
            mutations,
        }
    }

    fn moves(rig: &Rig) -> Vec<u32> {
        rig.session.handle().unwrap().moves.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn clamps_and_invalidates_on_success() {
        let rig = rig(Servo::default()).await;

        let outcome = rig.mutations.set_position(190).await.unwrap();
        assert_eq!(
            outcome,
            MutationOutcome::Applied {
                requested: 190,
                submitted: Position::MAX
            }
        );
        assert_eq!(moves(&rig), vec![180]);
        assert!(rig.positions.entry().stale);
        // Value is only replaced by the refetch.
        assert_eq!(rig.positions.current(), Some(Position::from_device(95)));

        assert_eq!(
            rig.positions.read().await.unwrap().unwrap(),
            Position::from_device(180)
        );
    }

    #[tokio::test]
    async fn failure_leaves_cache_untouched() {
        let rig = rig(Servo {
            reject: AtomicBool::new(true),
            ..Servo::default()
        })
        .await;

        let err = rig.mutations.set_position(50).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::MutationFailed { position, .. } if position == Position::from_device(50)
        ));
        let entry = rig.positions.entry();
        assert!(entry.is_fresh());
        assert_eq!(entry.value, Some(Position::from_device(95)));
    }

    #[tokio::test]
    async fn newest_pending_request_wins() {
        let gate = Arc::new(Notify::new());
        let rig = rig(Servo {
            gate: Some(Arc::clone(&gate)),
            ..Servo::default()
        })
        .await;

        let first = {
            let m = rig.mutations.clone();
            tokio::spawn(async move { m.set_position(100).await })
        };
        // Let the worker pick up the first request and block on the gate.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = {
            let m = rig.mutations.clone();
            tokio::spawn(async move { m.set_position(110).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let third = {
            let m = rig.mutations.clone();
            tokio::spawn(async move { m.set_position(120).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        gate.notify_one();
        assert!(matches!(
            first.await.unwrap().unwrap(),
            MutationOutcome::Applied { requested: 100, .. }
        ));
        assert_eq!(
            second.await.unwrap().unwrap(),
            MutationOutcome::Superseded { requested: 110 }
        );

        gate.notify_one();
        assert!(matches!(
            third.await.unwrap().unwrap(),
            MutationOutcome::Applied { requested: 120, .. }
        ));
        assert_eq!(moves(&rig), vec![100, 120]);
    }

    #[tokio::test]
    async fn move_without_a_connection_fails() {
        let rig = rig(Servo::default()).await;
        rig.session.unbind();

        let err = rig.mutations.set_position(100).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::MutationFailed { ref reason, .. } if reason.contains("not connected")
        ));
    }

    #[tokio::test]
    async fn credential_change_discards_moves_from_the_old_epoch() {
        let gate = Arc::new(Notify::new());
        let rig = rig(Servo {
            gate: Some(Arc::clone(&gate)),
            ..Servo::default()
        })
        .await;

        let in_flight = {
            let m = rig.mutations.clone();
            tokio::spawn(async move { m.set_position(100).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let queued = {
            let m = rig.mutations.clone();
            tokio::spawn(async move { m.set_position(120).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Rotate credentials and settle a fresh position under the new epoch.
        assert!(rig.session.unbind());
        let rotated = CredentialPair::new(SecretString::from("k2".to_string()), "id").unwrap();
        rig.session.connect(&rotated).await.unwrap();
        assert_eq!(
            rig.positions.read().await.unwrap().unwrap(),
            Position::from_device(95)
        );

        gate.notify_one();
        assert!(matches!(in_flight.await.unwrap(), Err(CoreError::Superseded)));
        assert!(matches!(queued.await.unwrap(), Err(CoreError::Superseded)));

        // Neither old-epoch move touched the new context.
        assert!(rig.positions.entry().is_fresh());
        assert!(moves(&rig).is_empty());
    }

    #[tokio::test]
    async fn request_racing_shutdown_is_answered() {
        let rig = rig(Servo::default()).await;
        rig.mutations.shared.cancel.cancel();

        let outcome = rig.mutations.submit(100, Position::clamped(100)).await;
        let result = tokio::time::timeout(Duration::from_secs(1), outcome)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(CoreError::MutationFailed { .. })));
    }

    #[tokio::test]
    async fn rejects_after_shutdown() {
        let rig = rig(Servo::default()).await;
        rig.mutations.set_position(100).await.unwrap();
        rig.mutations.shutdown().await;

        let err = rig.mutations.set_position(120).await.unwrap_err();
        assert!(matches!(err, CoreError::MutationFailed { .. }));
    }
}
