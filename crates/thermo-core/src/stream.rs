// ── Reactive entry streams ──
//
// Subscription types for consuming cache changes. Renderers either wait on
// `SurfaceChanges::changed()` and re-evaluate the surface state, or follow
// a single entry through `EntryStream`.

use tokio::sync::watch;

use crate::cache::CacheEntry;
use crate::model::Position;

/// A subscription to one cache entry.
pub struct EntryStream<T: Clone + Send + Sync + 'static> {
    receiver: watch::Receiver<CacheEntry<T>>,
}

impl<T: Clone + Send + Sync + 'static> EntryStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<CacheEntry<T>>) -> Self {
        Self { receiver }
    }

    /// Latest snapshot.
    pub fn latest(&self) -> CacheEntry<T> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. `None` once the cache is gone.
    pub async fn changed(&mut self) -> Option<CacheEntry<T>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

/// Change notification across both cache entries.
///
/// Carries no data: the receiver re-evaluates
/// [`ControlSurface::state`](crate::ControlSurface::state), which also picks
/// up credential changes.
pub struct SurfaceChanges<H: Send + Sync + 'static> {
    device: watch::Receiver<CacheEntry<std::sync::Arc<H>>>,
    position: watch::Receiver<CacheEntry<Position>>,
}

impl<H: Send + Sync + 'static> SurfaceChanges<H> {
    pub(crate) fn new(
        device: watch::Receiver<CacheEntry<std::sync::Arc<H>>>,
        position: watch::Receiver<CacheEntry<Position>>,
    ) -> Self {
        Self { device, position }
    }

    /// Wait until either entry changes. Returns `false` once the cache is gone.
    pub async fn changed(&mut self) -> bool {
        let result = tokio::select! {
            r = self.device.changed() => r,
            r = self.position.changed() => r,
        };
        self.device.mark_unchanged();
        self.position.mark_unchanged();
        result.is_ok()
    }
}
