// ── Query cache ──
//
// Typed replacement for a string-keyed async cache. The key set is closed
// (`CacheKey`), each key has one value type, and the dependency between
// the device handle and the position is declared on the key itself.

mod entry;
mod key;
mod slot;

use std::sync::Arc;

pub use entry::{CacheEntry, EntryStatus};
pub use key::CacheKey;
pub use slot::QuerySlot;

use crate::model::Position;

/// The two cached queries behind the control surface.
pub struct QueryCache<H> {
    device: QuerySlot<Arc<H>>,
    position: QuerySlot<Position>,
}

impl<H: Send + Sync + 'static> QueryCache<H> {
    pub fn new() -> Self {
        Self {
            device: QuerySlot::new(CacheKey::Device),
            position: QuerySlot::new(CacheKey::Position),
        }
    }

    pub fn device(&self) -> &QuerySlot<Arc<H>> {
        &self.device
    }

    pub fn position(&self) -> &QuerySlot<Position> {
        &self.position
    }

    pub fn status(&self, key: CacheKey) -> EntryStatus {
        match key {
            CacheKey::Device => self.device.status(),
            CacheKey::Position => self.position.status(),
        }
    }

    /// Whether `key`'s dependency (if any) is `Ready`.
    pub fn is_eligible(&self, key: CacheKey) -> bool {
        key.dependency()
            .is_none_or(|dep| self.status(dep) == EntryStatus::Ready)
    }

    /// The device handle, if the device entry holds one.
    pub fn ready_handle(&self) -> Option<Arc<H>> {
        let entry = self.device.entry();
        match entry.status {
            EntryStatus::Ready => entry.value,
            _ => None,
        }
    }

    /// Invalidate `key` and everything that depends on it.
    pub fn invalidate(&self, key: CacheKey) -> bool {
        let marked = match key {
            CacheKey::Device => self.device.invalidate(),
            CacheKey::Position => self.position.invalidate(),
        };
        key.dependents()
            .fold(marked, |acc, dependent| self.invalidate(dependent) || acc)
    }

    /// Reset `key` and everything that depends on it.
    pub fn reset(&self, key: CacheKey) {
        match key {
            CacheKey::Device => self.device.reset(),
            CacheKey::Position => self.position.reset(),
        }
        for dependent in key.dependents() {
            self.reset(dependent);
        }
    }

    /// Move every failed entry back to a fetchable state.
    pub fn clear_errors(&self) -> bool {
        let device = self.device.clear_error();
        let position = self.position.clear_error();
        device || position
    }
}

impl<H: Send + Sync + 'static> Default for QueryCache<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct Handle;

    #[tokio::test]
    async fn position_is_ineligible_until_device_ready() {
        let cache: QueryCache<Handle> = QueryCache::new();
        assert!(cache.is_eligible(CacheKey::Device));
        assert!(!cache.is_eligible(CacheKey::Position));

        cache.device().get(|| async { Ok(Arc::new(Handle)) }).await.unwrap();
        assert!(cache.is_eligible(CacheKey::Position));
        assert!(cache.ready_handle().is_some());
    }

    #[tokio::test]
    async fn device_reset_cascades_to_position() {
        let cache: QueryCache<Handle> = QueryCache::new();
        cache.device().get(|| async { Ok(Arc::new(Handle)) }).await.unwrap();
        cache
            .position()
            .get(|| async { Ok(Position::from_device(95)) })
            .await
            .unwrap();

        cache.reset(CacheKey::Device);

        assert_eq!(cache.status(CacheKey::Device), EntryStatus::Idle);
        assert_eq!(cache.status(CacheKey::Position), EntryStatus::Idle);
        assert_eq!(cache.position().value(), None);
        assert_eq!(cache.position().epoch(), 1);
    }

    #[tokio::test]
    async fn position_invalidation_leaves_device_alone() {
        let cache: QueryCache<Handle> = QueryCache::new();
        cache.device().get(|| async { Ok(Arc::new(Handle)) }).await.unwrap();
        cache
            .position()
            .get(|| async { Ok(Position::from_device(95)) })
            .await
            .unwrap();

        assert!(cache.invalidate(CacheKey::Position));
        assert!(cache.device().entry().is_fresh());
        assert!(cache.position().entry().stale);
    }
}
