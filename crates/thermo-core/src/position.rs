// ── Position cache ──
//
// Holds the last known servo position. Reads go through the device handle
// held by the device entry; without one the entry just sits in Pending.
// The cached value is only replaced by a fetch, never written optimistically.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheKey, QueryCache};
use crate::device::{DeviceHandle, bounded};
use crate::error::CoreError;
use crate::model::Position;

pub struct PositionCache<H> {
    cache: Arc<QueryCache<H>>,
    request_timeout: Duration,
}

impl<H: DeviceHandle> PositionCache<H> {
    pub fn new(cache: Arc<QueryCache<H>>, request_timeout: Duration) -> Self {
        Self {
            cache,
            request_timeout,
        }
    }

    /// Read the position from the device, bypassing the cache.
    pub async fn fetch_position(&self, handle: &H) -> Result<Position, CoreError> {
        match bounded(self.request_timeout, handle.position()).await {
            Ok(degrees) => {
                let position = Position::from_device(degrees);
                debug!(%position, "position fetched");
                Ok(position)
            }
            Err(e) => {
                let err = CoreError::fetch(&e);
                warn!(error = %err, missing = e.is_not_found(), "position fetch failed");
                Err(err)
            }
        }
    }

    /// Serve the cached position, fetching when absent or invalidated.
    ///
    /// Returns `None` while there is no device handle; the entry is then
    /// marked pending and no fetch is attempted.
    pub async fn read(&self) -> Option<Result<Position, CoreError>> {
        let Some(handle) = self.cache.ready_handle() else {
            self.cache.position().mark_pending();
            return None;
        };
        Some(
            self.cache
                .position()
                .get(|| self.fetch_position(&handle))
                .await,
        )
    }

    /// Mark the position stale. Returns `true` if a value was marked.
    pub fn invalidate(&self) -> bool {
        self.cache.invalidate(CacheKey::Position)
    }

    pub fn entry(&self) -> CacheEntry<Position> {
        self.cache.position().entry()
    }

    /// Last known position, possibly stale.
    pub fn current(&self) -> Option<Position> {
        self.cache.position().value()
    }
}
