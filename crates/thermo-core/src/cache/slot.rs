use std::future::Future;

use tokio::sync::watch;
use tracing::{debug, trace};

use super::entry::{CacheEntry, EntryStatus};
use super::key::CacheKey;
use crate::error::CoreError;

/// Upper bound on back-to-back refetches when invalidations keep landing
/// while a fetch is in flight.
const MAX_FETCH_ROUNDS: u32 = 3;

enum Claim {
    /// This caller performs the fetch.
    Owner { epoch: u64, revision: u64 },
    /// Another caller is fetching; wait for its result.
    Follower { epoch: u64 },
}

/// One cached query, published through a `watch` channel.
///
/// At most one fetch is in flight per slot: concurrent callers attach to
/// the running fetch instead of starting their own. Results that resolve
/// after a [`reset`](Self::reset) belong to a superseded context and are
/// dropped without touching the entry.
pub struct QuerySlot<T> {
    key: CacheKey,
    tx: watch::Sender<CacheEntry<T>>,
}

impl<T: Clone + Send + Sync + 'static> QuerySlot<T> {
    pub fn new(key: CacheKey) -> Self {
        let (tx, _) = watch::channel(CacheEntry::idle(0));
        Self { key, tx }
    }

    pub fn entry(&self) -> CacheEntry<T> {
        self.tx.borrow().clone()
    }

    pub fn status(&self) -> EntryStatus {
        self.tx.borrow().status
    }

    pub fn value(&self) -> Option<T> {
        self.tx.borrow().value.clone()
    }

    pub fn epoch(&self) -> u64 {
        self.tx.borrow().epoch
    }

    pub fn subscribe(&self) -> watch::Receiver<CacheEntry<T>> {
        self.tx.subscribe()
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Idle → Pending. The entry is wanted but cannot fetch yet.
    pub fn mark_pending(&self) -> bool {
        self.tx.send_if_modified(|entry| {
            if entry.status == EntryStatus::Idle {
                entry.status = EntryStatus::Pending;
                true
            } else {
                false
            }
        })
    }

    /// Mark the stored value stale so the next [`get`](Self::get) refetches.
    ///
    /// Also bumps the revision, so a fetch already in flight is followed by
    /// one more. Failed entries are left alone: they only leave `Error`
    /// through [`clear_error`](Self::clear_error).
    pub fn invalidate(&self) -> bool {
        self.tx.send_if_modified(|entry| {
            entry.revision = entry.revision.wrapping_add(1);
            if entry.status == EntryStatus::Ready && !entry.stale {
                entry.stale = true;
                true
            } else {
                false
            }
        })
    }

    /// Drop everything and start a new context generation.
    pub fn reset(&self) {
        self.tx.send_modify(|entry| {
            let epoch = entry.epoch.wrapping_add(1);
            *entry = CacheEntry::idle(epoch);
        });
        debug!(key = %self.key, epoch = self.epoch(), "cache entry reset");
    }

    /// Leave `Error` so the entry becomes fetchable again.
    pub fn clear_error(&self) -> bool {
        self.tx.send_if_modified(|entry| {
            if entry.status != EntryStatus::Error {
                return false;
            }
            entry.error = None;
            if entry.value.is_some() {
                entry.status = EntryStatus::Ready;
                entry.stale = true;
            } else {
                entry.status = EntryStatus::Idle;
            }
            true
        })
    }

    // ── Fetching ─────────────────────────────────────────────────────

    /// Serve a fresh value, fetching when absent or stale.
    ///
    /// An invalidation that lands while the fetch is in flight triggers one
    /// further fetch before returning.
    pub async fn get<F, Fut>(&self, fetcher: F) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut rounds = 0;
        loop {
            {
                let entry = self.tx.borrow();
                if entry.is_fresh() {
                    if let Some(value) = &entry.value {
                        return Ok(value.clone());
                    }
                }
            }

            let value = self.fetch(&fetcher).await?;
            rounds += 1;
            if rounds >= MAX_FETCH_ROUNDS || self.tx.borrow().is_fresh() {
                return Ok(value);
            }
            debug!(key = %self.key, "invalidated during fetch, fetching again");
        }
    }

    /// Run `fetcher` unless a fetch is already in flight, in which case its
    /// outcome is shared.
    pub async fn fetch<F, Fut>(&self, fetcher: F) -> Result<T, CoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut fetcher = Some(fetcher);
        loop {
            match self.claim() {
                Claim::Owner { epoch, revision } => {
                    let Some(fetcher) = fetcher.take() else {
                        return Err(CoreError::Internal(format!(
                            "{} fetch claimed twice",
                            self.key
                        )));
                    };
                    let mut guard = FetchGuard {
                        slot: self,
                        epoch,
                        armed: true,
                    };
                    trace!(key = %self.key, epoch, "fetch started");
                    let result = fetcher().await;
                    guard.armed = false;
                    return self.settle(epoch, revision, result);
                }
                Claim::Follower { epoch } => {
                    if let Some(result) = self.settled(epoch).await {
                        return result;
                    }
                    // Owner was dropped before settling; try to take over.
                }
            }
        }
    }

    fn claim(&self) -> Claim {
        let mut claim = Claim::Follower { epoch: 0 };
        self.tx.send_if_modified(|entry| {
            if entry.fetching {
                claim = Claim::Follower { epoch: entry.epoch };
                return false;
            }
            entry.fetching = true;
            if entry.status != EntryStatus::Ready {
                entry.status = EntryStatus::Pending;
                entry.error = None;
            }
            claim = Claim::Owner {
                epoch: entry.epoch,
                revision: entry.revision,
            };
            true
        });
        claim
    }

    fn settle(&self, epoch: u64, revision: u64, result: Result<T, CoreError>) -> Result<T, CoreError> {
        let mut applied = false;
        self.tx.send_if_modified(|entry| {
            if entry.epoch != epoch {
                return false;
            }
            applied = true;
            entry.fetching = false;
            match &result {
                Ok(value) => {
                    entry.status = EntryStatus::Ready;
                    entry.value = Some(value.clone());
                    entry.error = None;
                    entry.stale = entry.revision != revision;
                    entry.updated_at = Some(chrono::Utc::now());
                }
                Err(err) => {
                    entry.status = EntryStatus::Error;
                    entry.error = Some(err.clone());
                    entry.stale = false;
                }
            }
            true
        });

        if applied {
            result
        } else {
            debug!(key = %self.key, epoch, "discarding result from superseded context");
            Err(CoreError::Superseded)
        }
    }

    /// Wait for the in-flight fetch of generation `epoch`. `None` means the
    /// owner gave up without a result.
    async fn settled(&self, epoch: u64) -> Option<Result<T, CoreError>> {
        let mut rx = self.tx.subscribe();
        let entry = match rx.wait_for(|e| e.epoch != epoch || !e.fetching).await {
            Ok(entry) => entry.clone(),
            Err(_) => {
                return Some(Err(CoreError::Internal(format!(
                    "{} cache closed",
                    self.key
                ))));
            }
        };

        if entry.epoch != epoch {
            return Some(Err(CoreError::Superseded));
        }
        match (entry.status, entry.value, entry.error) {
            (EntryStatus::Error, _, Some(err)) => Some(Err(err)),
            (EntryStatus::Ready, Some(value), _) => Some(Ok(value)),
            _ => None,
        }
    }
}

/// Clears the `fetching` flag if the owning future is dropped mid-fetch.
struct FetchGuard<'a, T> {
    slot: &'a QuerySlot<T>,
    epoch: u64,
    armed: bool,
}

impl<T> Drop for FetchGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let epoch = self.epoch;
        self.slot.tx.send_if_modified(|entry| {
            if entry.epoch != epoch || !entry.fetching {
                return false;
            }
            entry.fetching = false;
            true
        });
    }
}
