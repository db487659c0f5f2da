use chrono::{DateTime, Utc};

use crate::error::CoreError;

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum EntryStatus {
    /// Never fetched, or reset by a credential change.
    Idle,
    /// Eligible and waiting for (or performing) its first fetch.
    Pending,
    /// Holds a value.
    Ready,
    /// The last fetch failed. Stays put until explicitly retried.
    Error,
}

/// Snapshot of one cached query.
///
/// `fetching` and `stale` are orthogonal to `status`: a `Ready` entry may be
/// stale (invalidated) and may have a refetch in flight while the previous
/// value is still served.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub status: EntryStatus,
    pub value: Option<T>,
    pub error: Option<CoreError>,
    pub fetching: bool,
    pub stale: bool,
    pub updated_at: Option<DateTime<Utc>>,
    pub(crate) epoch: u64,
    pub(crate) revision: u64,
}

impl<T> CacheEntry<T> {
    pub(crate) fn idle(epoch: u64) -> Self {
        Self {
            status: EntryStatus::Idle,
            value: None,
            error: None,
            fetching: false,
            stale: false,
            updated_at: None,
            epoch,
            revision: 0,
        }
    }

    /// Ready and not invalidated since the value was stored.
    pub fn is_fresh(&self) -> bool {
        self.status == EntryStatus::Ready && !self.stale
    }

    /// Context generation this entry belongs to.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}
