use strum::IntoEnumIterator;

/// Closed set of cached queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum CacheKey {
    /// The connected device handle.
    #[strum(serialize = "device")]
    Device,
    /// The servo position read through the device handle.
    #[strum(serialize = "device:position")]
    Position,
}

impl CacheKey {
    /// The entry that must be `Ready` before this one may fetch.
    pub const fn dependency(self) -> Option<Self> {
        match self {
            Self::Device => None,
            Self::Position => Some(Self::Device),
        }
    }

    /// Entries that depend directly on this one.
    pub fn dependents(self) -> impl Iterator<Item = Self> {
        Self::iter().filter(move |key| key.dependency() == Some(self))
    }
}
