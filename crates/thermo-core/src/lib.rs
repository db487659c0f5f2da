//! State synchronization between the thermo dial servo and its control surfaces.
//!
//! This crate owns the device-facing logic of the workspace:
//!
//! - **[`DeviceSession`]**: Lazily connects to the robot once the session
//!   has been [activated](DeviceSession::activate), exactly once per
//!   credential pair. Credential changes bump the session epoch so late
//!   resolutions from an older pair are discarded.
//!
//! - **[`QueryCache`]**: Typed cache with a closed key set
//!   ([`CacheKey::Device`], [`CacheKey::Position`]) and an explicit
//!   dependency between them. Each slot de-duplicates in-flight fetches and
//!   publishes its [`CacheEntry`] through a `tokio::sync::watch` channel.
//!
//! - **[`PositionCache`]**: Last known servo [`Position`], refetched only
//!   after invalidation.
//!
//! - **[`MutationController`]**: Clamps and submits moves through a
//!   single-slot queue drained by one worker task, then invalidates the
//!   position entry so the device stays the source of truth.
//!
//! - **[`ControlSurface`]**: Composition root and render state machine
//!   ([`SurfaceState`]) consumed by the CLI.
//!
//! - **[`units`]**: Calibrated conversion from servo position to dial
//!   rotation and temperature.

pub mod cache;
pub mod config;
pub mod credentials;
pub mod device;
pub mod error;
pub mod model;
pub mod mutation;
pub mod position;
pub mod session;
pub mod stream;
pub mod surface;
pub mod units;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{CacheEntry, CacheKey, EntryStatus, QueryCache, QuerySlot};
pub use config::{DialConfig, TlsVerification};
pub use credentials::{CREDENTIAL_SLOT, CredentialPair, CredentialStore, MemoryCredentialStore};
pub use device::{DeviceConnector, DeviceHandle, RobotConnector};
pub use error::{CoreError, ErrorKind};
pub use model::{Intent, Position};
pub use mutation::{MutationController, MutationOutcome};
pub use position::PositionCache;
pub use session::{DeviceSession, SessionPhase};
pub use stream::{EntryStream, SurfaceChanges};
pub use surface::{ControlSurface, SurfaceState};
pub use units::DisplayValues;
