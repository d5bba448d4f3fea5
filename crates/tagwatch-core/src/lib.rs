//! Polling engine between `tagwatch-api` and a host device registry.
//!
//! - **[`Engine`]**: facade owning the shared session, device cache and
//!   poll gate. [`on_init()`](Engine::on_init) restores the persisted
//!   session and spawns the poll task, which also wakes at the cooldown
//!   deadline; pairing ([`login`](Engine::login),
//!   [`list_devices`](Engine::list_devices)) and the ring action are plain
//!   async methods.
//!
//! - **[`Poller`]**: one fetch per tick, a single refresh-and-retry on an
//!   expired session, cooldown on throttling. Cycles never overlap.
//!
//! - **[`Reconciler`]**: diffs each snapshot against [`DeviceStore`] and
//!   pushes only changes (capability writes, connectivity flow events)
//!   into the host's [`DeviceRegistry`].
//!
//! - **[`CooldownGuard`]**: 24 hour polling pause after a rate-limit
//!   response, with every device marked unavailable meanwhile.
//!
//! Persistence is the host's job, behind [`CredentialStore`]; the remote
//! service sits behind [`AccountApi`] so everything above runs against
//! fakes in tests.

pub mod actions;
pub mod api;
pub mod auth;
pub mod config;
pub mod convert;
pub mod cooldown;
pub mod engine;
pub mod error;
pub mod model;
pub mod poller;
pub mod reconcile;
pub mod registry;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

// ── Primary re-exports ──────────────────────────────────────────────
pub use actions::ActionDispatcher;
pub use api::{AccountApi, LoginGrant};
pub use auth::AuthManager;
pub use config::{AccountCredentials, EngineConfig};
pub use cooldown::{CooldownGuard, PollState, UNAVAILABLE_REASON};
pub use engine::Engine;
pub use error::CoreError;
pub use poller::{Poller, TickOutcome};
pub use reconcile::{ReconcileReport, Reconciler};
pub use registry::DeviceRegistry;
pub use session::{CredentialStore, Session, SessionStore};
pub use store::DeviceStore;

pub use model::{
    Capability, CapabilityValue, DeviceKind, FlowEvent, PairingCandidate, PhoneRecord, Snapshot,
    TagRecord, TrackedDevice,
};
