// ── Domain model ──
//
// Canonical types shared by the poller, reconciler and host adapters.

pub mod capability;
pub mod device;
pub mod snapshot;

pub use capability::{Capability, CapabilityValue, FlowEvent};
pub use device::{DeviceKind, PairingCandidate, TrackedDevice};
pub use snapshot::{PhoneRecord, Snapshot, TagRecord};
