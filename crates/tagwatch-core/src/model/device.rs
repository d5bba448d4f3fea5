// ── Tracked device types ──

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// The two device families the account exposes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceKind {
    /// Bluetooth tracking tag, keyed by MAC.
    Tag,
    /// Phone reporting battery telemetry only.
    Phone,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 2] = [DeviceKind::Tag, DeviceKind::Phone];
}

/// Last-known capability state for one device registered by the host.
///
/// `None` means "never observed": the first snapshot always writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedDevice {
    pub external_id: String,
    pub kind: DeviceKind,
    pub last_connected: Option<bool>,
    pub last_battery_low: Option<bool>,
    pub last_battery_level: Option<i64>,
}

impl TrackedDevice {
    pub fn new(kind: DeviceKind, external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            kind,
            last_connected: None,
            last_battery_low: None,
            last_battery_level: None,
        }
    }
}

/// A device offered to the user during pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairingCandidate {
    pub id: String,
    pub name: String,
    pub kind: DeviceKind,
}
