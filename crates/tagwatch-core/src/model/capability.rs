// ── Capability and flow-event vocabulary ──

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// A host-visible capability on a tracked device.
///
/// The string forms are the capability ids the host registry knows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    /// `true` while a tag is out of Bluetooth range.
    AlarmDisconnected,
    /// `true` while a tag reports a low or empty battery.
    AlarmBattery,
    /// Phone battery percentage.
    BatteryLevel,
    /// Momentary toggle that rings a phone.
    Ring,
}

/// Value written to a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapabilityValue {
    Bool(bool),
    Number(i64),
}

impl From<bool> for CapabilityValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for CapabilityValue {
    fn from(v: i64) -> Self {
        Self::Number(v)
    }
}

impl fmt::Display for CapabilityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Named automation trigger fired on a connectivity transition.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlowEvent {
    Connected,
    Disconnected,
}

impl FlowEvent {
    /// The event matching a new connectivity state.
    pub fn for_connectivity(connected: bool) -> Self {
        if connected {
            Self::Connected
        } else {
            Self::Disconnected
        }
    }
}
