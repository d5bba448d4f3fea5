//! Console device registry: the CLI's stand-in for a home-automation host.
//!
//! Every capability write, availability change and flow trigger the engine
//! pushes out is printed as one line (text or JSON).

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::debug;

use tagwatch_core::{Capability, CapabilityValue, CoreError, DeviceKind, DeviceRegistry, FlowEvent};

use crate::cli::OutputFormat;
use crate::output;

/// One line of `tagwatch run` output.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryEvent {
    pub at: DateTime<Local>,
    pub kind: DeviceKind,
    pub device: String,
    #[serde(flatten)]
    pub change: Change,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Change {
    Capability {
        capability: Capability,
        value: CapabilityValue,
    },
    Unavailable {
        reason: String,
    },
    Available,
    Flow {
        flow: FlowEvent,
    },
}

pub struct ConsoleRegistry {
    format: OutputFormat,
    color: bool,
    quiet: bool,
}

impl ConsoleRegistry {
    pub fn new(format: OutputFormat, color: bool, quiet: bool) -> Self {
        Self {
            format,
            color,
            quiet,
        }
    }

    fn emit(&self, kind: DeviceKind, device: &str, change: Change) {
        let event = RegistryEvent {
            at: Local::now(),
            kind,
            device: device.to_owned(),
            change,
        };
        debug!(?event, "registry event");
        let line = output::render_event(&self.format, &event, self.color);
        output::print_output(&line, self.quiet);
    }
}

#[async_trait]
impl DeviceRegistry for ConsoleRegistry {
    async fn set_capability(
        &self,
        kind: DeviceKind,
        device_id: &str,
        capability: Capability,
        value: CapabilityValue,
    ) -> Result<(), CoreError> {
        self.emit(kind, device_id, Change::Capability { capability, value });
        Ok(())
    }

    async fn set_unavailable(
        &self,
        kind: DeviceKind,
        device_id: &str,
        reason: &str,
    ) -> Result<(), CoreError> {
        self.emit(
            kind,
            device_id,
            Change::Unavailable {
                reason: reason.to_owned(),
            },
        );
        Ok(())
    }

    async fn set_available(&self, kind: DeviceKind, device_id: &str) -> Result<(), CoreError> {
        self.emit(kind, device_id, Change::Available);
        Ok(())
    }

    async fn trigger_flow(
        &self,
        kind: DeviceKind,
        device_id: &str,
        event: FlowEvent,
    ) -> Result<(), CoreError> {
        self.emit(kind, device_id, Change::Flow { flow: event });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_events_are_tagged() {
        let event = RegistryEvent {
            at: Local::now(),
            kind: DeviceKind::Phone,
            device: "p1".into(),
            change: Change::Flow {
                flow: FlowEvent::Disconnected,
            },
        };
        let value = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(value["event"], "flow");
        assert_eq!(value["flow"], "disconnected");
        assert_eq!(value["kind"], "phone");
    }
}
