// ── Host device registry (outbound sink) ──
//
// The host owns device objects, their capabilities and its automation
// triggers. The engine only pushes updates into it through this trait.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::{Capability, CapabilityValue, DeviceKind, FlowEvent};

/// Sink for capability writes, availability changes and flow triggers.
///
/// Every method addresses a device by kind + external id (tag MAC or
/// phone id), the same key the host registered it under.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    async fn set_capability(
        &self,
        kind: DeviceKind,
        device_id: &str,
        capability: Capability,
        value: CapabilityValue,
    ) -> Result<(), CoreError>;

    async fn set_unavailable(
        &self,
        kind: DeviceKind,
        device_id: &str,
        reason: &str,
    ) -> Result<(), CoreError>;

    async fn set_available(&self, kind: DeviceKind, device_id: &str) -> Result<(), CoreError>;

    async fn trigger_flow(
        &self,
        kind: DeviceKind,
        device_id: &str,
        event: FlowEvent,
    ) -> Result<(), CoreError>;
}
