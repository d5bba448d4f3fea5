// ── Snapshot reconciler ──
//
// Diffs one account snapshot against the tracked device cache and pushes
// only the changes into the host registry. The cache is updated after the
// registry accepts a write, so a rejected write is retried on the next
// poll instead of being lost.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{
    Capability, CapabilityValue, DeviceKind, FlowEvent, PhoneRecord, Snapshot, TagRecord,
    TrackedDevice,
};
use crate::registry::DeviceRegistry;
use crate::store::DeviceStore;

/// What one reconcile pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Capability values written to the registry.
    pub writes: usize,
    /// Flow events triggered.
    pub flows: usize,
    /// Tag records with no registered device.
    pub skipped: usize,
    /// Registry calls that were rejected.
    pub failed: usize,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.writes == 0 && self.flows == 0
    }
}

pub struct Reconciler {
    devices: Arc<DeviceStore>,
    registry: Arc<dyn DeviceRegistry>,
}

impl Reconciler {
    pub fn new(devices: Arc<DeviceStore>, registry: Arc<dyn DeviceRegistry>) -> Self {
        Self { devices, registry }
    }

    /// Apply a snapshot. Tags are processed before phones.
    ///
    /// Unregistered tags are skipped. An unregistered phone aborts the
    /// pass with [`CoreError::DeviceNotFound`]; records already handled
    /// keep their writes.
    pub async fn reconcile(&self, snapshot: &Snapshot) -> Result<ReconcileReport, CoreError> {
        let mut report = ReconcileReport::default();

        for tag in &snapshot.tags {
            match self.devices.get(DeviceKind::Tag, &tag.id) {
                Some(cached) => self.reconcile_tag(&cached, tag, &mut report).await,
                None => {
                    debug!(device = %tag.id, "tag not paired; skipping");
                    report.skipped += 1;
                }
            }
        }

        for phone in &snapshot.phones {
            let Some(cached) = self.devices.get(DeviceKind::Phone, &phone.id) else {
                warn!(device = %phone.id, "phone record has no registered device");
                return Err(CoreError::DeviceNotFound {
                    identifier: phone.id.clone(),
                });
            };
            self.reconcile_phone(&cached, phone, &mut report).await;
        }

        if !report.is_noop() {
            info!(
                writes = report.writes,
                flows = report.flows,
                "reconciled snapshot"
            );
        }
        Ok(report)
    }

    async fn reconcile_tag(
        &self,
        cached: &TrackedDevice,
        tag: &TagRecord,
        report: &mut ReconcileReport,
    ) {
        let connected = tag.connected;
        if cached.last_connected != Some(connected)
            && self
                .write(
                    DeviceKind::Tag,
                    &tag.id,
                    Capability::AlarmDisconnected,
                    tag.disconnected().into(),
                    report,
                )
                .await
        {
            self.devices.update(DeviceKind::Tag, &tag.id, |d| {
                d.last_connected = Some(connected);
            });

            let event = FlowEvent::for_connectivity(connected);
            match self
                .registry
                .trigger_flow(DeviceKind::Tag, &tag.id, event)
                .await
            {
                Ok(()) => {
                    report.flows += 1;
                    info!(device = %tag.id, %event, "connectivity changed");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(device = %tag.id, %event, error = %e, "flow trigger failed");
                }
            }
        }

        let alarm = tag.battery_alarm();
        if cached.last_battery_low != Some(alarm)
            && self
                .write(
                    DeviceKind::Tag,
                    &tag.id,
                    Capability::AlarmBattery,
                    alarm.into(),
                    report,
                )
                .await
        {
            self.devices.update(DeviceKind::Tag, &tag.id, |d| {
                d.last_battery_low = Some(alarm);
            });
        }
    }

    async fn reconcile_phone(
        &self,
        cached: &TrackedDevice,
        phone: &PhoneRecord,
        report: &mut ReconcileReport,
    ) {
        let Some(level) = phone.battery_level else {
            debug!(device = %phone.id, "phone reported no battery level");
            return;
        };
        if cached.last_battery_level != Some(level)
            && self
                .write(
                    DeviceKind::Phone,
                    &phone.id,
                    Capability::BatteryLevel,
                    level.into(),
                    report,
                )
                .await
        {
            self.devices.update(DeviceKind::Phone, &phone.id, |d| {
                d.last_battery_level = Some(level);
            });
        }
    }

    /// One capability write. Returns whether the registry accepted it.
    async fn write(
        &self,
        kind: DeviceKind,
        device_id: &str,
        capability: Capability,
        value: CapabilityValue,
        report: &mut ReconcileReport,
    ) -> bool {
        match self
            .registry
            .set_capability(kind, device_id, capability, value)
            .await
        {
            Ok(()) => {
                report.writes += 1;
                debug!(device = %device_id, %capability, %value, "capability written");
                true
            }
            Err(e) => {
                report.failed += 1;
                warn!(device = %device_id, %capability, error = %e, "capability write failed");
                false
            }
        }
    }
}
