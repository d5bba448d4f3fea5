// ── User-initiated actions ──
//
// One-shot commands issued outside the poll cycle. Currently just "ring",
// which hosts expose as a momentary toggle on phones.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::AccountApi;
use crate::config::RING_RESET_DELAY;
use crate::error::CoreError;
use crate::model::{Capability, DeviceKind};
use crate::registry::DeviceRegistry;
use crate::session::SessionStore;

pub struct ActionDispatcher {
    session: Arc<SessionStore>,
    api: Arc<dyn AccountApi>,
    registry: Arc<dyn DeviceRegistry>,
}

impl ActionDispatcher {
    pub fn new(
        session: Arc<SessionStore>,
        api: Arc<dyn AccountApi>,
        registry: Arc<dyn DeviceRegistry>,
    ) -> Self {
        Self {
            session,
            api,
            registry,
        }
    }

    /// Ask the service to ring a device with the current session.
    pub async fn ring(&self, device_id: &str) -> Result<(), CoreError> {
        let session = self.session.current();
        let Some((account_id, token)) = session.credentials() else {
            warn!(device = %device_id, "no session token; cannot ring");
            return Err(CoreError::NoSession);
        };
        info!(device = %device_id, "ringing device");
        self.api.send_ring_command(account_id, token, device_id).await
    }

    /// Host listener for the phone `ring` toggle.
    ///
    /// Switching it on rings the phone and schedules the toggle to flip
    /// back off after [`RING_RESET_DELAY`], whether or not the command
    /// succeeds. Switching it off does nothing.
    pub async fn on_ring_toggled(&self, device_id: &str, value: bool) -> Result<(), CoreError> {
        if !value {
            return Ok(());
        }
        self.schedule_reset(device_id);
        self.ring(device_id).await
    }

    fn schedule_reset(&self, device_id: &str) {
        let registry = Arc::clone(&self.registry);
        let device_id = device_id.to_owned();
        drop(tokio::spawn(async move {
            tokio::time::sleep(RING_RESET_DELAY).await;
            match registry
                .set_capability(DeviceKind::Phone, &device_id, Capability::Ring, false.into())
                .await
            {
                Ok(()) => debug!(device = %device_id, "ring toggle reset"),
                Err(e) => warn!(device = %device_id, error = %e, "failed to reset ring toggle"),
            }
        }));
    }
}
