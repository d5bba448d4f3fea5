// ── Rate-limit cooldown guard ──
//
// Two states: active (polling allowed) and blocked until a deadline.
// A throttling response engages the guard, which marks every tracked
// device unavailable; once the deadline has passed the guard releases and
// marks them available again. The deadline is a monotonic tokio
// `Instant`, so a paused test clock can walk through the whole window.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::COOLDOWN_WINDOW;
use crate::model::DeviceKind;
use crate::registry::DeviceRegistry;
use crate::store::DeviceStore;

/// Reason shown on every device while polling is paused.
pub const UNAVAILABLE_REASON: &str =
    "IP block by Cloudflare detected, polling is paused for 24 hours";

/// Process-wide polling gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollState {
    pub blocked: bool,
    pub blocked_until: Option<Instant>,
}

impl PollState {
    /// Time left until the guard may release, zero once elapsed.
    pub fn remaining(&self) -> Option<Duration> {
        self.blocked_until
            .map(|until| until.saturating_duration_since(Instant::now()))
    }
}

#[derive(Debug, Clone, Copy)]
enum Sweep {
    Unavailable,
    Available,
}

pub struct CooldownGuard {
    state: watch::Sender<PollState>,
    devices: Arc<DeviceStore>,
    registry: Arc<dyn DeviceRegistry>,
    window: Duration,
}

impl CooldownGuard {
    pub fn new(devices: Arc<DeviceStore>, registry: Arc<dyn DeviceRegistry>) -> Self {
        let (state, _) = watch::channel(PollState::default());
        Self {
            state,
            devices,
            registry,
            window: COOLDOWN_WINDOW,
        }
    }

    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    pub fn is_blocked(&self) -> bool {
        self.state.borrow().blocked
    }

    /// Watch channel carrying every state transition.
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }

    /// Enter the blocked state and mark every device unavailable.
    ///
    /// Returns `false` without touching the deadline if already blocked.
    pub async fn engage(&self) -> bool {
        let until = Instant::now() + self.window;
        let engaged = self.state.send_if_modified(|s| {
            if s.blocked {
                return false;
            }
            *s = PollState {
                blocked: true,
                blocked_until: Some(until),
            };
            true
        });

        if !engaged {
            debug!("rate limited again while cooling down; deadline unchanged");
            return false;
        }

        warn!(
            window_secs = self.window.as_secs(),
            "rate limited by remote service; pausing polling"
        );
        self.sweep(Sweep::Unavailable).await;
        true
    }

    /// Leave the blocked state if its deadline has passed and mark every
    /// device available again. Returns whether a release happened.
    pub async fn release_if_elapsed(&self) -> bool {
        let now = Instant::now();
        let released = self.state.send_if_modified(|s| match s.blocked_until {
            Some(until) if s.blocked && now >= until => {
                *s = PollState::default();
                true
            }
            _ => false,
        });

        if released {
            info!("cooldown elapsed; resuming polling");
            self.sweep(Sweep::Available).await;
        }
        released
    }

    /// Apply one availability change to every tracked device. A failing
    /// device is logged and the sweep moves on.
    async fn sweep(&self, sweep: Sweep) {
        for kind in DeviceKind::ALL {
            for id in self.devices.ids(kind) {
                let result = match sweep {
                    Sweep::Unavailable => {
                        self.registry
                            .set_unavailable(kind, &id, UNAVAILABLE_REASON)
                            .await
                    }
                    Sweep::Available => self.registry.set_available(kind, &id).await,
                };
                if let Err(e) = result {
                    error!(device = %id, %kind, ?sweep, error = %e, "availability update failed");
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::RecordingRegistry;

    fn guard() -> (CooldownGuard, Arc<DeviceStore>, Arc<RecordingRegistry>) {
        let devices = Arc::new(DeviceStore::new());
        devices.register(DeviceKind::Tag, "AA");
        devices.register(DeviceKind::Tag, "BB");
        devices.register(DeviceKind::Phone, "p1");
        let registry = Arc::new(RecordingRegistry::new());
        let guard = CooldownGuard::new(
            Arc::clone(&devices),
            Arc::clone(&registry) as Arc<dyn DeviceRegistry>,
        );
        (guard, devices, registry)
    }

    #[tokio::test(start_paused = true)]
    async fn engage_blocks_and_marks_every_device_unavailable() {
        let (guard, _, registry) = guard();

        assert!(guard.engage().await);

        let state = guard.state();
        assert!(state.blocked);
        assert_eq!(state.remaining(), Some(COOLDOWN_WINDOW));
        assert_eq!(registry.unavailable(), vec!["AA", "BB", "p1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn engage_while_blocked_keeps_deadline() {
        let (guard, _, registry) = guard();
        guard.engage().await;
        let first = guard.state().blocked_until;

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(!guard.engage().await);

        assert_eq!(guard.state().blocked_until, first);
        assert_eq!(registry.unavailable().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_tolerates_a_failing_device() {
        let (guard, _, registry) = guard();
        registry.fail_device("AA");

        assert!(guard.engage().await);

        assert_eq!(registry.unavailable(), vec!["BB", "p1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn release_waits_for_deadline() {
        let (guard, _, registry) = guard();
        guard.engage().await;

        tokio::time::advance(COOLDOWN_WINDOW - Duration::from_secs(1)).await;
        assert!(!guard.release_if_elapsed().await);
        assert!(guard.is_blocked());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(guard.release_if_elapsed().await);
        assert_eq!(guard.state(), PollState::default());
        assert_eq!(registry.available(), vec!["AA", "BB", "p1"]);

        assert!(!guard.release_if_elapsed().await);
    }

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let (guard, _, _) = guard();
        let mut rx = guard.subscribe();

        guard.engage().await;

        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().blocked);
    }
}
