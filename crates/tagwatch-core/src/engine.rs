// ── Engine ──
//
// Owns the shared state (session, device cache, poll gate) and wires the
// poller, reconciler, auth manager, cooldown guard and action dispatcher
// around it. Hosts drive it through the lifecycle and pairing methods
// below; the engine drives the host back through `DeviceRegistry`.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tagwatch_api::{ChipoloClient, TransportConfig};

use crate::actions::ActionDispatcher;
use crate::api::AccountApi;
use crate::auth::AuthManager;
use crate::config::{AccountCredentials, EngineConfig};
use crate::convert::pairing_candidates;
use crate::cooldown::{CooldownGuard, PollState};
use crate::error::CoreError;
use crate::model::{DeviceKind, PairingCandidate, TrackedDevice};
use crate::poller::{Poller, TickOutcome};
use crate::reconcile::Reconciler;
use crate::registry::DeviceRegistry;
use crate::session::{CredentialStore, Session, SessionStore};
use crate::store::DeviceStore;

/// The polling engine. Cheaply cloneable; clones share one instance.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    session: Arc<SessionStore>,
    devices: Arc<DeviceStore>,
    api: Arc<dyn AccountApi>,
    credentials: Arc<dyn CredentialStore>,
    auth: Arc<AuthManager>,
    cooldown: Arc<CooldownGuard>,
    poller: Poller,
    actions: ActionDispatcher,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Engine {
    /// Assemble an engine from its collaborators. Nothing runs until
    /// [`on_init`](Self::on_init).
    pub fn new(
        config: EngineConfig,
        api: Arc<dyn AccountApi>,
        registry: Arc<dyn DeviceRegistry>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let session = Arc::new(SessionStore::default());
        let devices = Arc::new(DeviceStore::new());
        let auth = Arc::new(AuthManager::new(
            Arc::clone(&session),
            Arc::clone(&api),
            Arc::clone(&credentials),
        ));
        let cooldown = Arc::new(CooldownGuard::new(
            Arc::clone(&devices),
            Arc::clone(&registry),
        ));
        let poller = Poller::new(
            Arc::clone(&session),
            Arc::clone(&api),
            Arc::clone(&auth),
            Arc::clone(&cooldown),
            Reconciler::new(Arc::clone(&devices), Arc::clone(&registry)),
        );
        let actions = ActionDispatcher::new(Arc::clone(&session), Arc::clone(&api), registry);

        Self {
            inner: Arc::new(EngineInner {
                config,
                session,
                devices,
                api,
                credentials,
                auth,
                cooldown,
                poller,
                actions,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Build an engine talking to the real account API.
    pub fn from_config(
        config: EngineConfig,
        registry: Arc<dyn DeviceRegistry>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, CoreError> {
        let transport = TransportConfig::default().with_timeout(config.timeout);
        let client = ChipoloClient::new(config.base_url()?, &transport)?;
        Ok(Self::new(config, Arc::new(client), registry, credentials))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Startup hook: restore the persisted session and start the poll
    /// task. Calling it again is a no-op.
    pub async fn on_init(&self) {
        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            debug!("engine already started");
            return;
        }

        self.restore_session().await;

        let period = self.inner.config.poll_interval;
        if period.is_zero() {
            info!("poll timer disabled");
        }
        handles.push(tokio::spawn(poll_task(
            self.clone(),
            period,
            self.inner.config.poll_on_start,
            self.inner.cancel.clone(),
        )));

        info!(
            interval_secs = period.as_secs(),
            devices = self.inner.devices.len(),
            "engine started"
        );
    }

    /// Seed the session from the credential store. Returns whether the
    /// restored session is flagged logged in.
    ///
    /// One-shot hosts call this instead of [`on_init`](Self::on_init) to
    /// reuse a session without starting the timers.
    pub async fn restore_session(&self) -> bool {
        match self.inner.credentials.load_session().await {
            Ok(session) => {
                let logged_in = session.logged_in;
                debug!(logged_in, "restored session");
                self.inner.session.replace(session);
                logged_in
            }
            Err(e) => {
                warn!(error = %e, "failed to load persisted session");
                false
            }
        }
    }

    /// Stop background tasks and wait for them to finish. A poll cycle
    /// already in flight runs to completion first.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("engine stopped");
    }

    // ── Device registration ──────────────────────────────────────

    /// Track a device the host created. Returns `false` if it was
    /// already tracked.
    pub fn register_device(&self, kind: DeviceKind, external_id: &str) -> bool {
        let added = self.inner.devices.register(kind, external_id);
        if added {
            debug!(%kind, device = %external_id, "device registered");
        }
        added
    }

    /// Stop tracking a device the host deleted.
    pub fn forget_device(&self, kind: DeviceKind, external_id: &str) -> bool {
        self.inner.devices.forget(kind, external_id).is_some()
    }

    pub fn devices(&self) -> Vec<TrackedDevice> {
        self.inner.devices.all()
    }

    // ── Polling ──────────────────────────────────────────────────

    /// Run one poll cycle now, outside the timer.
    pub async fn tick(&self) -> TickOutcome {
        let outcome = self.inner.poller.tick().await;
        debug!(?outcome, "poll cycle finished");
        outcome
    }

    pub fn poll_state(&self) -> PollState {
        self.inner.cooldown.state()
    }

    pub fn subscribe_poll_state(&self) -> watch::Receiver<PollState> {
        self.inner.cooldown.subscribe()
    }

    /// Message of the most recent failed poll cycle.
    pub fn last_error(&self) -> Option<String> {
        self.inner.poller.last_error()
    }

    // ── Session / pairing ────────────────────────────────────────

    pub fn session(&self) -> Arc<Session> {
        self.inner.session.current()
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.session.is_logged_in()
    }

    /// Log in again with the stored credentials.
    pub async fn refresh_session(&self) -> Result<(), CoreError> {
        self.inner.auth.refresh().await
    }

    /// Pairing login. On success the poller has a usable session and the
    /// credentials are stored for later refreshes.
    pub async fn login(&self, email: &str, password: SecretString) -> Result<(), CoreError> {
        self.inner
            .auth
            .login(AccountCredentials {
                email: email.to_owned(),
                password,
            })
            .await
    }

    /// Devices on the account that could be paired.
    ///
    /// Without a session, or while polling is paused, returns an empty
    /// list.
    pub async fn list_devices(&self) -> Result<Vec<PairingCandidate>, CoreError> {
        if self.inner.cooldown.is_blocked() {
            warn!("polling is paused by cooldown; not fetching device list");
            return Ok(Vec::new());
        }
        let session = self.inner.session.current();
        let Some((account_id, token)) = session.credentials() else {
            warn!("no session token; cannot list devices");
            return Ok(Vec::new());
        };

        match self.inner.api.fetch_account_state(account_id, token).await {
            Ok(snapshot) => Ok(pairing_candidates(&snapshot)),
            Err(e) => {
                if e.is_rate_limited() {
                    self.inner.cooldown.engage().await;
                }
                Err(e)
            }
        }
    }

    // ── Actions ──────────────────────────────────────────────────

    pub async fn ring(&self, device_id: &str) -> Result<(), CoreError> {
        self.inner.actions.ring(device_id).await
    }

    /// Host listener for a phone's `ring` toggle.
    pub async fn on_ring(&self, device_id: &str, value: bool) -> Result<(), CoreError> {
        self.inner.actions.on_ring_toggled(device_id, value).await
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Scheduled polling, plus one cycle at the cooldown deadline. A slow
/// cycle delays the next tick instead of bunching ticks up behind it.
///
/// Both wake-ups share this task: a cycle at the deadline restarts the
/// timer period, and a timer tick that releases the guard clears the
/// deadline, so each release is followed by exactly one fetch.
async fn poll_task(engine: Engine, period: Duration, poll_on_start: bool, cancel: CancellationToken) {
    let mut interval = (!period.is_zero()).then(|| {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });
    match interval.as_mut() {
        // consume the immediate first tick
        Some(interval) if !poll_on_start => {
            interval.tick().await;
        }
        None if poll_on_start => {
            engine.tick().await;
        }
        _ => {}
    }

    let mut state = engine.subscribe_poll_state();
    loop {
        let deadline = state.borrow_and_update().blocked_until;
        if deadline.is_some() {
            debug!("cooldown wake scheduled");
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = sleep_until(deadline) => {
                info!("cooldown deadline reached; polling");
                engine.tick().await;
                if let Some(interval) = interval.as_mut() {
                    interval.reset();
                }
            }
            () = next_tick(interval.as_mut()) => {
                engine.tick().await;
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn next_tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use crate::config::COOLDOWN_WINDOW;
    use crate::model::{FlowEvent, Snapshot};
    use crate::test_support::{
        FakeApi, MemoryCredentials, RecordingRegistry, credentials, rate_limited, session, tag,
        unauthorized,
    };

    fn engine(
        config: EngineConfig,
        stored: MemoryCredentials,
    ) -> (Engine, Arc<FakeApi>, Arc<RecordingRegistry>) {
        let api = Arc::new(FakeApi::new());
        let registry = Arc::new(RecordingRegistry::new());
        let engine = Engine::new(
            config,
            Arc::clone(&api) as Arc<dyn AccountApi>,
            Arc::clone(&registry) as Arc<dyn DeviceRegistry>,
            Arc::new(stored) as Arc<dyn CredentialStore>,
        );
        (engine, api, registry)
    }

    fn every(period: Duration) -> EngineConfig {
        EngineConfig {
            poll_interval: period,
            ..EngineConfig::default()
        }
    }

    /// Let spawned tasks run up to their next await on the paused clock.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn on_init_restores_session_and_polls_immediately() {
        let stored = MemoryCredentials::empty().with_session(session("tok", "42"));
        let (engine, api, registry) = engine(every(Duration::from_secs(900)), stored);
        engine.register_device(DeviceKind::Tag, "AA");
        api.push_fetch(Ok(Snapshot::new(vec![tag("AA", true, false, false)], vec![])));

        engine.on_init().await;
        settle().await;

        assert!(engine.is_logged_in());
        assert_eq!(api.fetch_calls(), 1);
        assert_eq!(registry.flows(), vec![("AA".to_string(), FlowEvent::Connected)]);

        tokio::time::sleep(Duration::from_secs(900)).await;
        settle().await;
        assert_eq!(api.fetch_calls(), 2);

        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_resumes_on_its_own_after_window() {
        let stored = MemoryCredentials::empty().with_session(session("tok", "42"));
        // A poll period longer than the window, so only the deadline wake can
        // account for the resume.
        let (engine, api, registry) = engine(every(COOLDOWN_WINDOW * 2), stored);
        engine.register_device(DeviceKind::Tag, "AA");
        engine.register_device(DeviceKind::Phone, "p1");
        api.push_fetch(Err(rate_limited()));

        engine.on_init().await;
        settle().await;
        assert!(engine.poll_state().blocked);
        assert_eq!(registry.unavailable(), vec!["AA", "p1"]);

        tokio::time::sleep(COOLDOWN_WINDOW).await;
        settle().await;

        assert!(!engine.poll_state().blocked);
        assert_eq!(registry.available(), vec!["AA", "p1"]);
        assert_eq!(api.fetch_calls(), 2);

        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_on_a_timer_tick_fetches_once() {
        let stored = MemoryCredentials::empty().with_session(session("tok", "42"));
        // The default period divides the window, so the deadline lands on a
        // timer tick.
        let (engine, api, _) = engine(EngineConfig::default(), stored);
        engine.register_device(DeviceKind::Tag, "AA");
        api.push_fetch(Err(rate_limited()));

        engine.on_init().await;
        settle().await;
        assert!(engine.poll_state().blocked);

        tokio::time::sleep(COOLDOWN_WINDOW + Duration::from_secs(1)).await;
        settle().await;

        assert!(!engine.poll_state().blocked);
        assert_eq!(api.fetch_calls(), 2);

        // The timer restarts from the resume.
        tokio::time::sleep(crate::config::DEFAULT_POLL_INTERVAL).await;
        settle().await;
        assert_eq!(api.fetch_calls(), 3);

        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn timer_ticks_during_cooldown_do_not_fetch() {
        let stored = MemoryCredentials::empty().with_session(session("tok", "42"));
        let (engine, api, _) = engine(every(Duration::from_secs(30)), stored);
        api.push_fetch(Err(rate_limited()));

        engine.on_init().await;
        settle().await;

        tokio::time::sleep(Duration::from_secs(10 * 60)).await;
        settle().await;

        assert_eq!(api.fetch_calls(), 1);
        assert!(engine.poll_state().blocked);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn pairing_login_then_list_devices() {
        let (engine, api, _) = engine(every(Duration::ZERO), MemoryCredentials::empty());
        api.grant("tok", "42");
        api.push_fetch(Ok(Snapshot::new(
            vec![tag("AA", true, false, false)],
            vec![crate::test_support::phone("p1", Some(50))],
        )));

        assert!(engine.list_devices().await.unwrap().is_empty());

        engine
            .login(&credentials().email, credentials().password)
            .await
            .unwrap();
        let devices = engine.list_devices().await.unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "Chipolo");
        assert_eq!(devices[1].kind, DeviceKind::Phone);
    }

    #[tokio::test]
    async fn rejected_session_is_not_restored_after_restart() {
        let stored = Arc::new(MemoryCredentials::empty().with_session(session("old", "42")));
        let start = |api: &Arc<FakeApi>| {
            Engine::new(
                every(Duration::ZERO),
                Arc::clone(api) as Arc<dyn AccountApi>,
                Arc::new(RecordingRegistry::new()) as Arc<dyn DeviceRegistry>,
                Arc::clone(&stored) as Arc<dyn CredentialStore>,
            )
        };

        let api = Arc::new(FakeApi::new());
        api.push_fetch(Err(unauthorized()));
        let first = start(&api);
        assert!(first.restore_session().await);
        assert_eq!(first.tick().await, TickOutcome::AuthFailed);
        assert!(!first.is_logged_in());

        let second = start(&Arc::new(FakeApi::new()));
        assert!(!second.restore_session().await);
        assert!(!second.is_logged_in());
    }

    #[tokio::test]
    async fn shutdown_is_safe_before_init() {
        let (engine, _, _) = engine(EngineConfig::default(), MemoryCredentials::empty());
        engine.shutdown().await;
        assert!(engine.devices().is_empty());
    }
}
