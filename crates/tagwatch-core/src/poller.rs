// ── Poll cycle ──
//
// One `tick()` = at most one snapshot fetch (plus a single retry after an
// auth refresh), handed to the reconciler. Cycles are serialized by a
// mutex, so a retry always finishes before the next timer tick can start
// a fetch.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::api::AccountApi;
use crate::auth::AuthManager;
use crate::cooldown::CooldownGuard;
use crate::error::CoreError;
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::session::SessionStore;

/// Fetch retries allowed after a successful auth refresh, per cycle.
const MAX_AUTH_RETRIES: u8 = 1;

/// How a poll cycle ended. Ticks never fail; the outcome is for logging
/// and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Polling is paused by the cooldown guard; nothing was fetched.
    Blocked,
    /// No token or account id yet; nothing was fetched.
    NoSession,
    Reconciled(ReconcileReport),
    /// Unauthorized and the refresh (or the retry after it) failed.
    AuthFailed,
    /// Throttled. `engaged` is false if the guard was already blocked.
    RateLimited { engaged: bool },
    /// Any other failure; retried on the next scheduled tick.
    Failed,
}

pub struct Poller {
    session: Arc<SessionStore>,
    api: Arc<dyn AccountApi>,
    auth: Arc<AuthManager>,
    cooldown: Arc<CooldownGuard>,
    reconciler: Reconciler,
    cycle: Mutex<()>,
    last_error: ArcSwapOption<String>,
}

impl Poller {
    pub fn new(
        session: Arc<SessionStore>,
        api: Arc<dyn AccountApi>,
        auth: Arc<AuthManager>,
        cooldown: Arc<CooldownGuard>,
        reconciler: Reconciler,
    ) -> Self {
        Self {
            session,
            api,
            auth,
            cooldown,
            reconciler,
            cycle: Mutex::new(()),
            last_error: ArcSwapOption::empty(),
        }
    }

    /// Message of the most recent failed cycle, cleared by a successful one.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.load_full().map(|e| (*e).clone())
    }

    /// Run one poll cycle.
    pub async fn tick(&self) -> TickOutcome {
        let _cycle = self.cycle.lock().await;

        // The first cycle after the deadline releases the guard.
        self.cooldown.release_if_elapsed().await;

        let mut retries_left = MAX_AUTH_RETRIES;
        loop {
            if self.cooldown.is_blocked() {
                debug!("polling paused by cooldown; skipping tick");
                return TickOutcome::Blocked;
            }

            let session = self.session.current();
            let Some((account_id, token)) = session.credentials() else {
                warn!("no session token or account id; skipping poll");
                return TickOutcome::NoSession;
            };

            let result = match self.api.fetch_account_state(account_id, token).await {
                Ok(snapshot) => self.reconciler.reconcile(&snapshot).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(report) => {
                    self.last_error.store(None);
                    return TickOutcome::Reconciled(report);
                }
                Err(e) if e.is_unauthorized() => {
                    self.record_error(&e);
                    self.auth.invalidate().await;
                    if retries_left == 0 {
                        error!(error = %e, "still unauthorized after refreshing session");
                        return TickOutcome::AuthFailed;
                    }
                    retries_left -= 1;

                    info!("session rejected; logging in again");
                    if let Err(e) = self.auth.refresh().await {
                        self.record_error(&e);
                        return TickOutcome::AuthFailed;
                    }
                }
                Err(e) if e.is_rate_limited() => {
                    self.record_error(&e);
                    let engaged = self.cooldown.engage().await;
                    return TickOutcome::RateLimited { engaged };
                }
                Err(e) => {
                    warn!(error = %e, "poll failed");
                    self.record_error(&e);
                    return TickOutcome::Failed;
                }
            }
        }
    }

    fn record_error(&self, e: &CoreError) {
        self.last_error.store(Some(Arc::new(e.to_string())));
    }
}
