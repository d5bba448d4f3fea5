//! Command dispatch: bridges CLI args -> engine calls -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod login;
pub mod ring;
pub mod run;
pub mod status;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use tagwatch_core::{CoreError, Engine};

use crate::cli::{Command, GlobalOpts};
use crate::config::{self, FileCredentialStore, Profile};
use crate::error::CliError;
use crate::output;
use crate::registry::ConsoleRegistry;

/// Everything an account-bound command needs: the engine plus the
/// profile it was built from.
pub struct Context {
    pub engine: Engine,
    pub profile_name: String,
    pub profile: Profile,
    pub store: FileCredentialStore,
}

impl Context {
    /// Resolve the active profile and assemble an engine for it.
    ///
    /// `interval` overrides the profile's poll period.
    pub fn build(global: &GlobalOpts, interval: Option<Duration>) -> Result<Self, CliError> {
        let cfg = config::load_config_or_default(global);
        let profile_name = config::active_profile_name(global, &cfg);
        if global.profile.is_some() && !cfg.profiles.contains_key(&profile_name) {
            let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        let profile = config::active_profile(&cfg, &profile_name);

        let mut engine_config = config::resolve_engine_config(&profile, &cfg, global)?;
        if let Some(interval) = interval {
            engine_config.poll_interval = interval;
        }

        let store = config::credential_store(global, &profile_name);
        let registry = Arc::new(ConsoleRegistry::new(
            global.output.clone(),
            output::should_color(&global.color),
            global.quiet,
        ));
        let engine = Engine::from_config(engine_config, registry, Arc::new(store.clone()))?;

        debug!(profile = %profile_name, "context ready");
        Ok(Self {
            engine,
            profile_name,
            profile,
            store,
        })
    }

    /// Reuse the persisted session, logging in with the stored credentials
    /// when there is none.
    pub async fn ensure_session(&self) -> Result<(), CliError> {
        if self.engine.restore_session().await {
            return Ok(());
        }
        info!(profile = %self.profile_name, "no active session; logging in");
        self.engine
            .refresh_session()
            .await
            .map_err(|e| self.auth_error(e))
    }

    /// Run `op`, and if the token turns out to be stale, log in again with
    /// the stored credentials and retry once.
    pub async fn with_reauth<T, F, Fut>(&self, op: F) -> Result<T, CliError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        match op().await {
            Err(e) if e.is_unauthorized() => {
                debug!("token rejected; refreshing session");
                self.engine
                    .refresh_session()
                    .await
                    .map_err(|e| self.auth_error(e))?;
                op().await.map_err(|e| self.auth_error(e))
            }
            other => other.map_err(|e| self.auth_error(e)),
        }
    }

    /// Attach the profile name to auth failures.
    pub(super) fn auth_error(&self, err: CoreError) -> CliError {
        match err {
            CoreError::Unauthorized { .. } => CliError::AuthFailed {
                profile: self.profile_name.clone(),
            },
            CoreError::MissingCredentials => CliError::NoCredentials {
                profile: self.profile_name.clone(),
            },
            other => other.into(),
        }
    }
}

/// Dispatch an account-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => login::handle(&Context::build(global, None)?, args, global).await,
        Command::Devices => devices::handle(&Context::build(global, None)?, global).await,
        Command::Ring(args) => ring::handle(&Context::build(global, None)?, args, global).await,
        Command::Status => status::handle(&Context::build(global, None)?, global).await,
        Command::Run(args) => {
            let interval = args.interval.map(Into::into);
            run::handle(&Context::build(global, interval)?, args, global).await
        }
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}
