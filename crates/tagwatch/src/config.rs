//! CLI configuration: thin wrapper around `tagwatch_config`.
//!
//! Adds resolution that respects `GlobalOpts` overrides (--config,
//! --profile, --api-url, --timeout, --no-keyring).

use std::path::PathBuf;
use std::time::Duration;

use tagwatch_core::EngineConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use tagwatch_config::{
    Config, FileCredentialStore, Profile, load_config_from, profile_to_engine_config,
    save_config_to, state_path,
};

/// Config file path: `--config` / `TAGWATCH_CONFIG`, else the platform
/// default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(tagwatch_config::config_path)
}

/// Load the config, falling back to defaults when it is missing or broken.
pub fn load_config_or_default(global: &GlobalOpts) -> Config {
    load_config_from(&config_path(global)).unwrap_or_default()
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.default_profile_name().to_owned())
}

/// The active profile, or an empty one for first-time use.
pub fn active_profile(config: &Config, profile_name: &str) -> Profile {
    config
        .profiles
        .get(profile_name)
        .cloned()
        .unwrap_or_default()
}

/// Translate the active profile + global flags into an `EngineConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_engine_config(
    profile: &Profile,
    config: &Config,
    global: &GlobalOpts,
) -> Result<EngineConfig, CliError> {
    let mut profile = profile.clone();
    if let Some(url) = &global.api_url {
        profile.api_url = Some(url.clone());
    }
    let mut engine = profile_to_engine_config(&profile, &config.defaults)?;
    if let Some(secs) = global.timeout {
        engine.timeout = Duration::from_secs(secs);
    }
    Ok(engine)
}

/// File-backed credential store for the active profile.
pub fn credential_store(global: &GlobalOpts, profile_name: &str) -> FileCredentialStore {
    let store = FileCredentialStore::new(
        profile_name,
        config_path(global),
        state_path(profile_name),
    );
    if global.no_keyring {
        store.without_keyring()
    } else {
        store
    }
}
