//! Configuration for the tagwatch CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation to `tagwatch_core::EngineConfig`. Session persistence for
//! the engine lives in [`state`].

pub mod state;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tagwatch_core::{AccountCredentials, EngineConfig};

pub use state::{FileCredentialStore, SessionState};

/// Keyring service name for every secret this tool stores.
pub const KEYRING_SERVICE: &str = "tagwatch";

/// Environment variables consulted before the keyring and config file.
pub const EMAIL_ENV: &str = "TAGWATCH_EMAIL";
pub const PASSWORD_ENV: &str = "TAGWATCH_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use when none is given explicitly.
    pub fn default_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_poll_interval() -> u64 {
    900
}

/// A named account profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Account email.
    pub email: Option<String>,

    /// Account password (plaintext, prefer keyring or env var).
    pub password: Option<String>,

    /// Override the API root (proxies, tests).
    pub api_url: Option<String>,

    /// Override the poll period. Short periods get the account throttled.
    pub poll_interval_secs: Option<u64>,

    /// Override the request timeout.
    pub timeout: Option<u64>,

    /// Tag MACs to track. Empty means every tag on the account.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Phone ids to track. Empty means every phone on the account.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phones: Vec<String>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "tagwatch", "tagwatch")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory holding per-profile session state.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

/// Session state file for one profile.
pub fn state_path(profile_name: &str) -> PathBuf {
    data_dir().join("sessions").join(format!("{profile_name}.toml"))
}

fn dirs_fallback(base: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(base);
    p.push("tagwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
///
/// A missing file yields the defaults. Environment overrides use
/// `TAGWATCH_` with `__` as the nesting separator, e.g.
/// `TAGWATCH_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("TAGWATCH_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Look up a profile by name.
pub fn profile<'a>(cfg: &'a Config, name: &str) -> Result<&'a Profile, ConfigError> {
    cfg.profiles
        .get(name)
        .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str, item: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/{item}"),
    )?)
}

/// Read a secret from the system keyring, `None` if absent or the keyring
/// is unavailable.
pub fn keyring_get(profile_name: &str, item: &str) -> Option<SecretString> {
    keyring_entry(profile_name, item)
        .ok()?
        .get_password()
        .ok()
        .map(SecretString::from)
}

pub fn keyring_set(profile_name: &str, item: &str, secret: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name, item)?.set_password(secret.expose_secret())?;
    Ok(())
}

/// Remove a secret, treating "not there" as success.
pub fn keyring_delete(profile_name: &str, item: &str) -> Result<(), ConfigError> {
    match keyring_entry(profile_name, item)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Resolve the account password.
///
/// 1. `TAGWATCH_PASSWORD`
/// 2. System keyring (skipped when `use_keyring` is false)
/// 3. Plaintext in the profile
pub fn resolve_password(
    profile: &Profile,
    profile_name: &str,
    use_keyring: bool,
) -> Option<SecretString> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Some(SecretString::from(pw));
    }
    if use_keyring {
        if let Some(pw) = keyring_get(profile_name, "password") {
            return Some(pw);
        }
    }
    profile.password.clone().map(SecretString::from)
}

/// Resolve the account email: the profile first, then `TAGWATCH_EMAIL`.
pub fn resolve_email(profile: &Profile) -> Option<String> {
    profile
        .email
        .clone()
        .or_else(|| std::env::var(EMAIL_ENV).ok())
        .filter(|e| !e.trim().is_empty())
}

/// Resolve both halves of the login, failing if either is missing.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
    use_keyring: bool,
) -> Result<AccountCredentials, ConfigError> {
    let no_credentials = || ConfigError::NoCredentials {
        profile: profile_name.into(),
    };
    let email = resolve_email(profile).ok_or_else(no_credentials)?;
    let password = resolve_password(profile, profile_name, use_keyring).ok_or_else(no_credentials)?;
    Ok(AccountCredentials { email, password })
}

// ── Engine config ───────────────────────────────────────────────────

/// Build an `EngineConfig` from a profile and the global defaults.
pub fn profile_to_engine_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<EngineConfig, ConfigError> {
    let api_url = profile.api_url.as_deref().map(parse_api_url).transpose()?;

    let poll_interval = profile
        .poll_interval_secs
        .unwrap_or(defaults.poll_interval_secs);
    let timeout = profile.timeout.unwrap_or(defaults.timeout);

    Ok(EngineConfig {
        api_url,
        poll_interval: Duration::from_secs(poll_interval),
        timeout: Duration::from_secs(timeout),
        poll_on_start: true,
    })
}

fn parse_api_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "api_url".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("expected http or https, got '{}'", url.scheme()),
        });
    }
    Ok(url)
}
