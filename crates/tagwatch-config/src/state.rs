// ── Session persistence ──
//
// File-backed `CredentialStore` for the engine. Credentials come from the
// profile (with the usual env / keyring chain); the session goes to a
// small per-profile TOML file, with the token in the keyring when one is
// usable.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tagwatch_core::{AccountCredentials, CoreError, CredentialStore, Session};

use crate::{
    ConfigError, keyring_delete, keyring_get, keyring_set, load_config_from, resolve_credentials,
    save_config_to,
};

const TOKEN_ITEM: &str = "token";
const PASSWORD_ITEM: &str = "password";

/// On-disk session record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub account_id: Option<String>,
    #[serde(default)]
    pub logged_in: bool,
    /// Only present when the keyring could not take the token.
    pub token: Option<String>,
}

impl SessionState {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Credential store backed by the config file, the session state file and
/// (optionally) the system keyring.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    profile_name: String,
    config_path: PathBuf,
    state_path: PathBuf,
    use_keyring: bool,
}

impl FileCredentialStore {
    pub fn new(
        profile_name: impl Into<String>,
        config_path: impl Into<PathBuf>,
        state_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            profile_name: profile_name.into(),
            config_path: config_path.into(),
            state_path: state_path.into(),
            use_keyring: true,
        }
    }

    /// Keep every secret in plain files.
    pub fn without_keyring(mut self) -> Self {
        self.use_keyring = false;
        self
    }

    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Read the persisted session state as-is.
    pub fn read_state(&self) -> Result<SessionState, ConfigError> {
        SessionState::read(&self.state_path)
    }

    /// Forget the persisted session (and its keyring token).
    pub fn clear_session(&self) -> Result<(), ConfigError> {
        if self.use_keyring {
            keyring_delete(&self.profile_name, TOKEN_ITEM)?;
        }
        match std::fs::remove_file(&self.state_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn load(&self) -> Result<Session, ConfigError> {
        let state = self.read_state()?;
        let token = state
            .token
            .map(SecretString::from)
            .or_else(|| {
                self.use_keyring
                    .then(|| keyring_get(&self.profile_name, TOKEN_ITEM))
                    .flatten()
            });
        Ok(Session {
            token,
            account_id: state.account_id,
            logged_in: state.logged_in,
        })
    }

    fn save(&self, session: &Session) -> Result<(), ConfigError> {
        let mut state = SessionState {
            account_id: session.account_id.clone(),
            logged_in: session.logged_in,
            token: None,
        };
        if let Some(token) = &session.token {
            let in_keyring = self.use_keyring
                && match keyring_set(&self.profile_name, TOKEN_ITEM, token) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "keyring unavailable; storing token in state file");
                        false
                    }
                };
            if !in_keyring {
                state.token = Some(token.expose_secret().to_owned());
            }
        }
        state.write(&self.state_path)?;
        debug!(path = %self.state_path.display(), "session saved");
        Ok(())
    }

    fn store(&self, credentials: &AccountCredentials) -> Result<(), ConfigError> {
        let mut cfg = load_config_from(&self.config_path)?;
        let profile = cfg.profiles.entry(self.profile_name.clone()).or_default();
        profile.email = Some(credentials.email.clone());

        let in_keyring = self.use_keyring
            && match keyring_set(&self.profile_name, PASSWORD_ITEM, &credentials.password) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "keyring unavailable; storing password in config file");
                    false
                }
            };
        profile.password = if in_keyring {
            None
        } else {
            Some(credentials.password.expose_secret().to_owned())
        };

        save_config_to(&cfg, &self.config_path)
    }
}

fn persistence(e: &ConfigError) -> CoreError {
    CoreError::Persistence {
        message: e.to_string(),
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn credentials(&self) -> Result<Option<AccountCredentials>, CoreError> {
        let cfg = load_config_from(&self.config_path).map_err(|e| CoreError::Config {
            message: e.to_string(),
        })?;
        let Some(profile) = cfg.profiles.get(&self.profile_name) else {
            return Ok(None);
        };
        match resolve_credentials(profile, &self.profile_name, self.use_keyring) {
            Ok(credentials) => Ok(Some(credentials)),
            Err(ConfigError::NoCredentials { .. }) => Ok(None),
            Err(e) => Err(CoreError::Config {
                message: e.to_string(),
            }),
        }
    }

    async fn store_credentials(&self, credentials: &AccountCredentials) -> Result<(), CoreError> {
        self.store(credentials).map_err(|e| persistence(&e))
    }

    async fn load_session(&self) -> Result<Session, CoreError> {
        self.load().map_err(|e| persistence(&e))
    }

    async fn save_session(&self, session: &Session) -> Result<(), CoreError> {
        self.save(session).map_err(|e| persistence(&e))
    }
}
