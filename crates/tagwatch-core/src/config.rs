// ── Runtime engine configuration ──
//
// These types describe *how* to talk to the account API and how often to
// poll. They carry credential data and tuning, but never touch disk.
// The CLI builds an `EngineConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use tagwatch_api::client::DEFAULT_BASE_URL;

use crate::error::CoreError;

/// How long polling stays suspended after the service throttles us.
///
/// Matches the observed Cloudflare ban window. Fixed policy, not a knob.
pub const COOLDOWN_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Delay after which a ring toggle flips itself back off.
pub const RING_RESET_DELAY: Duration = Duration::from_secs(1);

/// Poll period used when nothing else is configured (15 minutes).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Email/password pair used for the login exchange.
#[derive(Debug, Clone)]
pub struct AccountCredentials {
    pub email: String,
    pub password: SecretString,
}

/// Configuration for one engine instance.
///
/// Built by the CLI, passed to `Engine`; core never reads config files.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// API root override (e.g., a local mock server). `None` talks to the
    /// production root.
    pub api_url: Option<Url>,
    /// Period between scheduled polls. Zero disables the poll timer.
    ///
    /// Short periods are what trigger throttling in the first place.
    pub poll_interval: Duration,
    /// Request timeout.
    pub timeout: Duration,
    /// Poll once immediately on `on_init`, before the first timer period.
    pub poll_on_start: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: Duration::from_secs(30),
            poll_on_start: true,
        }
    }
}

impl EngineConfig {
    /// The API root this engine talks to.
    pub fn base_url(&self) -> Result<Url, CoreError> {
        match &self.api_url {
            Some(url) => Ok(url.clone()),
            None => Ok(Url::parse(DEFAULT_BASE_URL).map_err(tagwatch_api::Error::from)?),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_talks_to_production_root() {
        let config = EngineConfig::default();
        assert!(config.api_url.is_none());
        assert_eq!(config.base_url().unwrap().as_str(), "https://api.chipolo.com/v2/");
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn api_url_override_wins() {
        let config = EngineConfig {
            api_url: Some(Url::parse("http://127.0.0.1:9000/v2/").unwrap()),
            ..EngineConfig::default()
        };
        assert_eq!(config.base_url().unwrap().as_str(), "http://127.0.0.1:9000/v2/");
    }
}
