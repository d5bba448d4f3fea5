// Shared transport configuration for building reqwest::Client instances.
//
// The remote API only answers clients that look like the web app, so every
// request carries a browser User-Agent and the client-version header.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

/// Browser User-Agent the web client sends.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36";

/// Header carrying the client version on every request.
pub const CLIENT_VERSION_HEADER: &str = "Chipolo-Client-Version";

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub client_version: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            client_version: 0,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// The client-version header is installed as a default header so that
    /// endpoint methods only add the per-session headers.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CLIENT_VERSION_HEADER,
            HeaderValue::from(self.client_version),
        );

        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(|e| {
                crate::error::Error::ClientSetup(format!("failed to build HTTP client: {e}"))
            })
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
