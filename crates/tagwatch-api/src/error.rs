use thiserror::Error;

/// Top-level error type for the `tagwatch-api` crate.
///
/// Covers every failure mode of the remote account API: authentication,
/// throttling, transport, and payload decoding. `tagwatch-core` maps these
/// into its own domain taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected, or the session token is expired/revoked (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Throttling ──────────────────────────────────────────────────
    /// The service (or the Cloudflare edge in front of it) refused the
    /// request. Surfaces as HTTP 403 for IP blocks and 429 for plain throttling.
    #[error("Rate limited by remote service (HTTP {status})")]
    RateLimited { status: u16 },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Building the underlying HTTP client failed.
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Any other non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The login response carried no usable session.
    #[error("Login response did not contain a session {field}")]
    IncompleteSession { field: &'static str },
}

impl Error {
    /// Returns `true` if this error indicates auth has expired
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if the remote side is throttling us.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}
