// ── Core error types ──
//
// Domain errors from tagwatch-core. Consumers never see HTTP status codes
// or JSON parse failures directly: the `From<tagwatch_api::Error>` impl
// folds transport-layer errors into the four failure classes the poller
// reacts to (unauthorized, rate-limited, transport, everything else).

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Recoverable by the engine ────────────────────────────────────
    /// Session token expired or rejected. Recovered by one refresh + retry.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Remote throttling. Recovered by the cooldown guard.
    #[error("Rate limited by remote service (HTTP {status})")]
    RateLimited { status: u16 },

    /// Network or server failure. Logged; retried on the next tick only.
    #[error("Transport error: {message}")]
    Transport { message: String },

    // ── Session / credentials ────────────────────────────────────────
    #[error("No stored email/password; cannot log in")]
    MissingCredentials,

    #[error("No active session; log in first")]
    NoSession,

    // ── Devices ──────────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Device registry rejected update for {device}: {message}")]
    Registry { device: String, message: String },

    // ── Persistence / configuration ──────────────────────────────────
    #[error("Failed to persist session: {message}")]
    Persistence { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Catch-all ────────────────────────────────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<tagwatch_api::Error> for CoreError {
    fn from(err: tagwatch_api::Error) -> Self {
        use tagwatch_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => CoreError::Unauthorized { message },
            ApiError::RateLimited { status } => CoreError::RateLimited { status },
            ApiError::Transport(e) => CoreError::Transport {
                message: e.to_string(),
            },
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::ClientSetup(message) => CoreError::Config { message },
            ApiError::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            ApiError::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            ApiError::IncompleteSession { field } => CoreError::Unauthorized {
                message: format!("login response did not contain a session {field}"),
            },
        }
    }
}
