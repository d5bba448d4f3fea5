//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use tagwatch_config::ConfigError;
use tagwatch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const RATE_LIMITED: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Chipolo API: {message}")]
    #[diagnostic(
        code(tagwatch::connection_failed),
        help("Check your network connection, or raise --timeout.")
    )]
    ConnectionFailed { message: String },

    #[error("The Chipolo API is throttling this address ({detail})")]
    #[diagnostic(
        code(tagwatch::rate_limited),
        help(
            "Requests from this IP are blocked, usually for about 24 hours.\n\
             Wait it out and use a longer poll interval afterwards."
        )
    )]
    RateLimited { detail: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(tagwatch::auth_failed),
        help(
            "Verify your email and password.\n\
             Run: tagwatch login --force --profile {profile}"
        )
    )]
    AuthFailed { profile: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(tagwatch::no_credentials),
        help(
            "Log in once with: tagwatch login\n\
             Or set TAGWATCH_EMAIL and TAGWATCH_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    #[error("Not logged in")]
    #[diagnostic(code(tagwatch::not_logged_in), help("Run: tagwatch login"))]
    NotLoggedIn,

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(tagwatch::not_found),
        help("Run: tagwatch {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({code}): {message}")]
    #[diagnostic(code(tagwatch::api_error))]
    ApiError { code: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(tagwatch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(tagwatch::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: tagwatch config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(tagwatch::config))]
    Config(ConfigError),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::RateLimited { .. } => exit_code::RATE_LIMITED,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } | Self::NotLoggedIn => {
                exit_code::AUTH
            }
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Unauthorized { message: _ } => CliError::AuthFailed {
                profile: "current".into(),
            },

            CoreError::RateLimited { status } => CliError::RateLimited {
                detail: format!("HTTP {status}"),
            },

            CoreError::Transport { message } => CliError::ConnectionFailed { message },

            CoreError::MissingCredentials => CliError::NoCredentials {
                profile: "current".into(),
            },

            CoreError::NoSession => CliError::NotLoggedIn,

            CoreError::DeviceNotFound { identifier } => CliError::NotFound {
                resource_type: "device".into(),
                identifier,
                list_command: "devices".into(),
            },

            CoreError::Registry { device, message } => CliError::ApiError {
                code: "registry".into(),
                message: format!("{device}: {message}"),
            },

            CoreError::Persistence { message } => CliError::ApiError {
                code: "persistence".into(),
                message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Api { message, status } => CliError::ApiError {
                code: status.map_or_else(|| "unknown".into(), |s| s.to_string()),
                message,
            },

            CoreError::Internal(message) => CliError::ApiError {
                code: "internal".into(),
                message,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let auth: CliError = CoreError::Unauthorized {
            message: "expired".into(),
        }
        .into();
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let limited: CliError = CoreError::RateLimited { status: 403 }.into();
        assert_eq!(limited.exit_code(), exit_code::RATE_LIMITED);

        let missing: CliError = CoreError::NoSession.into();
        assert_eq!(missing.exit_code(), exit_code::AUTH);

        let gone: CliError = CoreError::DeviceNotFound {
            identifier: "p1".into(),
        }
        .into();
        assert_eq!(gone.exit_code(), exit_code::NOT_FOUND);
    }
}
