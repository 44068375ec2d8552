//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use thermly_config::ConfigError;
use thermly_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the MasterTherm service [{code}]: {message}")]
    #[diagnostic(
        code(thermly::connection_failed),
        help(
            "Check your network connection and the selected API version.\n\
             Accounts created before 2022 use --api-version legacy, newer ones --api-version new."
        )
    )]
    ConnectionFailed { code: String, message: String },

    #[error("TLS handshake failed: {message}")]
    #[diagnostic(
        code(thermly::tls_error),
        help("Configure ca_cert in your profile, or use --insecure (-k) behind an intercepting proxy.")
    )]
    TlsError { message: String },

    #[error("Request timed out: {message}")]
    #[diagnostic(
        code(thermly::timeout),
        help("Increase the timeout with --timeout or try again later.")
    )]
    Timeout { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(thermly::auth_failed),
        help(
            "Verify your username and password.\n\
             Run: thermly config set-password"
        )
    )]
    AuthFailed { message: String },

    #[error("Session rejected by the server: {message}")]
    #[diagnostic(
        code(thermly::session_rejected),
        help("Logging in again did not help; the service may be unavailable for this account.")
    )]
    SessionRejected { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(thermly::no_credentials),
        help(
            "Configure credentials with: thermly config init\n\
             Or set THERMLY_USERNAME and THERMLY_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(thermly::not_found),
        help("Run: thermly devices to see available devices")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(thermly::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(thermly::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: thermly config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(thermly::no_config),
        help(
            "Create one with: thermly config init\n\
             Or pass --username (password is prompted for).\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(thermly::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::SessionRejected { .. } | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::ProfileNotFound { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Authentication { message } => CliError::AuthFailed { message },

            CoreError::TokenInvalid { message } => CliError::SessionRejected { message },

            CoreError::Connection { code, message } => match code.as_str() {
                "timeout" => CliError::Timeout { message },
                "tls" => CliError::TlsError { message },
                _ => CliError::ConnectionFailed { code, message },
            },

            CoreError::NotConnected => CliError::ConnectionFailed {
                code: "not_connected".into(),
                message: "no session with the service".into(),
            },

            CoreError::NotFound { entity, identifier } => CliError::NotFound {
                resource_type: entity,
                identifier,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "configuration".into(),
                reason: message,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(Box::new(other)),
        }
    }
}
