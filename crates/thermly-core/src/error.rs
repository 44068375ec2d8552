// ── Core error types ──
//
// User-facing errors from thermly-core. Consumers never match on HTTP
// status codes or JSON parse failures directly; the `From<thermly_api::Error>`
// impl folds transport-layer errors into the four kinds callers act on.

use thiserror::Error;

/// Unified error type for the core crate.
///
/// `Clone` so a single failed reauthentication can be handed to every
/// fetch that was waiting on it.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    /// Credentials explicitly rejected by the server.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Session expired or rejected mid-operation, and logging in again
    /// did not help.
    #[error("Session token rejected: {message}")]
    TokenInvalid { message: String },

    // ── Connection errors ────────────────────────────────────────────
    /// Transport failure, malformed response, unexpected status, or a
    /// vendor error code.
    #[error("Connection error [{code}]: {message}")]
    Connection { code: String, message: String },

    /// An operation that needs a session ran before `connect()`.
    #[error("Not connected -- call connect() first")]
    NotConnected,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("{entity} not found: {identifier}")]
    NotFound { entity: String, identifier: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Stable machine-readable code for this failure.
    pub fn code(&self) -> &str {
        match self {
            Self::Authentication { .. } => "authentication",
            Self::TokenInvalid { .. } => "token_invalid",
            Self::Connection { code, .. } => code,
            Self::NotConnected => "not_connected",
            Self::NotFound { .. } => "not_found",
            Self::Config { .. } => "config",
        }
    }

    pub fn is_token_invalid(&self) -> bool {
        matches!(self, Self::TokenInvalid { .. })
    }

    pub(crate) fn device_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Device".into(),
            identifier: identifier.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<thermly_api::Error> for CoreError {
    fn from(err: thermly_api::Error) -> Self {
        use thermly_api::Error as Api;

        match err {
            Api::Authentication { message } => CoreError::Authentication { message },
            Api::TokenInvalid { message } => CoreError::TokenInvalid { message },
            Api::Transport(ref e) => CoreError::Connection {
                code: if e.is_timeout() {
                    "timeout".into()
                } else {
                    "transport".into()
                },
                message: e.to_string(),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Http { status, message } => CoreError::Connection {
                code: status.to_string(),
                message,
            },
            Api::Tls(message) => CoreError::Connection {
                code: "tls".into(),
                message,
            },
            Api::Api { code, message } => CoreError::Connection { code, message },
            Api::Deserialization { message, body: _ } => CoreError::Connection {
                code: "malformed_response".into(),
                message,
            },
        }
    }
}
