use thiserror::Error;

/// Top-level error type for the `thermly-api` crate.
///
/// Covers every failure mode of both vendor API surfaces. Rejected
/// credentials and a server-side session loss are kept apart from
/// transport and protocol failures so callers can decide whether
/// logging in again is meaningful. `thermly-core` maps these into its
/// own error kinds.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected (wrong user name or password).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The session token was rejected mid-operation (expired or revoked).
    #[error("Session token rejected: {message}")]
    TokenInvalid { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The server answered with a status the protocol does not expect.
    #[error("Unexpected HTTP status {status}: {message}")]
    Http { status: u16, message: String },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Protocol ────────────────────────────────────────────────────
    /// The vendor API reported a failure through its own return code
    /// (`returncode` on info calls, `error.errorId` on data calls).
    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the server signalled that the session is no
    /// longer valid and logging in again may resolve it.
    pub fn is_token_invalid(&self) -> bool {
        matches!(self, Self::TokenInvalid { .. })
    }

    /// Returns `true` if this is a transient transport error.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Build a `Deserialization` error carrying a short body preview.
    pub(crate) fn malformed(err: &serde_json::Error, body: String) -> Self {
        let preview: String = body.chars().take(200).collect();
        Self::Deserialization {
            message: format!("{err} (body preview: {preview:?})"),
            body,
        }
    }
}
