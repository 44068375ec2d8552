// ── Session manager ──
//
// Owns the credentials and the current session for one API surface. All
// device fetches share the session; a `RefreshCycle` gates reauthentication
// so a burst of token-invalid failures inside one refresh produces a single
// login.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use thermly_api::{ApiClient, ApiVersion, Credentials, Module, PumpApi};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::CoreError;

/// An authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    pub api_version: ApiVersion,
    pub token: SecretString,
    /// Legacy only; the REST API enforces expiry server-side.
    pub expires_at: Option<DateTime<Utc>>,
    pub role: Option<String>,
}

impl Session {
    /// Legacy sessions are valid until their expiry; REST sessions are
    /// assumed valid until a request is rejected.
    pub fn is_valid(&self) -> bool {
        self.expires_at.is_none_or(|at| Utc::now() < at)
    }
}

/// Result of a login: the new session plus the account's modules.
#[derive(Debug, Clone)]
pub struct Authentication {
    pub session: Session,
    pub modules: Vec<Module>,
}

/// Holds the API client, credentials, and at most one live session.
pub struct SessionManager<A: PumpApi = ApiClient> {
    api: A,
    credentials: Credentials,
    session: Mutex<Option<Session>>,
}

impl<A: PumpApi> SessionManager<A> {
    pub fn new(api: A, credentials: Credentials) -> Self {
        Self {
            api,
            credentials,
            session: Mutex::new(None),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn api_version(&self) -> ApiVersion {
        self.api.api_version()
    }

    /// Log in and store the resulting session, replacing any previous one.
    pub async fn authenticate(&self) -> Result<Authentication, CoreError> {
        let mut guard = self.session.lock().await;
        let auth = self.login().await?;
        *guard = Some(auth.session.clone());
        Ok(auth)
    }

    /// The current token, logging in first when there is no usable session.
    ///
    /// Concurrent callers queue on the session lock, so only the first
    /// performs the login.
    pub async fn token(&self) -> Result<SecretString, CoreError> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref().filter(|s| s.is_valid()) {
            return Ok(session.token.clone());
        }
        if guard.is_some() {
            debug!("session expired, logging in again");
        }
        let auth = self.login().await?;
        let token = auth.session.token.clone();
        *guard = Some(auth.session);
        Ok(token)
    }

    /// Replace a token the server rejected.
    ///
    /// When another caller already replaced `stale`, the newer token is
    /// returned without a second login.
    pub async fn reauthenticate(&self, stale: &SecretString) -> Result<SecretString, CoreError> {
        let mut guard = self.session.lock().await;
        if let Some(current) = guard.as_ref() {
            if current.token.expose_secret() != stale.expose_secret() && current.is_valid() {
                debug!("token already refreshed by another fetch");
                return Ok(current.token.clone());
            }
        }

        warn!(api = %self.api.api_version(), "session token rejected, logging in again");
        *guard = None;
        let auth = self.login().await?;
        let token = auth.session.token.clone();
        *guard = Some(auth.session);
        Ok(token)
    }

    /// Whether a session exists and has not passed its expiry.
    pub async fn is_valid(&self) -> bool {
        self.session.lock().await.as_ref().is_some_and(Session::is_valid)
    }

    /// Drop the current session; the next `token()` logs in again.
    pub async fn invalidate(&self) {
        *self.session.lock().await = None;
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    async fn login(&self) -> Result<Authentication, CoreError> {
        let login = self.api.login(&self.credentials).await?;
        info!(
            api = %self.api.api_version(),
            modules = login.modules.len(),
            "authenticated"
        );
        Ok(Authentication {
            session: Session {
                api_version: self.api.api_version(),
                token: login.token,
                expires_at: login.expires_at,
                role: login.role,
            },
            modules: login.modules,
        })
    }
}

// ── Refresh cycle gate ───────────────────────────────────────────────

enum ReauthState {
    Pending,
    Done(SecretString),
    Failed(CoreError),
}

/// Per-refresh reauthentication gate.
///
/// The first fetch that sees a rejected token logs in again; fetches that
/// fail afterwards reuse the outcome instead of logging in themselves.
pub(crate) struct RefreshCycle {
    reauth: Mutex<ReauthState>,
}

impl RefreshCycle {
    pub(crate) fn new() -> Self {
        Self {
            reauth: Mutex::new(ReauthState::Pending),
        }
    }

    /// Run `op` with the current token; on a token-invalid failure,
    /// reauthenticate (once per cycle) and run it exactly once more.
    pub(crate) async fn with_reauth<A, T, F, Fut>(
        &self,
        sessions: &SessionManager<A>,
        op: F,
    ) -> Result<T, CoreError>
    where
        A: PumpApi,
        F: Fn(SecretString) -> Fut,
        Fut: Future<Output = Result<T, thermly_api::Error>>,
    {
        let token = sessions.token().await?;
        match op(token.clone()).await {
            Ok(value) => Ok(value),
            Err(err) if err.is_token_invalid() => {
                let fresh = self.fresh_token(sessions, &token).await?;
                op(fresh).await.map_err(CoreError::from)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn fresh_token<A: PumpApi>(
        &self,
        sessions: &SessionManager<A>,
        stale: &SecretString,
    ) -> Result<SecretString, CoreError> {
        let mut state = self.reauth.lock().await;
        match &*state {
            ReauthState::Done(token) => Ok(token.clone()),
            ReauthState::Failed(err) => Err(err.clone()),
            ReauthState::Pending => match sessions.reauthenticate(stale).await {
                Ok(token) => {
                    *state = ReauthState::Done(token.clone());
                    Ok(token)
                }
                Err(err) => {
                    *state = ReauthState::Failed(err.clone());
                    Err(err)
                }
            },
        }
    }
}
