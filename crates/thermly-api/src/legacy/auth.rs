// Legacy API authentication
//
// Form login with a SHA-1 hashed password. The session token is the
// `PHPSESSID` cookie; the response body carries the module list.

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::auth::Credentials;
use crate::error::Error;
use crate::legacy::client::{LOGIN_PATH, LegacyClient, SESSION_COOKIE};
use crate::models::{LoginResponse, Module, Unit, scalar_to_i64, scalar_to_string};

/// Lifetime assumed when the session cookie carries no expiry.
const DEFAULT_SESSION_LIFETIME_SECS: i64 = 3600;

#[derive(Deserialize)]
struct LoginBody {
    #[serde(default)]
    returncode: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    role: Option<Value>,
    #[serde(default)]
    modules: Vec<LegacyModule>,
}

#[derive(Deserialize)]
struct LegacyModule {
    id: Value,
    #[serde(default)]
    module_name: Option<String>,
    #[serde(default)]
    config: Vec<LegacyUnit>,
}

#[derive(Deserialize)]
struct LegacyUnit {
    mb_addr: Value,
    #[serde(default)]
    mb_name: Option<String>,
}

impl LegacyModule {
    /// Modules or units without a usable id are dropped.
    fn into_module(self) -> Option<Module> {
        let id = scalar_to_string(&self.id)?;
        let units = self
            .config
            .into_iter()
            .filter_map(|unit| {
                Some(Unit {
                    id: scalar_to_string(&unit.mb_addr)?,
                    name: unit.mb_name.unwrap_or_default(),
                })
            })
            .collect();
        Some(Module {
            name: self.module_name.unwrap_or_else(|| id.clone()),
            id,
            units,
        })
    }
}

/// Lowercase hex SHA-1 of the password, as the login form expects.
fn hash_password(password: &SecretString) -> String {
    hex::encode(Sha1::digest(password.expose_secret().as_bytes()))
}

impl LegacyClient {
    /// Log in with username/password.
    ///
    /// On success returns the `PHPSESSID` value as the session token,
    /// its expiry, and the account's modules.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, Error> {
        let url = self.endpoint(LOGIN_PATH)?;
        debug!("logging in at {}", url);

        let upwd = hash_password(&credentials.password);
        let logged_in_at = Utc::now();

        let resp = self
            .http()
            .post(url)
            .form(&[
                ("login", "login"),
                ("uname", credentials.username.as_str()),
                ("upwd", upwd.as_str()),
                ("language", "en"),
            ])
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        // Cookies must be read before the body consumes the response.
        let session = resp
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .map(|c| {
                let expires_at = c
                    .expires()
                    .map(DateTime::<Utc>::from)
                    .or_else(|| {
                        c.max_age()
                            .and_then(|age| TimeDelta::from_std(age).ok())
                            .map(|age| logged_in_at + age)
                    });
                (c.value().to_owned(), expires_at)
            });

        let body = resp.text().await.map_err(Error::Transport)?;
        let parsed: LoginBody =
            serde_json::from_str(&body).map_err(|e| Error::malformed(&e, body.clone()))?;

        let code = parsed.returncode.as_ref().and_then(scalar_to_i64).unwrap_or(0);
        if code != 0 {
            return Err(Error::Authentication {
                message: parsed
                    .message
                    .unwrap_or_else(|| format!("login rejected (returncode {code})")),
            });
        }

        let Some((token, expires_at)) = session else {
            return Err(Error::Authentication {
                message: format!("login response did not set {SESSION_COOKIE}"),
            });
        };

        let modules: Vec<Module> = parsed
            .modules
            .into_iter()
            .filter_map(LegacyModule::into_module)
            .collect();

        debug!(modules = modules.len(), "login successful");
        Ok(LoginResponse {
            token: SecretString::from(token),
            expires_at: Some(expires_at.unwrap_or_else(|| {
                logged_in_at + TimeDelta::seconds(DEFAULT_SESSION_LIFETIME_SECS)
            })),
            role: parsed.role.as_ref().and_then(scalar_to_string),
            modules,
        })
    }
}
