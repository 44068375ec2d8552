// Async HTTP client for the MasterTherm REST API (mastertherm.online).
//
// Base path: /api/v1/
// Auth: OAuth-style password grant, then `Authorization: Bearer <token>`

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::auth::Credentials;
use crate::error::Error;
use crate::models::{
    self, LoginResponse, Module, PumpData, RawInfo, Unit, UpdateTime, scalar_to_string,
};
use crate::transport::{self, TransportConfig};

const CLIENT_ID: &str = "mastertherm";

// ── Wire shapes ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    role: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct ModulesResponse {
    #[serde(default)]
    modules: Vec<RestModule>,
}

#[derive(Deserialize)]
struct RestModule {
    id: Value,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    units: Vec<RestUnit>,
}

#[derive(Deserialize)]
struct RestUnit {
    id: Value,
    #[serde(default)]
    name: Option<String>,
}

impl RestModule {
    fn into_module(self) -> Option<Module> {
        let id = scalar_to_string(&self.id)?;
        let units = self
            .units
            .into_iter()
            .filter_map(|unit| {
                Some(Unit {
                    id: scalar_to_string(&unit.id)?,
                    name: unit.name.unwrap_or_default(),
                })
            })
            .collect();
        Some(Module {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            units,
        })
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the MasterTherm REST API.
///
/// Bearer tokens are passed per call; the client itself holds no session.
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/api/v1/{path}"))?)
    }

    async fn get_with_params(
        &self,
        path: &str,
        token: &SecretString,
        params: &[(&str, &str)],
    ) -> Result<String, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self
            .http
            .get(url)
            .bearer_auth(token.expose_secret())
            .query(params)
            .send()
            .await?;
        transport::session_body(resp).await
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Exchange credentials for a bearer token, then list modules.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, Error> {
        let url = self.url("token")?;
        debug!("requesting token at {url}");

        let resp = self
            .http
            .post(url)
            .form(&[
                ("grant_type", "password"),
                ("client_id", CLIENT_ID),
                ("username", credentials.username.as_str()),
                ("password", credentials.password.expose_secret()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNAUTHORIZED
        {
            let message = serde_json::from_str::<TokenResponse>(&body)
                .ok()
                .and_then(|t| t.error_description)
                .unwrap_or_else(|| format!("login rejected (HTTP {status})"));
            return Err(Error::Authentication { message });
        }
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::malformed(&e, body.clone()))?;

        if let Some(err) = parsed.error {
            return Err(Error::Authentication {
                message: parsed
                    .error_description
                    .or_else(|| scalar_to_string(&err))
                    .unwrap_or_else(|| "login rejected".into()),
            });
        }

        let token = parsed
            .access_token
            .map(SecretString::from)
            .ok_or_else(|| Error::Authentication {
                message: "token response carried no access_token".into(),
            })?;

        let modules = self.modules(&token).await?;

        debug!(modules = modules.len(), "login successful");
        Ok(LoginResponse {
            token,
            expires_at: None,
            role: parsed.role.as_ref().and_then(scalar_to_string),
            modules,
        })
    }

    /// List the modules (and their units) visible to this account.
    pub async fn modules(&self, token: &SecretString) -> Result<Vec<Module>, Error> {
        let body = self.get_with_params("modules", token, &[]).await?;
        let parsed: ModulesResponse =
            serde_json::from_str(&body).map_err(|e| Error::malformed(&e, body.clone()))?;
        Ok(parsed
            .modules
            .into_iter()
            .filter_map(RestModule::into_module)
            .collect())
    }

    // ── Pump endpoints ───────────────────────────────────────────────

    pub async fn device_info(
        &self,
        token: &SecretString,
        module_id: &str,
        unit_id: &str,
    ) -> Result<RawInfo, Error> {
        let body = self
            .get_with_params(
                "pumpinfo",
                token,
                &[("moduleid", module_id), ("unitid", unit_id)],
            )
            .await?;
        models::parse_info_body(&body)
    }

    pub async fn device_data(
        &self,
        token: &SecretString,
        module_id: &str,
        unit_id: &str,
        last_update_time: Option<UpdateTime>,
    ) -> Result<PumpData, Error> {
        let since = last_update_time.unwrap_or(UpdateTime::FULL).to_string();
        let body = self
            .get_with_params(
                "pumpdata",
                token,
                &[
                    ("moduleId", module_id),
                    ("deviceId", unit_id),
                    ("lastUpdateTime", &since),
                    ("messageId", "1"),
                    ("fullRange", "true"),
                    ("errorResponse", "true"),
                ],
            )
            .await?;
        models::parse_data_body(&body)
    }
}
