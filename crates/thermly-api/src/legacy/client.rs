// Legacy API HTTP client
//
// Wraps `reqwest::Client` with the form-encoded POST conventions of the
// original MasterTherm web service. The session travels as a `PHPSESSID`
// cookie that is attached explicitly per request, so one client can serve
// any number of sessions without a shared cookie jar.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{self, PumpData, RawInfo, UpdateTime};
use crate::transport::{self, TransportConfig};

pub(crate) const LOGIN_PATH: &str = "/plugins/mastertherm_login/client_login.php";
const PUMPINFO_PATH: &str = "/plugins/get_pumpinfo/get_pumpinfo.php";
const PUMPDATA_PATH: &str = "/mt/PassiveVizualizationServlet";

/// Name of the session cookie issued by the login endpoint.
pub(crate) const SESSION_COOKIE: &str = "PHPSESSID";

/// Raw HTTP client for the legacy MasterTherm API.
pub struct LegacyClient {
    http: reqwest::Client,
    base_url: Url,
}

impl LegacyClient {
    /// Create a new legacy client from a `TransportConfig`.
    ///
    /// The `base_url` is the service root (e.g. `https://mastertherm.vip-it.cz`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a legacy client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The underlying HTTP client (for the login flow).
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a full URL for an endpoint path.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }

    /// POST a form with the session cookie attached and return the body.
    async fn post_session_form(
        &self,
        path: &str,
        token: &SecretString,
        form: &[(&str, &str)],
    ) -> Result<String, Error> {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .header(
                reqwest::header::COOKIE,
                format!("{SESSION_COOKIE}={}", token.expose_secret()),
            )
            .form(form)
            .send()
            .await
            .map_err(Error::Transport)?;

        transport::session_body(resp).await
    }

    /// Fetch the raw device info map for one unit.
    pub async fn device_info(
        &self,
        token: &SecretString,
        module_id: &str,
        unit_id: &str,
    ) -> Result<RawInfo, Error> {
        let body = self
            .post_session_form(
                PUMPINFO_PATH,
                token,
                &[
                    ("moduleid", module_id),
                    ("unitid", unit_id),
                    ("application", "android"),
                ],
            )
            .await?;

        models::parse_info_body(&body)
    }

    /// Fetch register data for one unit.
    ///
    /// `None` (or [`UpdateTime::FULL`]) requests every register; a timestamp
    /// requests only the registers changed since then.
    pub async fn device_data(
        &self,
        token: &SecretString,
        module_id: &str,
        unit_id: &str,
        last_update_time: Option<UpdateTime>,
    ) -> Result<PumpData, Error> {
        let since = last_update_time.unwrap_or(UpdateTime::FULL).to_string();
        let body = self
            .post_session_form(
                PUMPDATA_PATH,
                token,
                &[
                    ("moduleId", module_id),
                    ("deviceId", unit_id),
                    ("fullRange", "true"),
                    ("lastUpdateTime", &since),
                    ("messageId", "1"),
                    ("errorResponse", "true"),
                ],
            )
            .await?;

        models::parse_data_body(&body)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = LegacyClient::with_client(
            reqwest::Client::new(),
            Url::parse("https://mastertherm.vip-it.cz/").unwrap(),
        );
        assert_eq!(
            client.endpoint(PUMPDATA_PATH).unwrap().as_str(),
            "https://mastertherm.vip-it.cz/mt/PassiveVizualizationServlet"
        );
    }
}
