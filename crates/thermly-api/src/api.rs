// The capability both vendor APIs provide, and a concrete dispatcher.

use std::future::Future;

use secrecy::SecretString;
use url::Url;

use crate::auth::{ApiVersion, Credentials};
use crate::error::Error;
use crate::legacy::LegacyClient;
use crate::models::{LoginResponse, PumpData, RawInfo, UpdateTime};
use crate::rest::RestClient;
use crate::transport::TransportConfig;

/// Login, pump info, and pump data against one vendor API surface.
///
/// Implementations hold no session state; the token is passed on every
/// call so the caller decides when to log in again.
pub trait PumpApi: Send + Sync {
    fn api_version(&self) -> ApiVersion;

    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<LoginResponse, Error>> + Send;

    fn device_info(
        &self,
        token: &SecretString,
        module_id: &str,
        unit_id: &str,
    ) -> impl Future<Output = Result<RawInfo, Error>> + Send;

    /// `last_update_time` of `None` asks for a full load.
    fn device_data(
        &self,
        token: &SecretString,
        module_id: &str,
        unit_id: &str,
        last_update_time: Option<UpdateTime>,
    ) -> impl Future<Output = Result<PumpData, Error>> + Send;
}

impl PumpApi for LegacyClient {
    fn api_version(&self) -> ApiVersion {
        ApiVersion::Legacy
    }

    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, Error> {
        LegacyClient::login(self, credentials).await
    }

    async fn device_info(
        &self,
        token: &SecretString,
        module_id: &str,
        unit_id: &str,
    ) -> Result<RawInfo, Error> {
        LegacyClient::device_info(self, token, module_id, unit_id).await
    }

    async fn device_data(
        &self,
        token: &SecretString,
        module_id: &str,
        unit_id: &str,
        last_update_time: Option<UpdateTime>,
    ) -> Result<PumpData, Error> {
        LegacyClient::device_data(self, token, module_id, unit_id, last_update_time).await
    }
}

impl PumpApi for RestClient {
    fn api_version(&self) -> ApiVersion {
        ApiVersion::New
    }

    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, Error> {
        RestClient::login(self, credentials).await
    }

    async fn device_info(
        &self,
        token: &SecretString,
        module_id: &str,
        unit_id: &str,
    ) -> Result<RawInfo, Error> {
        RestClient::device_info(self, token, module_id, unit_id).await
    }

    async fn device_data(
        &self,
        token: &SecretString,
        module_id: &str,
        unit_id: &str,
        last_update_time: Option<UpdateTime>,
    ) -> Result<PumpData, Error> {
        RestClient::device_data(self, token, module_id, unit_id, last_update_time).await
    }
}

/// The API surface selected by configuration.
pub enum ApiClient {
    Legacy(LegacyClient),
    Rest(RestClient),
}

impl ApiClient {
    /// Build the client for `api_version`, defaulting to its production
    /// host when no `base_url` is given.
    pub fn new(
        api_version: ApiVersion,
        base_url: Option<Url>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = match base_url {
            Some(url) => url,
            None => Url::parse(api_version.default_base_url())?,
        };
        Ok(match api_version {
            ApiVersion::Legacy => Self::Legacy(LegacyClient::new(base_url, transport)?),
            ApiVersion::New => Self::Rest(RestClient::new(base_url, transport)?),
        })
    }

    pub fn base_url(&self) -> &Url {
        match self {
            Self::Legacy(c) => c.base_url(),
            Self::Rest(c) => c.base_url(),
        }
    }
}

impl PumpApi for ApiClient {
    fn api_version(&self) -> ApiVersion {
        match self {
            Self::Legacy(c) => c.api_version(),
            Self::Rest(c) => c.api_version(),
        }
    }

    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, Error> {
        match self {
            Self::Legacy(c) => c.login(credentials).await,
            Self::Rest(c) => c.login(credentials).await,
        }
    }

    async fn device_info(
        &self,
        token: &SecretString,
        module_id: &str,
        unit_id: &str,
    ) -> Result<RawInfo, Error> {
        match self {
            Self::Legacy(c) => c.device_info(token, module_id, unit_id).await,
            Self::Rest(c) => c.device_info(token, module_id, unit_id).await,
        }
    }

    async fn device_data(
        &self,
        token: &SecretString,
        module_id: &str,
        unit_id: &str,
        last_update_time: Option<UpdateTime>,
    ) -> Result<PumpData, Error> {
        match self {
            Self::Legacy(c) => {
                c.device_data(token, module_id, unit_id, last_update_time)
                    .await
            }
            Self::Rest(c) => {
                c.device_data(token, module_id, unit_id, last_update_time)
                    .await
            }
        }
    }
}
