use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which vendor API surface a client talks to.
///
/// Chosen once from configuration; the two variants are never negotiated
/// at runtime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ApiVersion {
    /// Original PHP/servlet API with a `PHPSESSID` cookie session
    /// (`mastertherm.vip-it.cz`).
    #[default]
    #[strum(to_string = "legacy", serialize = "v1")]
    Legacy,
    /// REST API with bearer tokens, in service since 2022
    /// (`mastertherm.online`).
    #[strum(to_string = "new", serialize = "v2")]
    New,
}

impl ApiVersion {
    /// The production host for this API surface.
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Legacy => "https://mastertherm.vip-it.cz",
            Self::New => "https://mastertherm.online",
        }
    }
}

/// Login credentials for a MasterTherm account.
///
/// Immutable for the lifetime of a session; the password never leaves
/// its `SecretString` except when a request body is built.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}
