// ── Runtime connection configuration ──
//
// Describes *how* to reach the MasterTherm service and how aggressively to
// poll it. Carries credentials but never touches disk; the CLI builds a
// `ControllerConfig` and hands it in.

use std::time::Duration;

use thermly_api::{ApiVersion, Credentials, TlsMode, TransportConfig};
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (intercepting proxies, test servers).
    DangerAcceptInvalid,
}

/// Configuration for one account on one API surface.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Which vendor API to talk to. Fixed for the controller's lifetime.
    pub api_version: ApiVersion,
    /// Override for the service root; `None` uses the version's production host.
    pub base_url: Option<Url>,
    pub credentials: Credentials,
    pub tls: TlsVerification,
    /// Per-request timeout, enforced by the HTTP client.
    pub timeout: Duration,
    /// Devices fetched concurrently during a refresh. 1 = sequential.
    pub max_concurrent_fetches: usize,
    /// Force a full data load once the last one is older than this,
    /// even when a delta was requested. `None` disables.
    pub full_refresh_interval: Option<Duration>,
    /// Subtracted from the stored update time when asking for a delta, to
    /// cover clock skew between the pump and the service.
    pub data_offset: Duration,
}

impl ControllerConfig {
    pub fn new(api_version: ApiVersion, credentials: Credentials) -> Self {
        Self {
            api_version,
            base_url: None,
            credentials,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            max_concurrent_fetches: 1,
            full_refresh_interval: Some(Duration::from_secs(15 * 60)),
            data_offset: Duration::ZERO,
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_poll_sequentially_with_periodic_full_loads() {
        let config = ControllerConfig::new(ApiVersion::Legacy, Credentials::new("u", "p"));
        assert_eq!(config.max_concurrent_fetches, 1);
        assert_eq!(config.full_refresh_interval, Some(Duration::from_secs(900)));
        assert_eq!(config.data_offset, Duration::ZERO);
        assert!(config.base_url.is_none());
    }

    #[test]
    fn insecure_tls_maps_to_transport() {
        let mut config = ControllerConfig::new(ApiVersion::New, Credentials::new("u", "p"));
        config.tls = TlsVerification::DangerAcceptInvalid;
        assert!(matches!(
            config.transport().tls,
            TlsMode::DangerAcceptInvalid
        ));
    }
}
