// Shared transport configuration for building HTTP and WebSocket clients.
//
// The REST client and the stream subscriber both take their TLS roots and
// timeout from here, so pinning is decided in exactly one place.

use std::sync::Arc;
use std::time::Duration;

use tokio_tungstenite::Connector;

use crate::error::Error;
use crate::trust::TrustAnchor;

/// User agent sent on every request and stream upgrade.
pub const USER_AGENT: &str = concat!("dbhost/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub trust: Arc<TrustAnchor>,
    pub timeout: Duration,
}

impl TransportConfig {
    pub fn new(trust: Arc<TrustAnchor>) -> Self {
        Self {
            trust,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` that trusts only the pinned anchor.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let tls = self.trust.client_config()?;

        reqwest::Client::builder()
            .use_preconfigured_tls(tls)
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// TLS connector for `wss://` upgrades, pinned to the same anchor.
    pub fn stream_connector(&self) -> Result<Connector, Error> {
        let tls = self.trust.client_config()?;
        Ok(Connector::Rustls(Arc::new(tls)))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn transport() -> TransportConfig {
        let anchor = TrustAnchor::from_pem(include_bytes!("../tests/fixtures/root.pem")).unwrap();
        TransportConfig::new(Arc::new(anchor))
    }

    #[test]
    fn default_timeout_is_thirty_seconds() {
        assert_eq!(transport().timeout, Duration::from_secs(30));
    }

    #[test]
    fn timeout_override() {
        let config = transport().with_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn builds_pinned_clients() {
        let config = transport();
        config.build_client().unwrap();
        assert!(matches!(config.stream_connector().unwrap(), Connector::Rustls(_)));
    }

    #[test]
    fn user_agent_names_the_application() {
        assert!(USER_AGENT.starts_with("dbhost/"));
    }
}
