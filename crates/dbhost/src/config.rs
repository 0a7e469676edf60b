//! CLI configuration: the shared `dbhost_config` file plus flag overrides.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use dbhost_api::{TransportConfig, TrustAnchor};
use dbhost_config::{Config, CredentialStore};
use dbhost_core::SessionManager;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Everything a command needs to reach the API, resolved once per run.
///
/// Precedence is flag > `DBHOST_*` env > `config.toml` > defaults.
#[derive(Debug)]
pub struct Settings {
    pub config: Config,
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
    pub api_url: Url,
    pub stream_endpoint: Url,
    pub ca_bundle: PathBuf,
    pub timeout: Duration,
}

impl Settings {
    pub fn resolve(global: &GlobalOpts) -> Result<Self, CliError> {
        let config_dir = dbhost_config::config_dir();
        let config_path = dbhost_config::config_path();
        let mut config = dbhost_config::load_config_from(&config_path)?;

        if let Some(ref url) = global.api_url {
            config.set("api_url", url)?;
        }
        if let Some(secs) = global.timeout {
            config.set("timeout", &secs.to_string())?;
        }
        if let Some(ref path) = global.ca_bundle {
            config.ca_bundle = Some(path.clone());
        }

        Ok(Self {
            api_url: config.api_url()?,
            stream_endpoint: config.stream_endpoint()?,
            ca_bundle: config.ca_bundle_path(&config_dir),
            timeout: config.timeout(),
            config,
            config_dir,
            config_path,
        })
    }

    /// Load the pinned CA bundle and build the shared transport settings.
    pub fn transport(&self) -> Result<TransportConfig, CliError> {
        tracing::debug!(bundle = %self.ca_bundle.display(), "loading trust anchor");
        let anchor = TrustAnchor::from_file(&self.ca_bundle)?;
        Ok(TransportConfig::new(Arc::new(anchor)).with_timeout(self.timeout))
    }

    pub fn credential_store(&self) -> CredentialStore {
        CredentialStore::new(&self.config_dir)
    }

    pub fn session_manager(&self, transport: &TransportConfig) -> Result<SessionManager, CliError> {
        Ok(SessionManager::new(
            self.api_url.clone(),
            transport,
            self.credential_store(),
            self.config_path.clone(),
        )?)
    }
}
