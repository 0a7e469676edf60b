//! Local configuration for the dbhost CLI.
//!
//! One TOML file (`config.toml`) for endpoints, the pinned CA bundle path,
//! the request timeout, and the selected account; plus a separate
//! [`CredentialStore`] for the bearer token. Both live in the per-user
//! config directory, which `DBHOST_CONFIG_DIR` overrides.

pub mod credentials;

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub use credentials::{CredentialError, CredentialStore, PersistedCredential};

/// Environment variable that relocates the whole config directory.
pub const CONFIG_DIR_ENV: &str = "DBHOST_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";
const CA_BUNDLE_FILE: &str = "ca-bundle.pem";

/// Keys accepted by [`Config::set`] and the `DBHOST_*` overrides.
pub const KEYS: &[&str] = &["api_url", "stream_url", "ca_bundle", "timeout", "account"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown config key '{0}' (expected one of: api_url, stream_url, ca_bundle, timeout, account)")]
    UnknownKey(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config ──────────────────────────────────────────────────────────

/// Contents of `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// REST API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL of the streaming endpoint (`/ws` is appended).
    #[serde(default = "default_stream_url")]
    pub stream_url: String,

    /// PEM bundle the server certificate must chain to. Defaults to
    /// `ca-bundle.pem` next to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<PathBuf>,

    /// Request and connect timeout, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Slug of the selected account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            stream_url: default_stream_url(),
            ca_bundle: None,
            timeout: default_timeout(),
            account: None,
        }
    }
}

fn default_api_url() -> String {
    "https://api.dbhost.io".into()
}
fn default_stream_url() -> String {
    "wss://api.dbhost.io/mongo".into()
}
fn default_timeout() -> u64 {
    30
}

impl Config {
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        parse_url("api_url", &self.api_url, &["https", "http"])
    }

    /// The full stream endpoint, `{stream_url}/ws`.
    pub fn stream_endpoint(&self) -> Result<Url, ConfigError> {
        let base = self.stream_url.trim_end_matches('/');
        parse_url("stream_url", &format!("{base}/ws"), &["wss", "ws"])
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Configured CA bundle, or `ca-bundle.pem` in `config_dir`.
    pub fn ca_bundle_path(&self, config_dir: &Path) -> PathBuf {
        self.ca_bundle
            .clone()
            .unwrap_or_else(|| config_dir.join(CA_BUNDLE_FILE))
    }

    /// Set one key from its string form, validating the value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match Setting::parse(key, value)? {
            Setting::ApiUrl(v) => self.api_url = v,
            Setting::StreamUrl(v) => self.stream_url = v,
            Setting::CaBundle(v) => self.ca_bundle = v,
            Setting::Timeout(v) => self.timeout = v,
            Setting::Account(v) => self.account = v,
        }
        Ok(())
    }

    /// Check every layered value with the same rules as [`Config::set`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_url()?;
        self.stream_endpoint()?;
        check_timeout("timeout", self.timeout)?;
        Ok(())
    }
}

// ── Stored keys ─────────────────────────────────────────────────────

/// Only the keys written in `config.toml`, without defaults or `DBHOST_*`.
///
/// Every write goes through this layer, so an environment override never
/// ends up on disk.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoredConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

impl StoredConfig {
    /// Read the file alone. A missing file is empty.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Ok(Figment::from(Toml::file(path)).extract()?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        debug!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Set one key from its string form, validating the value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match Setting::parse(key, value)? {
            Setting::ApiUrl(v) => self.api_url = Some(v),
            Setting::StreamUrl(v) => self.stream_url = Some(v),
            Setting::CaBundle(v) => self.ca_bundle = v,
            Setting::Timeout(v) => self.timeout = Some(v),
            Setting::Account(v) => self.account = v,
        }
        Ok(())
    }
}

/// One validated `key = value` pair.
enum Setting {
    ApiUrl(String),
    StreamUrl(String),
    CaBundle(Option<PathBuf>),
    Timeout(u64),
    Account(Option<String>),
}

impl Setting {
    fn parse(key: &str, value: &str) -> Result<Self, ConfigError> {
        Ok(match key {
            "api_url" => {
                parse_url(key, value, &["https", "http"])?;
                Self::ApiUrl(value.to_owned())
            }
            "stream_url" => {
                parse_url(key, value, &["wss", "ws"])?;
                Self::StreamUrl(value.to_owned())
            }
            "ca_bundle" => Self::CaBundle((!value.is_empty()).then(|| PathBuf::from(value))),
            "timeout" => {
                let secs: u64 = value.parse().map_err(|_| ConfigError::Validation {
                    field: key.into(),
                    reason: format!("expected a whole number of seconds, got '{value}'"),
                })?;
                Self::Timeout(check_timeout(key, secs)?)
            }
            "account" => Self::Account((!value.is_empty()).then(|| value.to_owned())),
            other => return Err(ConfigError::UnknownKey(other.into())),
        })
    }
}

fn check_timeout(field: &str, secs: u64) -> Result<u64, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be at least 1 second".into(),
        });
    }
    Ok(secs)
}

fn parse_url(field: &str, value: &str, schemes: &[&str]) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("{e}: {value}"),
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("expected a {} URL, got '{value}'", schemes.join(" or ")),
        });
    }
    Ok(url)
}

// ── Paths ───────────────────────────────────────────────────────────

/// The per-user config directory.
///
/// `DBHOST_CONFIG_DIR` wins; otherwise platform conventions, falling back
/// to `$HOME/.config/dbhost`.
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    ProjectDirs::from("io", "dbhost", "dbhost")
        .map_or_else(dirs_fallback, |dirs| dirs.config_dir().to_path_buf())
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("dbhost");
    p
}

pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load config from `path` plus `DBHOST_*` environment.
///
/// A missing file is not an error; defaults fill every key. The merged
/// result is validated, so a zero timeout or a malformed URL from either
/// layer fails here rather than at the first request.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("DBHOST_").only(KEYS));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Saving ──────────────────────────────────────────────────────────

/// Apply `edit` to the keys stored at `path` and write them back.
///
/// Nothing is written when `edit` fails.
pub fn edit_config_at(
    path: &Path,
    edit: impl FnOnce(&mut StoredConfig) -> Result<(), ConfigError>,
) -> Result<(), ConfigError> {
    let mut stored = StoredConfig::load(path)?;
    edit(&mut stored)?;
    stored.save(path)
}

/// Forget the selected account, leaving the rest of the file untouched.
///
/// Does nothing when no config file exists.
pub fn clear_account_at(path: &Path) -> Result<(), ConfigError> {
    if !path.exists() {
        return Ok(());
    }
    let mut stored = StoredConfig::load(path)?;
    if stored.account.take().is_some() {
        stored.save(path)?;
    }
    Ok(())
}
