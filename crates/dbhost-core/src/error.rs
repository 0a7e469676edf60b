// ── Core error types ──
//
// Wraps the API, credential, and config errors unchanged so the CLI can
// still tell an expired token from a refused connection, and adds the few
// failures that only exist at the session level.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Api(#[from] dbhost_api::Error),

    #[error(transparent)]
    Credentials(#[from] dbhost_config::CredentialError),

    #[error(transparent)]
    Config(#[from] dbhost_config::ConfigError),

    #[error("No accounts are available to {email}")]
    NoAccounts { email: String },

    #[error("Account '{slug}' is not available to this login")]
    UnknownAccount { slug: String },

    #[error("Input cancelled")]
    Cancelled,

    #[error("Could not read input: {0}")]
    Prompt(String),
}

impl CoreError {
    /// The user aborted a prompt or an in-flight operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Api(dbhost_api::Error::Cancelled)
        )
    }

    /// The underlying API error, if this wraps one.
    pub fn api(&self) -> Option<&dbhost_api::Error> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }
}
