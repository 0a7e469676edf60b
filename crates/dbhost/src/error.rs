//! CLI error types with miette diagnostics.
//!
//! Maps API, session, and config failures into user-facing errors with
//! actionable help text and a stable process exit code.

use miette::Diagnostic;
use thiserror::Error;

use dbhost_api::Error as ApiError;
use dbhost_config::{ConfigError, CredentialError};
use dbhost_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(dbhost::connection_failed),
        help(
            "Check your network connection and the configured api_url.\n\
             Try: dbhost config show"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS setup failed: {message}")]
    #[diagnostic(
        code(dbhost::tls_error),
        help(
            "Connections are pinned to the configured CA bundle.\n\
             Check that it contains the issuer of the API's certificate."
        )
    )]
    TlsError { message: String },

    #[error("Server certificate not trusted: {message}")]
    #[diagnostic(
        code(dbhost::untrusted_server),
        help(
            "The API's certificate does not chain to the pinned CA bundle.\n\
             If the API rotated its issuer, replace the bundle shown by: dbhost config show"
        )
    )]
    UntrustedServer { message: String },

    #[error("CA bundle unusable: {message}")]
    #[diagnostic(
        code(dbhost::trust_anchor),
        help(
            "Place the PEM bundle at {path}\n\
             or point at another file with: dbhost config set ca_bundle <path>"
        )
    )]
    TrustAnchor { message: String, path: String },

    #[error("Live feed failed: {message}")]
    #[diagnostic(code(dbhost::stream))]
    Stream { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(dbhost::auth_failed),
        help("Log in again with: dbhost logout && dbhost login")
    )]
    AuthFailed { message: String },

    #[error("No accounts are available to {email}")]
    #[diagnostic(
        code(dbhost::no_accounts),
        help("Ask an account owner to invite this email address.")
    )]
    NoAccounts { email: String },

    #[error("No account selected")]
    #[diagnostic(
        code(dbhost::no_account),
        help("Pick one with: dbhost config account <slug>")
    )]
    NoAccountSelected,

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(dbhost::not_found),
        help("Run: dbhost {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Object not found")]
    #[diagnostic(code(dbhost::not_found))]
    Missing,

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error (HTTP {status}): {message}")]
    #[diagnostic(code(dbhost::api_error))]
    ApiError { status: u16, message: String },

    #[error("Unexpected API response: {message}")]
    #[diagnostic(
        code(dbhost::unexpected_response),
        help("Run with -vv to see the request, or upgrade dbhost.")
    )]
    UnexpectedResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(dbhost::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(dbhost::config),
        help("Config directory: {dir}\nInspect with: dbhost config show")
    )]
    Config { message: String, dir: String },

    #[error("Credential store error: {message}")]
    #[diagnostic(
        code(dbhost::credentials),
        help("Reset stored credentials with: dbhost logout")
    )]
    Credentials { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Cancelled")]
    #[diagnostic(code(dbhost::cancelled))]
    Cancelled,

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(dbhost::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out")]
    #[diagnostic(
        code(dbhost::timeout),
        help("Increase the timeout with --timeout or: dbhost config set timeout <secs>")
    )]
    Timeout,

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. }
            | Self::TlsError { .. }
            | Self::UntrustedServer { .. }
            | Self::TrustAnchor { .. }
            | Self::Stream { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoAccounts { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::Missing => exit_code::NOT_FOUND,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::NoAccountSelected
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ApiError → CliError mapping ──────────────────────────────────────

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }

        match err {
            ApiError::Authentication { message } => Self::AuthFailed { message },
            ApiError::SecondFactorRequired => Self::AuthFailed {
                message: "a second-factor code is required".into(),
            },
            e @ ApiError::MissingToken => Self::AuthFailed {
                message: e.to_string(),
            },
            ApiError::AccountNotSelected => Self::NoAccountSelected,

            ApiError::MalformedCertificate(_) | ApiError::EmptyTrustAnchor => Self::TrustAnchor {
                message: err.to_string(),
                path: dbhost_config::config_dir()
                    .join("ca-bundle.pem")
                    .display()
                    .to_string(),
            },
            ApiError::TrustAnchorMissing { ref path } => Self::TrustAnchor {
                path: path.display().to_string(),
                message: err.to_string(),
            },
            ApiError::Tls(message) => Self::TlsError { message },
            ApiError::CertificateRejected(message) => Self::UntrustedServer { message },

            ApiError::Transport(e) => Self::ConnectionFailed {
                url: e
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string),
                source: Box::new(e),
            },
            ApiError::InvalidIdentifier(id) => Self::Validation {
                field: "identifier".into(),
                reason: format!("{id:?} cannot be used as an id"),
            },
            ApiError::InvalidUrl(e) => Self::Validation {
                field: "url".into(),
                reason: e.to_string(),
            },

            ApiError::NotFound => Self::Missing,
            ApiError::Server { status: 401, message } => Self::AuthFailed { message },
            ApiError::Server { status: 404, .. } => Self::Missing,
            ApiError::Server { status, message } => Self::ApiError { status, message },

            ApiError::StreamConnect(message)
            | ApiError::StreamSubscribe(message)
            | ApiError::Stream(message) => Self::Stream { message },

            ApiError::Deserialization { message, .. } => Self::UnexpectedResponse { message },
            ApiError::Cancelled => Self::Cancelled,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Api(e) => e.into(),
            CoreError::Credentials(e) => e.into(),
            CoreError::Config(e) => e.into(),
            CoreError::NoAccounts { email } => Self::NoAccounts { email },
            CoreError::UnknownAccount { slug } => Self::NotFound {
                resource_type: "account".into(),
                identifier: slug,
                list_command: "login".into(),
            },
            CoreError::Cancelled => Self::Cancelled,
            CoreError::Prompt(reason) => Self::Validation {
                field: "interactive".into(),
                reason,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::UnknownKey(_) => Self::Validation {
                field: "key".into(),
                reason: err.to_string(),
            },
            other => Self::Config {
                message: other.to_string(),
                dir: dbhost_config::config_dir().display().to_string(),
            },
        }
    }
}

impl From<CredentialError> for CliError {
    fn from(err: CredentialError) -> Self {
        Self::Credentials {
            message: err.to_string(),
        }
    }
}
