use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the `dbhost-api` crate.
///
/// Covers every failure mode of the transport and session layer:
/// trust anchor construction, authentication, HTTP transport, response
/// classification, and the live event stream. `dbhost-core` wraps these
/// and the CLI maps them into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (bad credentials, locked account, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The login endpoint wants a second-factor code before issuing a token.
    #[error("Second-factor token required")]
    SecondFactorRequired,

    /// A session was built without a bearer token.
    #[error("Unknown oauth token -- run `dbhost logout`, then rerun your command")]
    MissingToken,

    /// An account-scoped call was made before an account was selected.
    #[error("No account selected -- run `dbhost config account <slug>`")]
    AccountNotSelected,

    // ── Trust anchor ────────────────────────────────────────────────
    /// A `CERTIFICATE` block in the bundle failed base64 or DER parsing.
    #[error("Malformed certificate in trust bundle: {0}")]
    MalformedCertificate(String),

    /// The bundle parsed, but contained no certificates at all.
    #[error("Trust bundle contains no certificates")]
    EmptyTrustAnchor,

    /// The configured bundle file does not exist.
    #[error("Trust bundle not found at {}", path.display())]
    TrustAnchorMissing { path: PathBuf },

    /// TLS configuration could not be assembled.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Transport ───────────────────────────────────────────────────
    /// The server's certificate does not chain to the pinned bundle.
    #[error("Server certificate rejected by the pinned trust bundle: {0}")]
    CertificateRejected(String),

    /// HTTP transport error (connection refused, handshake failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(reqwest::Error),

    /// A caller-supplied id is empty or a relative path step.
    #[error("Invalid identifier {0:?}")]
    InvalidIdentifier(String),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Classified responses ────────────────────────────────────────
    /// The server answered with its "resource absent" sentinel.
    #[error("Object not found")]
    NotFound,

    /// HTTP status >= 400, with the message from the error envelope.
    #[error("Response status {status} with error {message}")]
    Server { status: u16, message: String },

    // ── Stream ──────────────────────────────────────────────────────
    /// The duplex connection could not be established.
    #[error("Error initiating connection to websocket: {0}")]
    StreamConnect(String),

    /// Connected, but the subscription frame could not be written.
    #[error("Error subscribing to websocket feed: {0}")]
    StreamSubscribe(String),

    /// The connection failed after the subscription was sent.
    #[error("Websocket read failed: {0}")]
    Stream(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Interactive ─────────────────────────────────────────────────
    /// The operation was aborted before it completed.
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        match certificate_rejection(&err) {
            Some(reason) => Self::CertificateRejected(reason),
            None => Self::Transport(err),
        }
    }
}

/// The rustls verdict buried in `err`'s source chain, if the peer
/// certificate was refused.
///
/// TLS stacks usually hand rustls errors up wrapped in `io::Error`, whose
/// `source()` skips the wrapped value, so those are unwrapped by hand.
pub(crate) fn certificate_rejection(err: &(dyn std::error::Error + 'static)) -> Option<String> {
    let mut current = Some(err);
    while let Some(e) = current {
        let rustls_err = e.downcast_ref::<rustls::Error>().or_else(|| {
            e.downcast_ref::<std::io::Error>()
                .and_then(std::io::Error::get_ref)
                .and_then(|inner| inner.downcast_ref::<rustls::Error>())
        });
        if let Some(rustls::Error::InvalidCertificate(reason)) = rustls_err {
            return Some(format!("invalid peer certificate: {reason:?}"));
        }
        current = e.source();
    }
    None
}

impl Error {
    /// Returns `true` if the token is missing, rejected, or expired and a
    /// fresh login might resolve it.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. }
                | Self::MissingToken
                | Self::Server { status: 401, .. }
        )
    }

    /// Returns `true` if this is a "not found" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound | Self::Server { status: 404, .. })
    }

    /// Returns `true` if the failure happened below HTTP (connect, TLS, timeout).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::CertificateRejected(_)
                | Self::StreamConnect(_)
                | Self::Tls(_)
        )
    }

    /// Returns `true` if a request or stream connect ran out of time.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout(),
            Self::StreamConnect(message) => message.starts_with("timed out"),
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn unauthorized_server_error_is_auth_failure() {
        let err = Error::Server {
            status: 401,
            message: "invalid token".into(),
        };
        assert!(err.is_auth_failure());
        assert!(!err.is_not_found());
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn second_factor_is_not_a_generic_auth_failure() {
        assert!(!Error::SecondFactorRequired.is_auth_failure());
    }

    #[test]
    fn unknown_issuer_is_found_behind_io_wrapping() {
        let rustls_err =
            rustls::Error::InvalidCertificate(rustls::CertificateError::UnknownIssuer);
        let io = std::io::Error::new(std::io::ErrorKind::InvalidData, rustls_err);
        let reason = certificate_rejection(&io).unwrap();
        assert!(reason.contains("UnknownIssuer"), "{reason}");
    }

    #[test]
    fn other_tls_failures_are_not_rejections() {
        let io = std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            rustls::Error::DecryptError,
        );
        assert!(certificate_rejection(&io).is_none());

        let refused = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
        assert!(certificate_rejection(&refused).is_none());
    }

    #[test]
    fn sentinel_not_found_is_not_found() {
        assert!(Error::NotFound.is_not_found());
        assert_eq!(Error::NotFound.status(), None);
    }
}
