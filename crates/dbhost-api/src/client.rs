// Request dispatcher
//
// Wraps `reqwest::Client` with bearer auth, the application user agent,
// and response classification. Resource modules (accounts, deployments,
// backups, ...) are inherent methods in separate files so this module
// stays focused on transport mechanics.

use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use reqwest::header::{HeaderMap, USER_AGENT as USER_AGENT_HEADER};
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use url::Url;

use crate::auth::Session;
use crate::error::Error;
use crate::transport::{TransportConfig, USER_AGENT};

/// Body the server sends instead of a 404 for absent resources.
pub const NOT_FOUND_SENTINEL: &[u8] = b"NOT FOUND";

/// Set to `true` when the user agent that reached the API is slated for removal.
pub const DEPRECATED_HEADER: &str = "X-User-Agent-Deprecated";

/// Human-readable explanation accompanying [`DEPRECATED_HEADER`].
pub const DEPRECATION_MESSAGE_HEADER: &str = "X-User-Agent-Deprecation-Message";

/// Leading path segment for calls proxied through to the database layer.
const PROXY_SEGMENT: &str = "mongo";

/// Single-field error envelope: `{"Error": "..."}`.
#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(rename = "Error", alias = "error")]
    error: String,
}

// ── RequestOutcome ───────────────────────────────────────────────────

/// The classified result of one HTTP call.
///
/// Exactly one kind per response; a success never carries an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// 2xx (or anything below 400) with no deprecation signal.
    Success { body: Bytes },
    /// The body was the not-found sentinel, whatever the status code.
    NotFound,
    /// Status >= 400. `message` is the envelope's error text, or a
    /// parse-failure note when the body was not an envelope.
    ServerError { status: u16, message: String },
    /// The call worked, but the server flagged our user agent as deprecated.
    Deprecated { message: String, body: Bytes },
}

impl RequestOutcome {
    /// Classify a raw response.
    ///
    /// Priority: not-found sentinel, then status >= 400, then the
    /// deprecation header, then success.
    pub fn classify(status: StatusCode, headers: &HeaderMap, body: Bytes) -> Self {
        if body.as_ref() == NOT_FOUND_SENTINEL {
            return Self::NotFound;
        }

        if status.as_u16() >= 400 {
            let message = match serde_json::from_slice::<ErrorEnvelope>(&body) {
                Ok(envelope) => envelope.error,
                Err(e) => format!("could not parse error response: {e}"),
            };
            return Self::ServerError {
                status: status.as_u16(),
                message,
            };
        }

        match deprecation_notice(headers) {
            Some(message) => Self::Deprecated { message, body },
            None => Self::Success { body },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The response body, for outcomes that carry a usable one.
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            Self::Success { body } | Self::Deprecated { body, .. } => Some(body),
            Self::NotFound | Self::ServerError { .. } => None,
        }
    }

    /// The deprecation message, if the server sent one.
    pub fn deprecation(&self) -> Option<&str> {
        match self {
            Self::Deprecated { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Convert into the body, mapping failures onto [`Error`].
    ///
    /// A deprecated response still yields its body; read the notice with
    /// [`deprecation`](Self::deprecation) first if it matters.
    pub fn into_body(self) -> Result<Bytes, Error> {
        match self {
            Self::Success { body } | Self::Deprecated { body, .. } => Ok(body),
            Self::NotFound => Err(Error::NotFound),
            Self::ServerError { status, message } => Err(Error::Server { status, message }),
        }
    }
}

/// The deprecation message carried by `headers`, if the server flagged
/// this user agent.
pub(crate) fn deprecation_notice(headers: &HeaderMap) -> Option<String> {
    let deprecated = headers
        .get(DEPRECATED_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
    if !deprecated {
        return None;
    }
    Some(
        headers
            .get(DEPRECATION_MESSAGE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map_or_else(
                || "this client version is deprecated; please upgrade".to_owned(),
                String::from,
            ),
    )
}

// ── DeprecationSlot ──────────────────────────────────────────────────

/// Holds the most recent deprecation notice until a caller takes it.
#[derive(Debug, Default)]
pub struct DeprecationSlot(Mutex<Option<String>>);

impl DeprecationSlot {
    /// Log the notice and keep it.
    pub fn record(&self, message: &str) {
        warn!(message, "API reports this client version as deprecated");
        self.set(message.to_owned());
    }

    /// Keep a notice that was already logged elsewhere.
    pub fn set(&self, message: String) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(message);
    }

    pub fn take(&self) -> Option<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

// ── ApiClient ────────────────────────────────────────────────────────

/// Authenticated HTTP client for the hosting API.
///
/// Owns the [`Session`] it was built with; every request carries that
/// session's bearer token. No retries happen here -- every failure goes
/// back to the caller.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: Session,
    deprecation: DeprecationSlot,
}

impl ApiClient {
    /// Create a client that talks to `base_url` over the pinned transport.
    pub fn new(base_url: Url, session: Session, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, session))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, session: Session) -> Self {
        Self {
            http,
            base_url,
            session,
            deprecation: DeprecationSlot::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client (shared with the login flow).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Take the last deprecation notice, clearing it.
    pub fn take_deprecation_notice(&self) -> Option<String> {
        self.deprecation.take()
    }

    pub(crate) fn record_deprecation(&self, message: &str) {
        self.deprecation.record(message);
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/{segments..}` for REST endpoints.
    ///
    /// Each segment is percent-encoded on its own, so a caller-supplied id
    /// cannot add path levels, a query, or a fragment.
    pub fn api_url(&self, segments: &[&str]) -> Result<Url, Error> {
        join(&self.base_url, &[], segments)
    }

    /// `{base}/mongo/{segments..}` for calls proxied to the database layer.
    pub fn proxy_url(&self, segments: &[&str]) -> Result<Url, Error> {
        join(&self.base_url, &[PROXY_SEGMENT], segments)
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    /// Send one request and classify the response.
    ///
    /// Attaches `Authorization: Bearer <token>` and the user agent; a JSON
    /// body also sets `Content-Type: application/json`.
    pub async fn send<B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<RequestOutcome, Error>
    where
        B: Serialize + ?Sized,
    {
        debug!("{method} {url}");

        let mut builder = self
            .http
            .request(method, url)
            .bearer_auth(self.session.token().expose_secret())
            .header(USER_AGENT_HEADER, USER_AGENT);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(Error::from)?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(Error::from)?;

        trace!(%status, bytes = body.len(), "response received");

        Ok(RequestOutcome::classify(status, &headers, body))
    }

    /// Send, classify, and decode a JSON body into `T`.
    async fn request<T, B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let outcome = self.send(method, url, body).await?;
        if let Some(message) = outcome.deprecation() {
            self.record_deprecation(message);
        }
        decode(&outcome.into_body()?)
    }

    // ── Typed verbs ──────────────────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        self.request::<T, ()>(Method::GET, url, None).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        self.request(Method::POST, url, Some(body)).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        self.request(Method::PATCH, url, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        self.request::<T, ()>(Method::DELETE, url, None).await
    }
}

fn join(base: &Url, prefix: &[&str], segments: &[&str]) -> Result<Url, Error> {
    // `.` and `..` cannot be carried as literal segments.
    if let Some(bad) = segments
        .iter()
        .find(|s| s.is_empty() || **s == "." || **s == "..")
    {
        return Err(Error::InvalidIdentifier((*bad).to_owned()));
    }

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(prefix.iter().chain(segments));
    Ok(url)
}

/// Decode JSON, keeping a preview of the body on failure.
pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(body).map_err(|e| {
        let text = String::from_utf8_lossy(body).into_owned();
        let preview: String = text.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: text,
        }
    })
}
