// Token issue and revocation
//
// Login is the one call made without a bearer token, so it lives on its own
// small client. Revocation goes through the authenticated `ApiClient`.

use reqwest::Method;
use reqwest::header::USER_AGENT as USER_AGENT_HEADER;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::client::{ApiClient, DeprecationSlot, deprecation_notice};
use crate::error::Error;
use crate::transport::{TransportConfig, USER_AGENT};

/// Structured code the login endpoint uses for a second-factor challenge.
pub const SECOND_FACTOR_CODE: &str = "second_factor_required";

/// Message the login endpoint has historically used for the same challenge.
/// Matched exactly, only when no structured code is present.
pub const SECOND_FACTOR_MESSAGE: &str = "2fa token required";

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    second_factor_token: Option<&'a str>,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(alias = "access_token", alias = "oauth_token")]
    token: String,
}

#[derive(Deserialize)]
struct LoginError {
    #[serde(rename = "Error", alias = "error", default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

impl LoginError {
    fn is_second_factor_challenge(&self) -> bool {
        match self.code.as_deref() {
            Some(code) => code == SECOND_FACTOR_CODE,
            None => self.error.as_deref() == Some(SECOND_FACTOR_MESSAGE),
        }
    }
}

/// Unauthenticated client for the login endpoint.
pub struct Authenticator {
    http: reqwest::Client,
    base_url: Url,
    deprecation: DeprecationSlot,
}

impl Authenticator {
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self::with_client(transport.build_client()?, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            deprecation: DeprecationSlot::default(),
        }
    }

    /// Take the deprecation notice from the last login attempt, clearing it.
    pub fn take_deprecation_notice(&self) -> Option<String> {
        self.deprecation.take()
    }

    /// Exchange email + password (+ optional second-factor code) for a token.
    ///
    /// Returns [`Error::SecondFactorRequired`] when the server challenges
    /// for a code; every other rejection is [`Error::Authentication`].
    pub async fn authenticate(
        &self,
        email: &str,
        password: &SecretString,
        second_factor: Option<&str>,
    ) -> Result<SecretString, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let url = Url::parse(&format!("{base}/login"))?;

        debug!(email, second_factor = second_factor.is_some(), "authenticating at {url}");

        let body = LoginRequest {
            email,
            password: password.expose_secret(),
            second_factor_token: second_factor.filter(|code| !code.is_empty()),
        };

        let resp = self
            .http
            .post(url)
            .header(USER_AGENT_HEADER, USER_AGENT)
            .json(&body)
            .send()
            .await
            .map_err(Error::from)?;

        let status = resp.status();
        if let Some(message) = deprecation_notice(resp.headers()) {
            self.deprecation.record(&message);
        }
        let bytes = resp.bytes().await.map_err(Error::from)?;

        if !status.is_success() {
            let parsed = serde_json::from_slice::<LoginError>(&bytes).ok();
            if parsed.as_ref().is_some_and(LoginError::is_second_factor_challenge) {
                debug!("second factor required");
                return Err(Error::SecondFactorRequired);
            }
            let message = parsed
                .and_then(|e| e.error)
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).chars().take(200).collect());
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {message}"),
            });
        }

        let login: LoginResponse = crate::client::decode(&bytes)?;
        if login.token.trim().is_empty() {
            return Err(Error::Authentication {
                message: "server returned an empty token".into(),
            });
        }

        debug!("login successful");
        Ok(SecretString::from(login.token))
    }
}

impl ApiClient {
    /// Revoke this session's token server-side.
    pub async fn revoke_authorization(&self) -> Result<(), Error> {
        let url = self.api_url(&["authorization"])?;
        let outcome = self.send::<()>(Method::DELETE, url, None).await?;
        if let Some(message) = outcome.deprecation() {
            self.record_deprecation(message);
        }
        outcome.into_body()?;
        debug!("authorization revoked");
        Ok(())
    }
}
