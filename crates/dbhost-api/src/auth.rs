use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// An authenticated identity for this process.
///
/// Built once from a successful login or a stored credential, then passed
/// by value into [`ApiClient`](crate::ApiClient) and by reference into
/// [`open_stream`](crate::open_stream). The token is never empty.
#[derive(Debug, Clone)]
pub struct Session {
    email: String,
    token: SecretString,
    account: Option<String>,
}

impl Session {
    /// Bind an email and bearer token. An empty token is rejected.
    pub fn new(email: impl Into<String>, token: SecretString) -> Result<Self, Error> {
        if token.expose_secret().trim().is_empty() {
            return Err(Error::MissingToken);
        }
        Ok(Self {
            email: email.into(),
            token,
            account: None,
        })
    }

    /// Attach the selected account slug.
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    /// The selected account slug, if one has been chosen.
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    /// `Bearer <token>`, as sent in headers and the stream query.
    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.token.expose_secret())
    }
}
