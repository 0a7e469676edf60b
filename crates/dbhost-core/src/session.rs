// Session manager
//
// Login state machine:
//
//   Unauthenticated -> AwaitingCredentials -> [AwaitingSecondFactor]* -> Authenticated
//
// A rejected second-factor code loops back to AwaitingSecondFactor with no
// client-side bound; only a cancelled prompt ends the loop. Every other
// failure is terminal.

use std::path::PathBuf;

use dbhost_api::{
    ApiClient, Authenticator, DeprecationSlot, Error as ApiError, Session, TransportConfig,
};
use dbhost_config::{CredentialError, CredentialStore, PersistedCredential};
use secrecy::SecretString;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::CoreError;
use crate::prompt::Prompter;

/// Outcome of the server-side half of a logout.
#[derive(Debug)]
pub enum Revocation {
    /// The server revoked the token.
    Revoked,
    /// No stored credential, so there was nothing to revoke.
    Skipped,
    /// The revocation call failed; the token may still be live server-side.
    Failed(ApiError),
}

/// What a logout managed to do. Local cleanup has always been attempted.
#[derive(Debug)]
pub struct LogoutReport {
    pub revocation: Revocation,
    /// A credential file existed and was removed.
    pub credential_removed: bool,
}

/// Owns the path to persisted state and the HTTP client used for login,
/// account lookup, and revocation.
pub struct SessionManager {
    http: reqwest::Client,
    api_url: Url,
    store: CredentialStore,
    config_path: PathBuf,
    deprecation: DeprecationSlot,
}

impl SessionManager {
    pub fn new(
        api_url: Url,
        transport: &TransportConfig,
        store: CredentialStore,
        config_path: PathBuf,
    ) -> Result<Self, CoreError> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, api_url, store, config_path))
    }

    /// Build around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        api_url: Url,
        store: CredentialStore,
        config_path: PathBuf,
    ) -> Self {
        Self {
            http,
            api_url,
            store,
            config_path,
            deprecation: DeprecationSlot::default(),
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Take a deprecation notice raised during login or account lookup.
    pub fn take_deprecation_notice(&self) -> Option<String> {
        self.deprecation.take()
    }

    fn keep_notice(&self, notice: Option<String>) {
        if let Some(message) = notice {
            self.deprecation.set(message);
        }
    }

    /// An API client bound to `session`, sharing this manager's transport.
    pub fn client(&self, session: Session) -> ApiClient {
        ApiClient::with_client(self.http.clone(), self.api_url.clone(), session)
    }

    /// Rebuild the session from the credential file and the configured account.
    pub fn load_session(&self) -> Result<Session, CoreError> {
        let credential = self.store.load()?;
        let session = Session::new(credential.email, credential.oauth_token)?;
        let config = dbhost_config::load_config_from(&self.config_path)?;
        Ok(match config.account {
            Some(account) => session.with_account(account),
            None => session,
        })
    }

    /// The stored session, or an interactive login if none can be loaded.
    pub async fn require_session(&self, prompter: &mut dyn Prompter) -> Result<Session, CoreError> {
        match self.load_session() {
            Ok(session) if session.account().is_some() => Ok(session),
            Ok(session) => {
                debug!("stored session has no account selected");
                self.select_account(session, prompter).await
            }
            Err(CoreError::Credentials(CredentialError::NotFound { .. })) => {
                info!("no stored credentials, starting login");
                self.login(prompter).await
            }
            Err(e) => {
                warn!(error = %e, "stored credentials unusable, starting login");
                self.login(prompter).await
            }
        }
    }

    /// Run the interactive login flow, persist the token, and select an account.
    pub async fn login(&self, prompter: &mut dyn Prompter) -> Result<Session, CoreError> {
        // AwaitingCredentials
        let email = prompter.email()?;
        let password = prompter.password()?;

        let token = self.authenticate(&email, &password, prompter).await?;

        // Authenticated
        let session = Session::new(email.clone(), token.clone())?;
        self.store.save(&PersistedCredential {
            email,
            oauth_token: token,
        })?;
        info!(email = session.email(), "authenticated");

        self.select_account(session, prompter).await
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &SecretString,
        prompter: &mut dyn Prompter,
    ) -> Result<SecretString, CoreError> {
        let authenticator = Authenticator::with_client(self.http.clone(), self.api_url.clone());
        let mut second_factor: Option<String> = None;

        loop {
            let attempt = authenticator
                .authenticate(email, password, second_factor.as_deref())
                .await;
            self.keep_notice(authenticator.take_deprecation_notice());
            match attempt {
                Ok(token) => return Ok(token),
                Err(ApiError::SecondFactorRequired) => {
                    // AwaitingSecondFactor
                    if second_factor.is_some() {
                        warn!("second-factor code rejected");
                    }
                    second_factor = Some(prompter.second_factor()?);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Choose the working account for `session` and persist the choice.
    ///
    /// One visible account is taken as-is; several go to the prompter.
    pub async fn select_account(
        &self,
        session: Session,
        prompter: &mut dyn Prompter,
    ) -> Result<Session, CoreError> {
        let client = self.client(session.clone());
        let accounts = client.list_accounts().await;
        self.keep_notice(client.take_deprecation_notice());
        let accounts = accounts?;

        let slug = match accounts.as_slice() {
            [] => {
                return Err(CoreError::NoAccounts {
                    email: session.email().to_owned(),
                });
            }
            [only] => only.slug.clone(),
            _ => {
                let chosen = prompter.choose_account(&accounts)?;
                if !accounts.iter().any(|a| a.slug == chosen) {
                    return Err(CoreError::UnknownAccount { slug: chosen });
                }
                chosen
            }
        };

        self.persist_account(&slug)?;
        info!(account = %slug, "account selected");
        Ok(session.with_account(slug))
    }

    /// Verify `slug` against the API, then make it the working account.
    pub async fn set_account(
        &self,
        session: Session,
        slug: &str,
    ) -> Result<dbhost_api::Account, CoreError> {
        let client = self.client(session);
        let account = client.get_account(slug).await;
        self.keep_notice(client.take_deprecation_notice());
        let account = account?;
        self.persist_account(&account.slug)?;
        Ok(account)
    }

    fn persist_account(&self, slug: &str) -> Result<(), CoreError> {
        dbhost_config::edit_config_at(&self.config_path, |stored| {
            stored.account = Some(slug.to_owned());
            Ok(())
        })?;
        Ok(())
    }

    /// Revoke the stored token and remove local state.
    ///
    /// The token to revoke comes from the credential file alone, so an
    /// unreadable `config.toml` cannot stop revocation. The credential file
    /// and cached account are removed even when the revocation fails; that
    /// failure is reported, not returned. A local failure is returned only
    /// after both local steps were attempted.
    pub async fn logout(&self) -> Result<LogoutReport, CoreError> {
        let stored = self
            .store
            .load()
            .map_err(CoreError::from)
            .and_then(|c| Session::new(c.email, c.oauth_token).map_err(CoreError::from));
        let revocation = match stored {
            Ok(session) => match self.client(session).revoke_authorization().await {
                Ok(()) => Revocation::Revoked,
                Err(e) => {
                    warn!(error = %e, "token revocation failed");
                    Revocation::Failed(e)
                }
            },
            Err(e) => {
                debug!(error = %e, "no usable credential to revoke");
                Revocation::Skipped
            }
        };

        let credential_removed = self.store.exists();
        let deleted = self.store.delete();
        let cleared = dbhost_config::clear_account_at(&self.config_path);

        deleted?;
        cleared?;

        Ok(LogoutReport {
            revocation,
            credential_removed,
        })
    }
}
