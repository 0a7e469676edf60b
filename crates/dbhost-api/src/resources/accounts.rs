// Account endpoints

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::resources::models::Account;

impl ApiClient {
    /// List all accounts the session's user belongs to.
    ///
    /// `GET /accounts`
    pub async fn list_accounts(&self) -> Result<Vec<Account>, Error> {
        let url = self.api_url(&["accounts"])?;
        debug!("listing accounts");
        self.get(url).await
    }

    /// `GET /accounts/{slug}`
    pub async fn get_account(&self, slug: &str) -> Result<Account, Error> {
        let url = self.api_url(&["accounts", slug])?;
        debug!(slug, "fetching account");
        self.get(url).await
    }

    /// The selected account slug, or [`Error::AccountNotSelected`].
    pub(crate) fn account_slug(&self) -> Result<&str, Error> {
        self.session().account().ok_or(Error::AccountNotSelected)
    }
}
