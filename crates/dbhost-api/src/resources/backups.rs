// Backup endpoints
//
// Account-wide listing and lookup live under `/accounts/{account}/backups`;
// the per-deployment listing hangs off the deployment path.

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::resources::models::{Backup, Deployment, RestoreBackupParams};

impl ApiClient {
    /// `GET /accounts/{account}/backups`
    pub async fn list_backups(&self) -> Result<Vec<Backup>, Error> {
        let account = self.account_slug()?;
        let url = self.api_url(&["accounts", account, "backups"])?;
        debug!(account, "listing backups");
        self.get(url).await
    }

    /// `GET /deployments/{account}/{deployment}/backups`
    pub async fn list_deployment_backups(&self, deployment: &str) -> Result<Vec<Backup>, Error> {
        let account = self.account_slug()?;
        let url = self.api_url(&["deployments", account, deployment, "backups"])?;
        debug!(account, deployment, "listing deployment backups");
        self.get(url).await
    }

    /// `GET /accounts/{account}/backups/{id}`
    pub async fn get_backup(&self, id: &str) -> Result<Backup, Error> {
        let account = self.account_slug()?;
        let url = self.api_url(&["accounts", account, "backups", id])?;
        debug!(account, id, "fetching backup");
        self.get(url).await
    }

    /// Find a backup by id or by archive filename.
    ///
    /// Lists the account's backups and matches either field.
    pub async fn find_backup(&self, key: &str) -> Result<Backup, Error> {
        let backups = self.list_backups().await?;
        backups
            .into_iter()
            .find(|b| b.id == key || b.filename.as_deref() == Some(key))
            .ok_or(Error::NotFound)
    }

    /// Restore a backup into a new deployment.
    ///
    /// `POST /accounts/{account}/backups/{id}/restore`
    pub async fn restore_backup(
        &self,
        id: &str,
        params: &RestoreBackupParams,
    ) -> Result<Deployment, Error> {
        let account = self.account_slug()?;
        let url = self.api_url(&["accounts", account, "backups", id, "restore"])?;
        debug!(account, id, name = %params.name, "restoring backup");
        self.post(url, params).await
    }
}
