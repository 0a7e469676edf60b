// Deployment endpoints
//
// Deployments live under the selected account: `/deployments/{account}/...`.

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::resources::models::{CreateDeployment, Deployment};

impl ApiClient {
    /// `GET /deployments/{account}`
    pub async fn list_deployments(&self) -> Result<Vec<Deployment>, Error> {
        let account = self.account_slug()?;
        let url = self.api_url(&["deployments", account])?;
        debug!(account, "listing deployments");
        self.get(url).await
    }

    /// `GET /deployments/{account}/{id}`
    pub async fn get_deployment(&self, id: &str) -> Result<Deployment, Error> {
        let account = self.account_slug()?;
        let url = self.api_url(&["deployments", account, id])?;
        debug!(account, id, "fetching deployment");
        self.get(url).await
    }

    /// Create a deployment with one initial database.
    ///
    /// `POST /deployments/{account}`
    pub async fn create_deployment(&self, params: &CreateDeployment) -> Result<Deployment, Error> {
        let account = self.account_slug()?;
        let url = self.api_url(&["deployments", account])?;
        debug!(account, name = %params.name, location = %params.location, "creating deployment");
        self.post(url, params).await
    }
}
