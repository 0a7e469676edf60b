// Database endpoints

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::resources::models::{CreateDatabase, Database};

impl ApiClient {
    /// List every database visible to the session.
    ///
    /// `GET /databases`
    pub async fn list_databases(&self) -> Result<Vec<Database>, Error> {
        let url = self.api_url(&["databases"])?;
        debug!("listing databases");
        self.get(url).await
    }

    /// `GET /databases/{name}`
    pub async fn get_database(&self, name: &str) -> Result<Database, Error> {
        let url = self.api_url(&["databases", name])?;
        debug!(name, "fetching database");
        self.get(url).await
    }

    /// Add a database to an existing deployment.
    ///
    /// `POST /deployments/{account}/{deployment}/databases`
    pub async fn create_database(&self, deployment: &str, name: &str) -> Result<Database, Error> {
        let account = self.account_slug()?;
        let url = self.api_url(&["deployments", account, deployment, "databases"])?;
        debug!(account, deployment, name, "creating database");
        self.post(url, &CreateDatabase { name: name.to_owned() })
            .await
    }
}
