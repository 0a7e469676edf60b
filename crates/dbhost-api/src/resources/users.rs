// Database user endpoints
//
// Users are managed by the database layer itself, so these calls go through
// the `/mongo` proxy: `/mongo/{deployment}/{database}/users`.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::resources::models::{CreateDatabaseUser, DatabaseUser, OkResponse};

impl ApiClient {
    pub async fn list_database_users(
        &self,
        deployment: &str,
        database: &str,
    ) -> Result<Vec<DatabaseUser>, Error> {
        let url = self.proxy_url(&[deployment, database, "users"])?;
        debug!(deployment, database, "listing database users");
        self.get(url).await
    }

    /// Create a read-write user.
    pub async fn create_database_user(
        &self,
        deployment: &str,
        database: &str,
        username: &str,
        password: &SecretString,
    ) -> Result<OkResponse, Error> {
        let url = self.proxy_url(&[deployment, database, "users"])?;
        debug!(deployment, database, username, "creating database user");
        let body = CreateDatabaseUser {
            username,
            password: password.expose_secret(),
            read_only: false,
        };
        self.post(url, &body).await
    }

    pub async fn remove_database_user(
        &self,
        deployment: &str,
        database: &str,
        username: &str,
    ) -> Result<OkResponse, Error> {
        let url = self.proxy_url(&[deployment, database, "users", username])?;
        debug!(deployment, database, username, "removing database user");
        self.delete(url).await
    }
}
