use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::resources::models::Region;

impl ApiClient {
    /// List locations available for new deployments.
    ///
    /// `GET /regions`
    pub async fn list_regions(&self) -> Result<Vec<Region>, Error> {
        let url = self.api_url(&["regions"])?;
        debug!("listing regions");
        self.get(url).await
    }
}
