// dbhost-api: Async client for the dbhost database-hosting API
//
// Pinned-TLS transport, bearer-token request dispatch with response
// classification, the login endpoint, typed resource calls, and the
// authenticated live-event stream.

pub mod auth;
pub mod client;
pub mod error;
pub mod login;
pub mod resources;
pub mod stream;
pub mod transport;
pub mod trust;

pub use auth::Session;
pub use client::{ApiClient, DeprecationSlot, RequestOutcome};
pub use error::Error;
pub use login::Authenticator;
pub use resources::{
    Account, Backup, CreateDatabase, CreateDeployment, Database, DatabaseUser, Deployment, Link,
    OkResponse, Region, RestoreBackupParams,
};
pub use stream::{StreamFrame, StreamHandle, StreamSubscription, open_stream};
pub use transport::{TransportConfig, USER_AGENT};
pub use trust::TrustAnchor;
