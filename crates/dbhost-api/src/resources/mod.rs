// Typed resource calls
//
// Each file adds inherent methods to `ApiClient` for one resource family.
// Account-scoped paths read the slug from the client's session.

pub mod accounts;
pub mod backups;
pub mod databases;
pub mod deployments;
pub mod models;
pub mod regions;
pub mod users;

pub use models::{
    Account, Backup, CreateDatabase, CreateDeployment, Database, DatabaseUser, Deployment, Link,
    OkResponse, Region, RestoreBackupParams,
};
