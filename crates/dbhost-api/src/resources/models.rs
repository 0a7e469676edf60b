// API resource types
//
// Response bodies are plain JSON objects or arrays, no envelope. Fields use
// `#[serde(default)]` wherever the API omits them for some plans, and
// unknown fields land in `extra` so new server fields never break decoding.

use serde::{Deserialize, Serialize};

// ── Account ──────────────────────────────────────────────────────────

/// A billing account. Most resources are scoped under one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

// ── Deployment ───────────────────────────────────────────────────────

/// A set of database servers (replica set or single node).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub current_primary: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub databases: Vec<Database>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body for `POST /deployments/{account}`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateDeployment {
    pub name: String,
    pub database_name: String,
    pub location: String,
}

// ── Database ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub deployment_id: Option<String>,
}

/// Body for `POST /deployments/{account}/{deployment}/databases`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateDatabase {
    pub name: String,
}

// ── Database user ────────────────────────────────────────────────────

/// A user as the database layer reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseUser {
    #[serde(rename = "user")]
    pub username: String,
    #[serde(rename = "pwd", default)]
    pub password_hash: Option<String>,
    #[serde(rename = "readOnly", default)]
    pub read_only: bool,
}

/// Body for creating a database user through the proxy.
#[derive(Serialize)]
pub(crate) struct CreateDatabaseUser<'a> {
    pub username: &'a str,
    pub password: &'a str,
    #[serde(rename = "readOnly")]
    pub read_only: bool,
}

// ── Region ───────────────────────────────────────────────────────────

/// A location new deployments can be placed in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

// ── Backup ───────────────────────────────────────────────────────────

/// A hypermedia link attached to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backup {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub database_names: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "deployment", default)]
    pub deployment_slug: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    /// Size in bytes.
    #[serde(default)]
    pub size: f64,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Backup {
    /// The `rel=download` link, if the backup has one.
    pub fn download_link(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel == "download")
            .map(|link| link.href.as_str())
    }
}

/// Body for `POST /accounts/{account}/backups/{id}/restore`.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreBackupParams {
    /// Name of the deployment the restore creates.
    pub name: String,
    /// Database name on the new deployment.
    pub database_name: String,
    /// Database inside the backup to restore from.
    pub source_database: String,
}

// ── Acknowledgement ──────────────────────────────────────────────────

/// `{"ok": 1}` acknowledgement from mutating proxy calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    #[serde(alias = "Ok")]
    pub ok: i64,
}

impl OkResponse {
    pub fn is_ok(&self) -> bool {
        self.ok == 1
    }
}
