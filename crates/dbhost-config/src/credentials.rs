// Credential file
//
// The bearer token is kept apart from `config.toml` in a single JSON file,
// `{"email": "...", "oauth_token": "..."}`, readable only by its owner. The
// file is read-only once written, so a save removes it first.

use std::io::Write;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const CREDENTIALS_FILE: &str = "credentials";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no stored credentials at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("credential file is malformed: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("failed to encode credentials: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// An identity as stored on disk.
#[derive(Debug, Clone)]
pub struct PersistedCredential {
    pub email: String,
    pub oauth_token: SecretString,
}

#[derive(Serialize, Deserialize)]
struct CredentialFile {
    email: String,
    oauth_token: String,
}

/// Load, save, and delete the credential file in one directory.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The store inside [`config_dir`](crate::config_dir).
    pub fn default_location() -> Self {
        Self::new(crate::config_dir())
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CREDENTIALS_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    pub fn load(&self) -> Result<PersistedCredential, CredentialError> {
        let path = self.path();
        let bytes = std::fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CredentialError::NotFound { path: path.clone() }
            } else {
                CredentialError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        let file: CredentialFile = serde_json::from_slice(&bytes).map_err(CredentialError::Parse)?;
        debug!(path = %path.display(), "credentials loaded");

        Ok(PersistedCredential {
            email: file.email,
            oauth_token: SecretString::from(file.oauth_token),
        })
    }

    /// Write the credential, replacing any existing file.
    ///
    /// The directory is created owner-only (0700) and the file is left
    /// owner-read-only (0400).
    pub fn save(&self, credential: &PersistedCredential) -> Result<(), CredentialError> {
        let path = self.path();
        let json = serde_json::to_vec(&CredentialFile {
            email: credential.email.clone(),
            oauth_token: credential.oauth_token.expose_secret().to_owned(),
        })
        .map_err(CredentialError::Serialize)?;

        create_private_dir(&self.dir).map_err(|source| CredentialError::Io {
            path: self.dir.clone(),
            source,
        })?;

        remove_if_present(&path).map_err(|source| CredentialError::Io {
            path: path.clone(),
            source,
        })?;

        write_read_only(&path, &json).map_err(|source| CredentialError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), "credentials saved");
        Ok(())
    }

    /// Remove the credential file. Removing an absent file succeeds.
    pub fn delete(&self) -> Result<(), CredentialError> {
        let path = self.path();
        remove_if_present(&path).map_err(|source| CredentialError::Io { path, source })
    }
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    if dir.is_dir() {
        return Ok(());
    }
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

#[cfg(unix)]
fn write_read_only(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o400)
        .open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_read_only(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    let mut perms = file.metadata()?.permissions();
    perms.set_readonly(true);
    std::fs::set_permissions(path, perms)
}
