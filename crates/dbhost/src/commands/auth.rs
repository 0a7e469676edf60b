//! Login and logout handlers.

use tracing::{debug, warn};

use dbhost_config::CredentialStore;
use dbhost_core::Revocation;

use crate::cli::GlobalOpts;
use crate::config::Settings;
use crate::error::CliError;
use crate::prompt::TerminalPrompter;

use super::util;

/// Always prompts, replacing any stored credential.
pub async fn login(global: &GlobalOpts) -> Result<(), CliError> {
    let settings = Settings::resolve(global)?;
    let transport = settings.transport()?;
    let manager = settings.session_manager(&transport)?;

    let session = manager.login(&mut TerminalPrompter).await;
    util::report_deprecation(manager.take_deprecation_notice());
    let session = session?;

    let account = session.account().unwrap_or("-");
    util::status(
        &format!("Logged in as {} (account: {account})", session.email()),
        global.quiet,
    );
    Ok(())
}

/// Revoke the token server-side if possible, then remove local state.
///
/// When settings or the transport cannot be built (invalid config, missing
/// CA bundle) revocation is skipped and only the local cleanup runs.
pub async fn logout(global: &GlobalOpts) -> Result<(), CliError> {
    let manager = Settings::resolve(global).and_then(|settings| {
        let transport = settings.transport()?;
        settings.session_manager(&transport)
    });

    let manager = match manager {
        Ok(manager) => manager,
        Err(e) => {
            warn!(error = %e, "cannot reach the API, removing local credentials only");
            let store = CredentialStore::new(&dbhost_config::config_dir());
            let removed = store.exists();
            let deleted = store.delete();
            let cleared = dbhost_config::clear_account_at(&dbhost_config::config_path());
            deleted?;
            cleared?;
            util::status(
                if removed {
                    "Local credentials removed (token not revoked)"
                } else {
                    "Not logged in"
                },
                global.quiet,
            );
            return Ok(());
        }
    };

    let report = manager.logout().await?;
    debug!(?report, "logout finished");

    let message = match (&report.revocation, report.credential_removed) {
        (Revocation::Revoked, _) => "Logged out".to_owned(),
        (Revocation::Failed(e), _) => {
            format!("Local credentials removed, but the token could not be revoked: {e}")
        }
        (Revocation::Skipped, true) => "Local credentials removed".to_owned(),
        (Revocation::Skipped, false) => "Not logged in".to_owned(),
    };
    util::status(&message, global.quiet);
    Ok(())
}
