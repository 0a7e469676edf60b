//! Shared helpers for command handlers.

use std::io::IsTerminal;

use owo_colors::OwoColorize;

use dbhost_api::Error as ApiError;

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal there is nobody to ask, so `--yes` becomes mandatory.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Surface the server's deprecation notice, if any call produced one.
pub fn report_deprecation(notice: Option<String>) {
    if let Some(message) = notice {
        eprintln!("{} {message}", "warning:".yellow().bold());
    }
}

/// Print a status line on stderr unless `--quiet`.
pub fn status(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{message}");
    }
}

/// Name the missing resource when the API reports absence.
pub fn not_found(err: ApiError, resource_type: &str, identifier: &str, list_command: &str) -> CliError {
    if err.is_not_found() {
        CliError::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
            list_command: list_command.into(),
        }
    } else {
        err.into()
    }
}
