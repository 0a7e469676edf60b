//! Config subcommand handlers.

use std::fmt::Write;

use serde::Serialize;

use dbhost_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::Settings;
use crate::error::CliError;
use crate::output;
use crate::prompt::TerminalPrompter;

use super::util;

/// Resolved configuration as `config show` reports it. Never includes the token.
#[derive(Serialize)]
struct ConfigView<'a> {
    #[serde(flatten)]
    config: &'a Config,
    config_path: String,
    ca_bundle_path: String,
    logged_in_as: Option<String>,
}

fn format_view(view: &ConfigView<'_>) -> String {
    let mut out = toml::to_string_pretty(view.config).unwrap_or_default();
    let _ = writeln!(out);
    let _ = writeln!(out, "# config file: {}", view.config_path);
    let _ = writeln!(out, "# CA bundle:   {}", view.ca_bundle_path);
    let _ = write!(
        out,
        "# logged in:   {}",
        view.logged_in_as.as_deref().unwrap_or("no")
    );
    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let settings = Settings::resolve(global)?;
            let logged_in_as = settings.credential_store().load().ok().map(|c| c.email);
            let view = ConfigView {
                config: &settings.config,
                config_path: settings.config_path.display().to_string(),
                ca_bundle_path: settings.ca_bundle.display().to_string(),
                logged_in_as,
            };
            let out = output::render_single(&global.output, &view, format_view, |v| {
                v.config_path.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let path = dbhost_config::config_path();
            dbhost_config::edit_config_at(&path, |stored| stored.set(&key, &value))?;
            util::status(&format!("Set {key} in {}", path.display()), global.quiet);
            Ok(())
        }

        ConfigCommand::Account { slug } => {
            let settings = Settings::resolve(global)?;
            let transport = settings.transport()?;
            let manager = settings.session_manager(&transport)?;
            let session = match manager.load_session() {
                Ok(session) => session,
                Err(_) => manager.login(&mut TerminalPrompter).await?,
            };
            let account = manager.set_account(session, &slug).await?;
            let label = account.name.as_deref().unwrap_or(&account.slug);
            util::status(&format!("Working account is now {label}"), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&dbhost_config::config_dir().display().to_string(), false);
            Ok(())
        }
    }
}
