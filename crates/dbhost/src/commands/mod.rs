//! Command dispatch: bridges CLI args -> API calls -> output formatting.

pub mod auth;
pub mod backups;
pub mod config_cmd;
pub mod databases;
pub mod deployments;
pub mod regions;
pub mod users;
pub mod util;

use dbhost_api::{ApiClient, TransportConfig};

use crate::cli::{Command, GlobalOpts};
use crate::config::Settings;
use crate::error::CliError;
use crate::output;
use crate::prompt::TerminalPrompter;

/// A logged-in client plus what commands need alongside it.
pub struct Context {
    pub settings: Settings,
    pub transport: TransportConfig,
    pub client: ApiClient,
    pub color: bool,
}

impl Context {
    /// Resolve settings, load the trust anchor, and restore (or start) a session.
    pub async fn connect(global: &GlobalOpts) -> Result<Self, CliError> {
        let settings = Settings::resolve(global)?;
        let transport = settings.transport()?;
        let manager = settings.session_manager(&transport)?;
        let session = manager.require_session(&mut TerminalPrompter).await;
        util::report_deprecation(manager.take_deprecation_notice());
        let client = manager.client(session?);

        Ok(Self {
            settings,
            transport,
            client,
            color: output::should_color(&global.color),
        })
    }
}

/// Dispatch a session-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let ctx = Context::connect(global).await?;

    let result = match cmd {
        Command::Databases(args) => databases::handle(&ctx, args, global).await,
        Command::Deployments(args) => deployments::handle(&ctx, args, global).await,
        Command::Users(args) => users::handle(&ctx, args, global).await,
        Command::Regions => regions::handle(&ctx, global).await,
        Command::Backups(args) => backups::handle(&ctx, args, global).await,
        // Login, logout, config and completions are handled before dispatch
        Command::Login | Command::Logout | Command::Config(_) | Command::Completions(_) => {
            unreachable!()
        }
    };

    util::report_deprecation(ctx.client.take_deprecation_notice());
    result
}
