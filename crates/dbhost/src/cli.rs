//! Clap derive structures for the `dbhost` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// dbhost -- manage hosted database deployments from the command line
#[derive(Debug, Parser)]
#[command(
    name = "dbhost",
    version,
    about = "Manage hosted database deployments from the command line",
    long_about = "Command-line client for the dbhost database-hosting API.\n\n\
        Every connection is pinned to a configured CA bundle; the bearer\n\
        token from `dbhost login` is stored owner-read-only in the config\n\
        directory.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// API base URL (overrides config)
    #[arg(long, env = "DBHOST_API_URL", global = true, hide_env = true)]
    pub api_url: Option<String>,

    /// PEM bundle the server certificate must chain to (overrides config)
    #[arg(long, env = "DBHOST_CA_BUNDLE", global = true, hide_env = true)]
    pub ca_bundle: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "DBHOST_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store a token
    Login,

    /// Revoke the stored token and remove local credentials
    Logout,

    /// Manage databases
    #[command(alias = "db")]
    Databases(DatabasesArgs),

    /// Manage deployments and tail their live feeds
    #[command(alias = "dep")]
    Deployments(DeploymentsArgs),

    /// Manage database users
    Users(UsersArgs),

    /// List regions available for new deployments
    Regions,

    /// Inspect and restore backups
    Backups(BackupsArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DATABASES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DatabasesArgs {
    #[command(subcommand)]
    pub command: DatabasesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DatabasesCommand {
    /// List databases
    #[command(alias = "ls")]
    List,

    /// Show one database
    Info {
        /// Database name
        name: String,
    },

    /// Create a database on an existing deployment
    Create {
        /// Deployment id
        #[arg(long, short = 'd', required = true)]
        deployment: String,

        /// New database name
        #[arg(long, short = 'n', required = true)]
        name: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEPLOYMENTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DeploymentsArgs {
    #[command(subcommand)]
    pub command: DeploymentsCommand,
}

#[derive(Debug, Subcommand)]
pub enum DeploymentsCommand {
    /// List deployments in the selected account
    #[command(alias = "ls")]
    List,

    /// Show one deployment
    Info {
        /// Deployment id
        id: String,
    },

    /// Create a deployment with an initial database
    Create {
        /// Deployment name
        #[arg(long, short = 'n', required = true)]
        name: String,

        /// Initial database name
        #[arg(long, short = 'd', required = true)]
        database: String,

        /// Region to place the deployment in (see `dbhost regions`)
        #[arg(long, short = 'r', required = true)]
        region: String,
    },

    /// Realtime mongostat samples (Ctrl-C to stop)
    Mongostat(StreamArgs),

    /// Tail the replication oplog (Ctrl-C to stop)
    Oplog(StreamArgs),
}

#[derive(Debug, Args)]
pub struct StreamArgs {
    /// Deployment id
    pub deployment: String,

    /// Restrict the feed to one database
    #[arg(long)]
    pub database: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  USERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

/// Which database a user command targets.
#[derive(Debug, Args)]
pub struct DatabaseTarget {
    /// Deployment id
    #[arg(long, short = 'd', required = true)]
    pub deployment: String,

    /// Database name
    #[arg(long = "database", short = 'b', required = true)]
    pub database: String,
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List users on a database
    #[command(alias = "ls")]
    List(DatabaseTarget),

    /// Add a read-write user (prompts for the password)
    Create {
        #[command(flatten)]
        target: DatabaseTarget,

        /// Username
        username: String,
    },

    /// Remove a user from a database
    #[command(alias = "rm")]
    Remove {
        #[command(flatten)]
        target: DatabaseTarget,

        /// Username
        username: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  BACKUPS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct BackupsArgs {
    #[command(subcommand)]
    pub command: BackupsCommand,
}

#[derive(Debug, Subcommand)]
pub enum BackupsCommand {
    /// List backups in the selected account
    #[command(alias = "ls")]
    List {
        /// Only backups of this deployment
        #[arg(long, short = 'd')]
        deployment: Option<String>,
    },

    /// Show one backup, including its download link
    Info {
        /// Backup id or archive filename
        backup: String,
    },

    /// Restore a backup into a new deployment
    Restore {
        /// Backup id or archive filename
        backup: String,

        /// Name of the deployment to create
        #[arg(long, short = 'n', required = true)]
        name: String,

        /// Database inside the backup to restore
        #[arg(long, required = true)]
        source: String,

        /// Database name on the new deployment
        #[arg(long, required = true)]
        destination: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current resolved configuration
    Show,

    /// Set a configuration value
    Set {
        /// Config key (api_url, stream_url, ca_bundle, timeout, account)
        key: String,

        /// Value to set (empty to clear ca_bundle or account)
        value: String,
    },

    /// Switch the working account
    Account {
        /// Account slug
        slug: String,
    },

    /// Print the config directory
    Path,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
