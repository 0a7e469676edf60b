//! Deployment command handlers, including the live `mongostat`/`oplog` tails.

use std::io::Write;

use tabled::Tabled;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use dbhost_api::{CreateDeployment, Deployment, StreamFrame, StreamSubscription};

use crate::cli::{DeploymentsArgs, DeploymentsCommand, GlobalOpts, OutputFormat, StreamArgs};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeploymentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Databases")]
    databases: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl DeploymentRow {
    fn new(d: &Deployment, color: bool) -> Self {
        Self {
            id: d.id.clone(),
            name: d.name.clone().unwrap_or_default(),
            location: d.location.clone().unwrap_or_default(),
            version: d.version.clone().unwrap_or_default(),
            databases: d
                .databases
                .iter()
                .map(|db| db.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            status: d
                .status
                .as_deref()
                .map(|s| output::paint_status(s, color))
                .unwrap_or_default(),
        }
    }
}

pub(super) fn detail(d: &Deployment) -> String {
    let join = |items: Vec<&str>| Some(items.join(", "));
    output::detail_lines(&[
        ("ID", Some(d.id.clone())),
        ("Name", d.name.clone()),
        ("Status", d.status.clone()),
        ("Plan", d.plan.clone()),
        ("Location", d.location.clone()),
        ("Version", d.version.clone()),
        ("Primary", d.current_primary.clone()),
        ("Members", join(d.members.iter().map(String::as_str).collect())),
        (
            "Databases",
            join(d.databases.iter().map(|db| db.name.as_str()).collect()),
        ),
    ])
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &Context,
    args: DeploymentsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DeploymentsCommand::List => {
            let deployments = ctx.client.list_deployments().await?;
            let out = output::render_list(
                &global.output,
                &deployments,
                |d| DeploymentRow::new(d, ctx.color),
                |d| d.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DeploymentsCommand::Info { id } => {
            let deployment = ctx
                .client
                .get_deployment(&id)
                .await
                .map_err(|e| util::not_found(e, "deployment", &id, "deployments list"))?;
            let out = output::render_single(&global.output, &deployment, detail, |d| d.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DeploymentsCommand::Create {
            name,
            database,
            region,
        } => {
            let params = CreateDeployment {
                name,
                database_name: database,
                location: region,
            };
            let deployment = ctx.client.create_deployment(&params).await?;
            util::status(
                &format!("Deployment '{}' is being provisioned", deployment.id),
                global.quiet,
            );
            let out = output::render_single(&global.output, &deployment, detail, |d| d.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DeploymentsCommand::Mongostat(args) => {
            tail(ctx, subscription("mongostat", args), global).await
        }

        DeploymentsCommand::Oplog(args) => {
            tail(ctx, subscription("oplog", args), global).await
        }
    }
}

fn subscription(command: &str, args: StreamArgs) -> StreamSubscription {
    let sub = StreamSubscription::new(command, args.deployment);
    match args.database {
        Some(db) => sub.with_database(db),
        None => sub,
    }
}

// ── Live feed ───────────────────────────────────────────────────────

/// Print frames until the server closes the feed or Ctrl-C.
async fn tail(
    ctx: &Context,
    subscription: StreamSubscription,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let cancel = CancellationToken::new();
    let guard = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, closing feed");
            guard.cancel();
        }
    });

    let result = pump(ctx, &subscription, cancel.clone(), global).await;
    interrupt.abort();

    match result {
        Ok(()) | Err(CliError::Cancelled) if cancel.is_cancelled() => {
            util::status("Feed closed", global.quiet);
            Ok(())
        }
        other => other,
    }
}

async fn pump(
    ctx: &Context,
    subscription: &StreamSubscription,
    cancel: CancellationToken,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut handle = dbhost_api::open_stream(
        &ctx.settings.stream_endpoint,
        subscription,
        ctx.client.session(),
        &ctx.transport,
        cancel,
    )
    .await?;
    info!(command = %subscription.command, deployment = %subscription.deployment_id, "tailing");

    while let Some(frame) = handle.next_frame().await {
        let frame = frame?;
        if global.quiet {
            continue;
        }
        let line = render_frame(&frame, &global.output);
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{line}")?;
        stdout.flush()?;
    }

    handle.close().await?;
    Ok(())
}

/// Structured formats re-render JSON frames; everything else is printed as received.
fn render_frame(frame: &StreamFrame, format: &OutputFormat) -> String {
    let raw = || String::from_utf8_lossy(frame.as_bytes()).into_owned();
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            match frame.json::<serde_json::Value>() {
                Ok(value) => {
                    output::render_single(format, &value, |_| String::new(), |_| String::new())
                }
                Err(_) => raw(),
            }
        }
        OutputFormat::Table | OutputFormat::Plain => raw(),
    }
}
