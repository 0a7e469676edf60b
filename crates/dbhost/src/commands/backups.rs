//! Backup command handlers.

use tabled::Tabled;

use dbhost_api::{Backup, RestoreBackupParams};

use crate::cli::{BackupsArgs, BackupsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{Context, deployments, util};

#[derive(Tabled)]
struct BackupRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Deployment")]
    deployment: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Databases")]
    databases: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl BackupRow {
    fn new(b: &Backup, color: bool) -> Self {
        Self {
            id: b.id.clone(),
            deployment: b.deployment_slug.clone().unwrap_or_default(),
            created: b.created_at.clone().unwrap_or_default(),
            databases: b.database_names.join(", "),
            size: output::pretty_size(b.size),
            status: b
                .status
                .as_deref()
                .map(|s| output::paint_status(s, color))
                .unwrap_or_default(),
        }
    }
}

fn detail(b: &Backup) -> String {
    output::detail_lines(&[
        ("ID", Some(b.id.clone())),
        ("Deployment", b.deployment_slug.clone()),
        ("Type", b.kind.clone()),
        ("Status", b.status.clone()),
        ("Created", b.created_at.clone()),
        ("Databases", Some(b.database_names.join(", "))),
        ("File", b.filename.clone()),
        ("Size", Some(output::pretty_size(b.size))),
        ("Download", b.download_link().map(str::to_owned)),
    ])
}

pub async fn handle(ctx: &Context, args: BackupsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        BackupsCommand::List { deployment } => {
            let backups = match deployment {
                Some(ref id) => ctx.client.list_deployment_backups(id).await?,
                None => ctx.client.list_backups().await?,
            };
            let out = output::render_list(
                &global.output,
                &backups,
                |b| BackupRow::new(b, ctx.color),
                |b| b.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        BackupsCommand::Info { backup } => {
            let backup = ctx
                .client
                .find_backup(&backup)
                .await
                .map_err(|e| util::not_found(e, "backup", &backup, "backups list"))?;
            let out = output::render_single(&global.output, &backup, detail, |b| {
                b.download_link().unwrap_or_default().to_owned()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        BackupsCommand::Restore {
            backup,
            name,
            source,
            destination,
        } => {
            let found = ctx
                .client
                .find_backup(&backup)
                .await
                .map_err(|e| util::not_found(e, "backup", &backup, "backups list"))?;
            let params = RestoreBackupParams {
                name,
                database_name: destination,
                source_database: source,
            };
            let deployment = ctx
                .client
                .restore_backup(&found.id, &params)
                .await
                .map_err(|e| util::not_found(e, "backup", &found.id, "backups list"))?;
            util::status(
                &format!(
                    "Restoring backup {} into deployment '{}'",
                    found.id, deployment.id
                ),
                global.quiet,
            );
            let out = output::render_single(
                &global.output,
                &deployment,
                deployments::detail,
                |d| d.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
