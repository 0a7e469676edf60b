//! Database command handlers.

use tabled::Tabled;

use dbhost_api::Database;

use crate::cli::{DatabasesArgs, DatabasesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DatabaseRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Deployment")]
    deployment: String,
    #[tabled(rename = "Plan")]
    plan: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl DatabaseRow {
    fn new(db: &Database, color: bool) -> Self {
        Self {
            name: db.name.clone(),
            deployment: db.deployment_id.clone().unwrap_or_default(),
            plan: db.plan.clone().unwrap_or_default(),
            status: db
                .status
                .as_deref()
                .map(|s| output::paint_status(s, color))
                .unwrap_or_default(),
        }
    }
}

fn detail(db: &Database) -> String {
    output::detail_lines(&[
        ("Name", Some(db.name.clone())),
        ("ID", db.id.clone()),
        ("Deployment", db.deployment_id.clone()),
        ("Plan", db.plan.clone()),
        ("Status", db.status.clone()),
    ])
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: DatabasesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        DatabasesCommand::List => {
            let databases = ctx.client.list_databases().await?;
            let out = output::render_list(
                &global.output,
                &databases,
                |db| DatabaseRow::new(db, ctx.color),
                |db| db.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DatabasesCommand::Info { name } => {
            let db = ctx
                .client
                .get_database(&name)
                .await
                .map_err(|e| util::not_found(e, "database", &name, "databases list"))?;
            let out = output::render_single(&global.output, &db, detail, |db| db.name.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DatabasesCommand::Create { deployment, name } => {
            let db = ctx.client.create_database(&deployment, &name).await?;
            util::status(&format!("Database '{}' created", db.name), global.quiet);
            let out = output::render_single(&global.output, &db, detail, |db| db.name.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
