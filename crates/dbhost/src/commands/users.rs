//! Database user command handlers.

use secrecy::{ExposeSecret, SecretString};
use tabled::Tabled;

use dbhost_api::{DatabaseUser, OkResponse};

use crate::cli::{GlobalOpts, UsersArgs, UsersCommand};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "User")]
    username: String,
    #[tabled(rename = "Access")]
    access: &'static str,
}

impl From<&DatabaseUser> for UserRow {
    fn from(u: &DatabaseUser) -> Self {
        Self {
            username: u.username.clone(),
            access: if u.read_only { "read-only" } else { "read-write" },
        }
    }
}

pub async fn handle(ctx: &Context, args: UsersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        UsersCommand::List(target) => {
            let users = ctx
                .client
                .list_database_users(&target.deployment, &target.database)
                .await?;
            let out = output::render_list(
                &global.output,
                &users,
                |u| UserRow::from(u),
                |u| u.username.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        UsersCommand::Create { target, username } => {
            let password = read_new_password(&username)?;
            let ack = ctx
                .client
                .create_database_user(&target.deployment, &target.database, &username, &password)
                .await?;
            acknowledged(ack, "create user")?;
            util::status(
                &format!("User '{username}' added to {}", target.database),
                global.quiet,
            );
            Ok(())
        }

        UsersCommand::Remove { target, username } => {
            if !util::confirm(
                &format!("Remove user '{username}' from {}?", target.database),
                "users remove",
                global.yes,
            )? {
                return Ok(());
            }
            let ack = ctx
                .client
                .remove_database_user(&target.deployment, &target.database, &username)
                .await
                .map_err(|e| util::not_found(e, "user", &username, "users list"))?;
            acknowledged(ack, "remove user")?;
            util::status(&format!("User '{username}' removed"), global.quiet);
            Ok(())
        }
    }
}

/// Masked prompt, asked twice.
fn read_new_password(username: &str) -> Result<SecretString, CliError> {
    let prompt_err = |e: std::io::Error| CliError::Validation {
        field: "password".into(),
        reason: format!("prompt failed: {e}"),
    };

    let first = SecretString::from(
        rpassword::prompt_password(format!("Password for {username}: ")).map_err(prompt_err)?,
    );
    if first.expose_secret().is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "cannot be empty".into(),
        });
    }
    let second = SecretString::from(rpassword::prompt_password("Repeat password: ").map_err(prompt_err)?);
    if first.expose_secret() != second.expose_secret() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "passwords do not match".into(),
        });
    }
    Ok(first)
}

fn acknowledged(ack: OkResponse, action: &str) -> Result<(), CliError> {
    if ack.is_ok() {
        Ok(())
    } else {
        Err(CliError::UnexpectedResponse {
            message: format!("server did not acknowledge {action} (ok = {})", ack.ok),
        })
    }
}
