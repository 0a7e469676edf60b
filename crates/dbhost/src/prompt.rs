//! Terminal implementation of the login prompts.

use dialoguer::{Input, Select};
use secrecy::SecretString;

use dbhost_api::Account;
use dbhost_core::{CoreError, Prompter};

/// Reads login input from the controlling terminal.
pub struct TerminalPrompter;

fn prompt_err(e: impl std::fmt::Display) -> CoreError {
    CoreError::Prompt(e.to_string())
}

impl Prompter for TerminalPrompter {
    fn email(&mut self) -> Result<String, CoreError> {
        let email: String = Input::new()
            .with_prompt("Email")
            .validate_with(|input: &String| {
                if input.contains('@') {
                    Ok(())
                } else {
                    Err("not an email address")
                }
            })
            .interact_text()
            .map_err(prompt_err)?;
        Ok(email.trim().to_owned())
    }

    fn password(&mut self) -> Result<SecretString, CoreError> {
        let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
        if password.is_empty() {
            return Err(CoreError::Cancelled);
        }
        Ok(SecretString::from(password))
    }

    fn second_factor(&mut self) -> Result<String, CoreError> {
        let code: String = Input::new()
            .with_prompt("Second-factor code (empty to cancel)")
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_err)?;
        let code = code.trim();
        if code.is_empty() {
            return Err(CoreError::Cancelled);
        }
        Ok(code.to_owned())
    }

    fn choose_account(&mut self, accounts: &[Account]) -> Result<String, CoreError> {
        let items: Vec<String> = accounts
            .iter()
            .map(|a| match a.name {
                Some(ref name) => format!("{} ({name})", a.slug),
                None => a.slug.clone(),
            })
            .collect();

        let selection = Select::new()
            .with_prompt("Account")
            .items(&items)
            .default(0)
            .interact_opt()
            .map_err(prompt_err)?;

        selection
            .and_then(|i| accounts.get(i))
            .map(|a| a.slug.clone())
            .ok_or(CoreError::Cancelled)
    }
}
