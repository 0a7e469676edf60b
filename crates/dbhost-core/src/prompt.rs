use dbhost_api::Account;
use secrecy::SecretString;

use crate::error::CoreError;

/// Interactive input needed by the login flow.
///
/// The CLI implements this over the terminal; tests script it. Returning
/// [`CoreError::Cancelled`] from any method aborts the flow.
pub trait Prompter: Send {
    fn email(&mut self) -> Result<String, CoreError>;

    /// Read a password without echoing it.
    fn password(&mut self) -> Result<SecretString, CoreError>;

    /// Read a one-time second-factor code. Called again for each rejected code.
    fn second_factor(&mut self) -> Result<String, CoreError>;

    /// Pick the working account when more than one is available. Returns
    /// the chosen slug.
    fn choose_account(&mut self, accounts: &[Account]) -> Result<String, CoreError>;
}
