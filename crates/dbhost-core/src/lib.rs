// dbhost-core: Session lifecycle between dbhost-api and the CLI.
//
// Turns a stored credential (or an interactive login) into a `Session`,
// selects the working account, and tears everything down on logout.

pub mod error;
pub mod prompt;
pub mod session;

pub use error::CoreError;
pub use prompt::Prompter;
pub use session::{LogoutReport, Revocation, SessionManager};
