//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! # Register a shop account; prints the account and its confirmation token
//! tradepost account create -e shop@example.com --first-name Ivan --last-name Petrov -r shop
//!
//! # Activate it
//! tradepost account confirm -e shop@example.com -t 5f0c...
//! ```

use serde::Serialize;
use tradepost_core::views::AccountView;
use tradepost_engine::services::{AccountService, RegistrationInput};
use tradepost_engine::{MemorySink, Notification};

use super::{CommandError, connect, print_json};

/// Arguments of `account create`.
#[derive(Debug)]
pub struct NewAccountArgs {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub position: Option<String>,
    pub role: String,
}

#[derive(Serialize)]
struct Registered {
    account: AccountView,
    token: Option<String>,
}

/// Register an inactive account.
///
/// The confirmation token is printed with the account so the operator can
/// pass it on.
///
/// # Errors
///
/// Returns an error if a field is invalid or the e-mail is taken.
pub async fn create(args: NewAccountArgs) -> Result<(), CommandError> {
    let (_, store) = connect().await?;
    let sink = MemorySink::new();
    let account = AccountService::new(&store, &sink)
        .register(RegistrationInput {
            email: Some(args.email),
            first_name: Some(args.first_name),
            last_name: Some(args.last_name),
            company: args.company,
            position: args.position,
            role: Some(args.role),
        })
        .await?;

    let token = sink.events().into_iter().find_map(|event| match event {
        Notification::AccountRegistered { token, .. } => Some(token),
        Notification::NewOrder { .. } => None,
    });
    tracing::info!(user_id = %account.id, email = %account.email, "Account created");
    print_json(&Registered { account, token })
}

/// Activate an account.
///
/// # Errors
///
/// Returns an error if the e-mail and token do not match a pending
/// confirmation.
pub async fn confirm(email: &str, token: &str) -> Result<(), CommandError> {
    let (_, store) = connect().await?;
    AccountService::new(&store, &MemorySink::new())
        .confirm(email, token)
        .await?;
    tracing::info!(%email, "Account is now active");
    Ok(())
}
