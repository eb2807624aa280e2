//! Registration, confirmation and caller resolution.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tradepost_core::views::{AccountView, ContactView};
use tradepost_core::{Email, UserId, UserRole, ValidationErrors};

use crate::error::{Result, ServiceError};
use crate::identity::{AuthContext, Principal};
use crate::notify::{Notification, NotificationSink};
use crate::store::{AccountStore, ContactStore, NewAccount};

const NAME_MAX: usize = 150;
const COMPANY_MAX: usize = 40;
const POSITION_MAX: usize = 40;
const TOKEN_BYTES: usize = 20;

/// Registration fields as submitted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RegistrationInput {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    /// `shop` or `buyer`; defaults to `buyer`.
    pub role: Option<String>,
}

impl RegistrationInput {
    fn validate(self) -> std::result::Result<NewAccount, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let email = match self.email.as_deref().map(Email::parse) {
            None => {
                errors.push("email", "this field is required");
                None
            }
            Some(Err(err)) => {
                errors.push("email", err.to_string());
                None
            }
            Some(Ok(email)) => Some(email),
        };
        let first_name = errors.text("first_name", self.first_name.as_deref(), true, NAME_MAX);
        let last_name = errors.text("last_name", self.last_name.as_deref(), true, NAME_MAX);
        let company = errors.text("company", self.company.as_deref(), false, COMPANY_MAX);
        let position = errors.text("position", self.position.as_deref(), false, POSITION_MAX);
        let role = match self.role.as_deref().map(str::trim) {
            None | Some("") => Some(UserRole::default()),
            Some(raw) => raw.parse::<UserRole>().map_or_else(
                |err| {
                    errors.push("role", err);
                    None
                },
                Some,
            ),
        };
        match (email, first_name, last_name, role) {
            (Some(email), Some(first_name), Some(last_name), Some(role)) if errors.is_empty() => {
                Ok(NewAccount {
                    email,
                    first_name,
                    last_name,
                    company: company.unwrap_or_default(),
                    position: position.unwrap_or_default(),
                    role,
                })
            }
            _ => Err(errors),
        }
    }
}

fn confirmation_token() -> String {
    let mut bytes = [0_u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Account service.
pub struct AccountService<'a, S: ?Sized, N: ?Sized> {
    store: &'a S,
    notifier: &'a N,
}

impl<'a, S, N> AccountService<'a, S, N>
where
    S: AccountStore + ContactStore + ?Sized,
    N: NotificationSink + ?Sized,
{
    #[must_use]
    pub const fn new(store: &'a S, notifier: &'a N) -> Self {
        Self { store, notifier }
    }

    /// Create an inactive account and announce its confirmation token.
    ///
    /// # Errors
    ///
    /// `Validation` for bad fields, `Conflict` when the e-mail is taken.
    pub async fn register(&self, input: RegistrationInput) -> Result<AccountView> {
        let account = input.validate()?;
        let token = confirmation_token();
        let record = self.store.create_account(&account, &token).await?;
        tracing::info!(user_id = %record.id, role = %record.role, "Account registered");
        self.notifier
            .notify(Notification::AccountRegistered {
                user_id: record.id,
                email: record.email.clone(),
                token,
            })
            .await;
        Ok(AccountView {
            id: record.id,
            email: record.email,
            first_name: record.first_name,
            last_name: record.last_name,
            company: record.company,
            position: record.position,
            role: record.role,
            contacts: Vec::new(),
        })
    }

    /// Activate the account holding `token`.
    ///
    /// # Errors
    ///
    /// `Validation` for a malformed e-mail, `NotFound` when the pair does not
    /// match a pending confirmation.
    pub async fn confirm(&self, email: &str, token: &str) -> Result<()> {
        let email = Email::parse(email)
            .map_err(|err| ValidationErrors::single("email", err.to_string()))?;
        if !self.store.confirm_account(&email, token.trim()).await? {
            tracing::warn!(%email, "Account confirmation rejected");
            return Err(ServiceError::NotFound("confirmation token".to_owned()));
        }
        tracing::info!(%email, "Account confirmed");
        Ok(())
    }

    /// Caller context for `user_id`; unknown ids are anonymous.
    ///
    /// # Errors
    ///
    /// Returns a store failure.
    pub async fn resolve(&self, user_id: UserId) -> Result<AuthContext> {
        Ok(self
            .store
            .get_account(user_id)
            .await?
            .map_or(AuthContext::Anonymous, |account| {
                AuthContext::Authenticated(Principal {
                    user_id: account.id,
                    role: account.role,
                    active: account.active,
                })
            }))
    }

    /// Caller context for the account with `email`.
    ///
    /// # Errors
    ///
    /// `Validation` for a malformed e-mail, or a store failure.
    pub async fn resolve_email(&self, email: &str) -> Result<AuthContext> {
        let email = Email::parse(email)
            .map_err(|err| ValidationErrors::single("email", err.to_string()))?;
        match self.store.get_account_by_email(&email).await? {
            Some(account) => self.resolve(account.id).await,
            None => Ok(AuthContext::Anonymous),
        }
    }

    /// The caller's account with its contacts.
    ///
    /// # Errors
    ///
    /// Returns an authentication error or a store failure.
    pub async fn profile(&self, ctx: &AuthContext) -> Result<AccountView> {
        let user = ctx.require_user()?.user_id;
        let account = self
            .store
            .get_account(user)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("account {user}")))?;
        let contacts = self
            .store
            .list_contacts(user)
            .await?
            .into_iter()
            .map(|record| ContactView {
                id: record.id,
                fields: record.fields,
            })
            .collect();
        Ok(AccountView {
            id: account.id,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            company: account.company,
            position: account.position,
            role: account.role,
            contacts,
        })
    }
}
