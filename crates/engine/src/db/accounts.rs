//! Accounts and confirmation tokens.

use async_trait::async_trait;
use tradepost_core::{Email, UserId};

use super::{PgStore, conflict_on_unique};
use crate::store::{AccountRecord, AccountStore, NewAccount, RepositoryError};

const ACCOUNT_COLUMNS: &str = "id, email, first_name, last_name, company, position, role, active";

#[async_trait]
impl AccountStore for PgStore {
    async fn create_account(
        &self,
        account: &NewAccount,
        token: &str,
    ) -> Result<AccountRecord, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, AccountRecord>(&format!(
            "INSERT INTO accounts (email, first_name, last_name, company, position, role)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(&account.email)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.company)
        .bind(&account.position)
        .bind(account.role)
        .fetch_one(&mut *tx)
        .await
        .map_err(conflict_on_unique("email already exists"))?;

        sqlx::query("INSERT INTO confirmation_tokens (user_id, token) VALUES ($1, $2)")
            .bind(record.id)
            .bind(token)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn confirm_account(&self, email: &Email, token: &str) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let confirmed = sqlx::query_scalar::<_, UserId>(
            r"
            DELETE FROM confirmation_tokens t
            USING accounts a
            WHERE t.user_id = a.id AND a.email = $1 AND t.token = $2
            RETURNING t.user_id
            ",
        )
        .bind(email)
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(user_id) = confirmed else {
            return Ok(false);
        };

        sqlx::query("UPDATE accounts SET active = TRUE WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn get_account(&self, id: UserId) -> Result<Option<AccountRecord>, RepositoryError> {
        Ok(sqlx::query_as::<_, AccountRecord>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn get_account_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<AccountRecord>, RepositoryError> {
        Ok(sqlx::query_as::<_, AccountRecord>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }
}
