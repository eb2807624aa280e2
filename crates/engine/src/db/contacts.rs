//! Delivery contacts.

use async_trait::async_trait;
use tradepost_core::contact::{ContactFields, ContactPatch};
use tradepost_core::{ContactId, UserId};

use super::{PgStore, raw_ids};
use crate::store::{ContactRecord, ContactStore, RepositoryError};

const CONTACT_COLUMNS: &str =
    "id, user_id, city, street, house, structure, building, apartment, phone";

#[async_trait]
impl ContactStore for PgStore {
    async fn create_contact(
        &self,
        user: UserId,
        fields: &ContactFields,
    ) -> Result<ContactRecord, RepositoryError> {
        let record = sqlx::query_as::<_, ContactRecord>(&format!(
            "INSERT INTO contacts
                 (user_id, city, street, house, structure, building, apartment, phone)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(user)
        .bind(&fields.city)
        .bind(&fields.street)
        .bind(&fields.house)
        .bind(&fields.structure)
        .bind(&fields.building)
        .bind(&fields.apartment)
        .bind(&fields.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;
        Ok(record)
    }

    async fn update_contact(
        &self,
        user: UserId,
        id: ContactId,
        patch: &ContactPatch,
    ) -> Result<Option<ContactRecord>, RepositoryError> {
        Ok(sqlx::query_as::<_, ContactRecord>(&format!(
            "UPDATE contacts
                SET city = COALESCE($3, city),
                    street = COALESCE($4, street),
                    house = COALESCE($5, house),
                    structure = COALESCE($6, structure),
                    building = COALESCE($7, building),
                    apartment = COALESCE($8, apartment),
                    phone = COALESCE($9, phone)
              WHERE id = $1 AND user_id = $2
             RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(id)
        .bind(user)
        .bind(patch.city.as_deref())
        .bind(patch.street.as_deref())
        .bind(patch.house.as_deref())
        .bind(patch.structure.as_deref())
        .bind(patch.building.as_deref())
        .bind(patch.apartment.as_deref())
        .bind(patch.phone.as_deref())
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_contacts(
        &self,
        user: UserId,
        ids: &[ContactId],
    ) -> Result<u64, RepositoryError> {
        // Orders that reference a deleted contact keep it as NULL.
        Ok(
            sqlx::query("DELETE FROM contacts WHERE user_id = $1 AND id = ANY($2)")
                .bind(user)
                .bind(raw_ids(ids.iter().copied()))
                .execute(&self.pool)
                .await?
                .rows_affected(),
        )
    }

    async fn list_contacts(&self, user: UserId) -> Result<Vec<ContactRecord>, RepositoryError> {
        Ok(sqlx::query_as::<_, ContactRecord>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?)
    }
}
