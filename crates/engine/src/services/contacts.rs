//! Delivery contacts of the calling account.

use tradepost_core::contact::ContactInput;
use tradepost_core::views::{ContactView, WriteStatus};
use tradepost_core::{ContactId, ValidationErrors, parse_id_list};

use crate::error::{Result, ServiceError};
use crate::identity::AuthContext;
use crate::store::{ContactRecord, ContactStore};

fn view(record: ContactRecord) -> ContactView {
    ContactView {
        id: record.id,
        fields: record.fields,
    }
}

/// Contact service.
pub struct ContactService<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> ContactService<'a, S>
where
    S: ContactStore + ?Sized,
{
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Create a contact for the caller.
    ///
    /// # Errors
    ///
    /// `Validation` when city, street or phone is missing or a field is too long.
    pub async fn create(&self, ctx: &AuthContext, input: ContactInput) -> Result<ContactView> {
        let user = ctx.require_user()?.user_id;
        let fields = input.into_fields()?;
        let record = self.store.create_contact(user, &fields).await?;
        tracing::info!(%user, contact_id = %record.id, "Contact created");
        Ok(view(record))
    }

    /// Patch one of the caller's contacts with the supplied fields.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty or invalid patch, `NotFound` when the
    /// contact does not exist or belongs to someone else.
    pub async fn update(
        &self,
        ctx: &AuthContext,
        id: ContactId,
        input: ContactInput,
    ) -> Result<ContactView> {
        let user = ctx.require_user()?.user_id;
        let patch = input.into_patch()?;
        let record = self
            .store
            .update_contact(user, id, &patch)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("contact {id}")))?;
        tracing::info!(%user, contact_id = %id, "Contact updated");
        Ok(view(record))
    }

    /// Delete the caller's contacts named in a comma-separated id list.
    ///
    /// Non-digit tokens and ids of other accounts are ignored.
    ///
    /// # Errors
    ///
    /// `Validation` when the list holds no valid id.
    pub async fn delete(&self, ctx: &AuthContext, raw: &str) -> Result<WriteStatus> {
        let user = ctx.require_user()?.user_id;
        let ids = parse_id_list(raw, ContactId::parse_digits);
        if ids.is_empty() {
            return Err(ValidationErrors::single("items", "no valid contact ids supplied").into());
        }
        let deleted = self.store.delete_contacts(user, &ids).await?;
        tracing::info!(%user, requested = ids.len(), deleted, "Contacts deleted");
        Ok(WriteStatus::affected(deleted))
    }

    /// The caller's contacts in creation order.
    ///
    /// # Errors
    ///
    /// Returns an authentication error or a store failure.
    pub async fn list(&self, ctx: &AuthContext) -> Result<Vec<ContactView>> {
        let user = ctx.require_user()?.user_id;
        let contacts: Vec<ContactView> = self
            .store
            .list_contacts(user)
            .await?
            .into_iter()
            .map(view)
            .collect();
        tracing::debug!(%user, count = contacts.len(), "Listed contacts");
        Ok(contacts)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::services::testing::buyer;
    use crate::store::MemoryStore;

    fn input(city: &str) -> ContactInput {
        ContactInput {
            city: Some(city.to_owned()),
            street: Some("Lenina".to_owned()),
            phone: Some("+7 900 000-00-00".to_owned()),
            ..ContactInput::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let store = MemoryStore::new();
        let alice = buyer(&store, "alice@example.com").await;
        let bob = buyer(&store, "bob@example.com").await;
        let service = ContactService::new(&store);
        let created = service.create(&alice, input("Moscow")).await.unwrap();
        assert_eq!(created.fields.city, "Moscow");
        assert_eq!(created.fields.house, "");

        let listed = service.list(&alice).await.unwrap();
        assert_eq!(listed, vec![created]);
        assert!(service.list(&bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_requires_fields() {
        let store = MemoryStore::new();
        let alice = buyer(&store, "alice@example.com").await;
        let err = ContactService::new(&store)
            .create(&alice, ContactInput::default())
            .await
            .unwrap_err();
        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        let fields: Vec<_> = errors.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["city", "street", "phone"]);
    }

    #[tokio::test]
    async fn test_update_foreign_contact_is_not_found() {
        let store = MemoryStore::new();
        let alice = buyer(&store, "alice@example.com").await;
        let bob = buyer(&store, "bob@example.com").await;
        let service = ContactService::new(&store);
        let created = service.create(&alice, input("Moscow")).await.unwrap();
        let patch = ContactInput {
            city: Some("Kazan".to_owned()),
            ..ContactInput::default()
        };

        let err = service
            .update(&bob, created.id, patch.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let updated = service.update(&alice, created.id, patch).await.unwrap();
        assert_eq!(updated.fields.city, "Kazan");
        assert_eq!(updated.fields.street, "Lenina");
    }

    #[tokio::test]
    async fn test_delete_ignores_bad_tokens() {
        let store = MemoryStore::new();
        let alice = buyer(&store, "alice@example.com").await;
        let service = ContactService::new(&store);
        let first = service.create(&alice, input("Moscow")).await.unwrap();
        service.create(&alice, input("Omsk")).await.unwrap();

        let raw = format!("{},abc,999", first.id);
        let status = service.delete(&alice, &raw).await.unwrap();
        assert_eq!(status.affected, 1);
        assert_eq!(service.list(&alice).await.unwrap().len(), 1);

        let err = service.delete(&alice, "abc, x").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
