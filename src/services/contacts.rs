//! Contact Service
//!
//! Every operation is scoped to the calling user. A contact owned by someone
//! else is reported exactly like one that does not exist.

use crate::error::ApiError;
use crate::models::*;
use crate::store::ContactStore;

use std::sync::Arc;
use uuid::Uuid;

pub struct ContactService {
    contacts: Arc<dyn ContactStore>,
}

impl ContactService {
    pub fn new(contacts: Arc<dyn ContactStore>) -> Self {
        Self { contacts }
    }

    fn owned(contact: Option<Contact>) -> Result<Contact, ApiError> {
        contact.ok_or_else(ApiError::not_found)
    }

    /// One page of the caller's contacts, optionally filtered by favorite
    pub async fn list(&self, owner: &User, query: &ContactQuery) -> Result<ContactPage, ApiError> {
        let (page, limit) = (query.page(), query.limit());
        let offset = query
            .offset()
            .ok_or_else(|| ApiError::BadRequest("page or limit is out of range".to_string()))?;

        let contacts = self
            .contacts
            .list(owner.id, query.favorite, offset, limit)
            .await?;
        let count = self.contacts.count(owner.id, query.favorite).await?;

        let data = contacts
            .into_iter()
            .map(|contact| ContactListItem {
                id: contact.id,
                name: contact.name,
                email: contact.email,
                phone: contact.phone,
                favorite: contact.favorite,
                owner: OwnerInfo {
                    id: owner.id,
                    email: owner.email.clone(),
                },
            })
            .collect();

        Ok(ContactPage {
            data,
            page: page.to_string(),
            limit: limit.to_string(),
            count: count.to_string(),
        })
    }

    pub async fn get_by_id(&self, owner: &User, id: Uuid) -> Result<Contact, ApiError> {
        Self::owned(self.contacts.find(id, owner.id).await?)
    }

    pub async fn create(&self, owner: &User, req: CreateContactRequest) -> Result<Contact, ApiError> {
        let contact = self.contacts.insert(owner.id, req).await?;
        tracing::debug!(contact_id = %contact.id, owner = %owner.id, "Contact created");
        Ok(contact)
    }

    /// Partial update; at least one field must be present
    pub async fn update(
        &self,
        owner: &User,
        id: Uuid,
        patch: UpdateContactRequest,
    ) -> Result<Contact, ApiError> {
        if patch.is_empty() {
            return Err(ApiError::BadRequest("missing fields".to_string()));
        }
        Self::owned(self.contacts.update(id, owner.id, &patch).await?)
    }

    pub async fn update_favorite(
        &self,
        owner: &User,
        id: Uuid,
        req: FavoriteRequest,
    ) -> Result<Contact, ApiError> {
        let favorite = req
            .favorite
            .ok_or_else(|| ApiError::BadRequest("missing field favorite".to_string()))?;

        let patch = UpdateContactRequest {
            favorite: Some(favorite),
            ..Default::default()
        };
        Self::owned(self.contacts.update(id, owner.id, &patch).await?)
    }

    pub async fn remove(&self, owner: &User, id: Uuid) -> Result<MessageResponse, ApiError> {
        let contact = Self::owned(self.contacts.delete(id, owner.id).await?)?;
        tracing::debug!(contact_id = %contact.id, owner = %owner.id, "Contact deleted");
        Ok(MessageResponse::new("contact deleted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: String::new(),
            subscription: Subscription::Starter,
            token: None,
            verify: true,
            verification_token: None,
            avatar_url: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn contact(name: &str, favorite: bool) -> CreateContactRequest {
        CreateContactRequest {
            name: name.to_string(),
            email: format!("{name}@example.com"),
            phone: "555-0100".to_string(),
            favorite,
        }
    }

    fn query(page: i64, limit: i64, favorite: Option<bool>) -> ContactQuery {
        ContactQuery {
            page: Some(page),
            limit: Some(limit),
            favorite,
        }
    }

    #[tokio::test]
    async fn test_list_pages_with_string_counters() {
        let service = ContactService::new(Arc::new(MemoryStore::new()));
        let owner = user("ada@example.com");
        for i in 0..25 {
            service.create(&owner, contact(&format!("c{i:02}"), false)).await.unwrap();
        }

        let page = service.list(&owner, &query(2, 10, None)).await.unwrap();
        assert_eq!(page.data.len(), 10);
        assert_eq!((page.page.as_str(), page.limit.as_str(), page.count.as_str()), ("2", "10", "25"));
        assert_eq!(page.data[0].name, "c10");
        assert_eq!(page.data[0].owner.email, "ada@example.com");

        let last = service.list(&owner, &query(3, 10, None)).await.unwrap();
        assert_eq!(last.data.len(), 5);

        let beyond = service.list(&owner, &query(4, 10, None)).await.unwrap();
        assert!(beyond.data.is_empty());
        assert_eq!(beyond.count, "25");
    }

    #[tokio::test]
    async fn test_list_rejects_overflowing_page() {
        let service = ContactService::new(Arc::new(MemoryStore::new()));
        let owner = user("ada@example.com");
        service.create(&owner, contact("a", false)).await.unwrap();

        let err = service
            .list(&owner, &query(i64::MAX, 20, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg == "page or limit is out of range"));
    }

    #[tokio::test]
    async fn test_list_filters_by_favorite() {
        let service = ContactService::new(Arc::new(MemoryStore::new()));
        let owner = user("ada@example.com");
        service.create(&owner, contact("a", true)).await.unwrap();
        service.create(&owner, contact("b", false)).await.unwrap();
        service.create(&owner, contact("c", true)).await.unwrap();

        let favorites = service.list(&owner, &query(1, 20, Some(true))).await.unwrap();
        assert_eq!(favorites.count, "2");
        assert!(favorites.data.iter().all(|c| c.favorite));
    }

    #[tokio::test]
    async fn test_foreign_contacts_look_missing() {
        let service = ContactService::new(Arc::new(MemoryStore::new()));
        let (alice, bob) = (user("alice@example.com"), user("bob@example.com"));
        let created = service.create(&alice, contact("carol", false)).await.unwrap();

        let err = service.get_by_id(&bob, created.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(msg) if msg == "Not found"));

        let patch = UpdateContactRequest {
            name: Some("mallory".into()),
            ..Default::default()
        };
        assert!(service.update(&bob, created.id, patch).await.is_err());
        assert!(service.remove(&bob, created.id).await.is_err());
        assert!(service.list(&bob, &ContactQuery::default()).await.unwrap().data.is_empty());

        let still_there = service.get_by_id(&alice, created.id).await.unwrap();
        assert_eq!(still_there.name, "carol");
    }

    #[tokio::test]
    async fn test_update_rules() {
        let service = ContactService::new(Arc::new(MemoryStore::new()));
        let owner = user("ada@example.com");
        let created = service.create(&owner, contact("carol", false)).await.unwrap();

        let err = service
            .update(&owner, created.id, UpdateContactRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg == "missing fields"));

        let patch = UpdateContactRequest {
            phone: Some("555-0199".into()),
            ..Default::default()
        };
        let updated = service.update(&owner, created.id, patch).await.unwrap();
        assert_eq!(updated.phone, "555-0199");
        assert_eq!(updated.name, "carol");
    }

    #[tokio::test]
    async fn test_update_favorite_requires_flag() {
        let service = ContactService::new(Arc::new(MemoryStore::new()));
        let owner = user("ada@example.com");
        let created = service.create(&owner, contact("carol", false)).await.unwrap();

        let err = service
            .update_favorite(&owner, created.id, FavoriteRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg == "missing field favorite"));

        let updated = service
            .update_favorite(&owner, created.id, FavoriteRequest { favorite: Some(true) })
            .await
            .unwrap();
        assert!(updated.favorite);
    }

    #[tokio::test]
    async fn test_remove_then_missing() {
        let service = ContactService::new(Arc::new(MemoryStore::new()));
        let owner = user("ada@example.com");
        let created = service.create(&owner, contact("carol", false)).await.unwrap();

        let response = service.remove(&owner, created.id).await.unwrap();
        assert_eq!(response.message, "contact deleted");
        assert!(matches!(
            service.get_by_id(&owner, created.id).await,
            Err(ApiError::NotFound(_))
        ));
    }
}
