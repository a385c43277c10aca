//! In-process store used by tests and when no `DATABASE_URL` is configured.

use super::{ContactStore, StoreError, UserStore};
use crate::models::{Contact, CreateContactRequest, NewUser, Subscription, UpdateContactRequest, User};

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Store holding everything in memory. State is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    /// Kept in insertion order so listings page stably.
    contacts: RwLock<Vec<Contact>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update_user<F>(&self, id: Uuid, apply: F) -> Option<User>
    where
        F: FnOnce(&mut User) + Send,
    {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id)?;
        apply(user);
        user.updated_at = Utc::now();
        Some(user.clone())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == new_user.email) {
            return Err(StoreError::EmailTaken);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            password_hash: new_user.password_hash,
            subscription: Subscription::default(),
            token: None,
            verify: false,
            verification_token: Some(new_user.verification_token),
            avatar_url: new_user.avatar_url,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn consume_verification_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        let user = users
            .values_mut()
            .find(|u| u.verification_token.as_deref() == Some(token));

        Ok(user.map(|user| {
            user.verify = true;
            user.verification_token = None;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn set_token(&self, id: Uuid, token: Option<&str>) -> Result<(), StoreError> {
        let token = token.map(str::to_string);
        if self.update_user(id, |u| u.token = token).await.is_none() {
            tracing::warn!(user_id = %id, "Session token update matched no user");
        }
        Ok(())
    }

    async fn set_subscription(
        &self,
        id: Uuid,
        subscription: Subscription,
    ) -> Result<Option<User>, StoreError> {
        Ok(self.update_user(id, |u| u.subscription = subscription).await)
    }

    async fn set_avatar_url(&self, id: Uuid, avatar_url: &str) -> Result<Option<User>, StoreError> {
        let avatar_url = avatar_url.to_string();
        Ok(self.update_user(id, |u| u.avatar_url = avatar_url).await)
    }
}

fn is_listed(contact: &Contact, owner: Uuid, favorite: Option<bool>) -> bool {
    contact.owner == owner && favorite.map_or(true, |f| contact.favorite == f)
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn list(
        &self,
        owner: Uuid,
        favorite: Option<bool>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Contact>, StoreError> {
        let contacts = self.contacts.read().await;
        Ok(contacts
            .iter()
            .filter(|c| is_listed(c, owner, favorite))
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn count(&self, owner: Uuid, favorite: Option<bool>) -> Result<i64, StoreError> {
        let contacts = self.contacts.read().await;
        let total = contacts.iter().filter(|c| is_listed(c, owner, favorite)).count();
        Ok(i64::try_from(total).unwrap_or(i64::MAX))
    }

    async fn insert(&self, owner: Uuid, contact: CreateContactRequest) -> Result<Contact, StoreError> {
        let now = Utc::now();
        let contact = Contact {
            id: Uuid::new_v4(),
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            favorite: contact.favorite,
            owner,
            created_at: now,
            updated_at: now,
        };
        self.contacts.write().await.push(contact.clone());
        Ok(contact)
    }

    async fn find(&self, id: Uuid, owner: Uuid) -> Result<Option<Contact>, StoreError> {
        let contacts = self.contacts.read().await;
        Ok(contacts
            .iter()
            .find(|c| c.id == id && c.owner == owner)
            .cloned())
    }

    async fn update(
        &self,
        id: Uuid,
        owner: Uuid,
        patch: &UpdateContactRequest,
    ) -> Result<Option<Contact>, StoreError> {
        let mut contacts = self.contacts.write().await;
        let Some(contact) = contacts.iter_mut().find(|c| c.id == id && c.owner == owner) else {
            return Ok(None);
        };

        if let Some(name) = &patch.name {
            contact.name = name.clone();
        }
        if let Some(email) = &patch.email {
            contact.email = email.clone();
        }
        if let Some(phone) = &patch.phone {
            contact.phone = phone.clone();
        }
        if let Some(favorite) = patch.favorite {
            contact.favorite = favorite;
        }
        contact.updated_at = Utc::now();

        Ok(Some(contact.clone()))
    }

    async fn delete(&self, id: Uuid, owner: Uuid) -> Result<Option<Contact>, StoreError> {
        let mut contacts = self.contacts.write().await;
        let position = contacts.iter().position(|c| c.id == id && c.owner == owner);
        Ok(position.map(|index| contacts.remove(index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            avatar_url: "https://example.com/avatar".to_string(),
            verification_token: format!("token-{email}"),
        }
    }

    fn new_contact(name: &str, favorite: bool) -> CreateContactRequest {
        CreateContactRequest {
            name: name.to_string(),
            email: format!("{name}@example.com"),
            phone: "555-0100".to_string(),
            favorite,
        }
    }

    #[tokio::test]
    async fn test_email_uniqueness_is_enforced_by_the_store() {
        let store = MemoryStore::new();
        UserStore::insert(&store, new_user("a@example.com")).await.unwrap();

        let err = UserStore::insert(&store, new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken));
    }

    #[tokio::test]
    async fn test_verification_token_is_consumed_once() {
        let store = MemoryStore::new();
        UserStore::insert(&store, new_user("a@example.com")).await.unwrap();

        let verified = store
            .consume_verification_token("token-a@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(verified.verify);
        assert!(verified.verification_token.is_none());

        assert!(store
            .consume_verification_token("token-a@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_contacts_are_owner_scoped() {
        let store = MemoryStore::new();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let contact = ContactStore::insert(&store, alice, new_contact("carol", false))
            .await
            .unwrap();

        assert!(store.find(contact.id, bob).await.unwrap().is_none());
        assert!(ContactStore::update(&store, contact.id, bob, &UpdateContactRequest::default())
            .await
            .unwrap()
            .is_none());
        assert!(store.delete(contact.id, bob).await.unwrap().is_none());
        assert_eq!(store.find(contact.id, alice).await.unwrap(), Some(contact));
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        for i in 0..5 {
            ContactStore::insert(&store, owner, new_contact(&format!("c{i}"), i % 2 == 0))
                .await
                .unwrap();
        }
        ContactStore::insert(&store, Uuid::new_v4(), new_contact("other", true))
            .await
            .unwrap();

        assert_eq!(store.count(owner, None).await.unwrap(), 5);
        assert_eq!(store.count(owner, Some(true)).await.unwrap(), 3);

        let page = store.list(owner, None, 2, 2).await.unwrap();
        let names: Vec<_> = page.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["c2", "c3"]);
    }
}
