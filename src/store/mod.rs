//! Persistence ports for users and contacts.
//!
//! Two implementations ship with the crate: [`PgStore`] backed by PostgreSQL
//! and [`MemoryStore`] for tests and database-less local runs. Contact
//! lookups are always scoped by owner, so a foreign record is never returned
//! to a caller.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{Contact, CreateContactRequest, NewUser, Subscription, UpdateContactRequest, User};

use async_trait::async_trait;
use uuid::Uuid;

/// Storage failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The email is already registered. Raised by the store's own
    /// uniqueness guard, independent of any application-level check.
    #[error("Email already registered")]
    EmailTaken,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Atomically mark the holder of `token` verified and clear the token.
    /// Returns `None` when no user holds it.
    async fn consume_verification_token(&self, token: &str) -> Result<Option<User>, StoreError>;

    /// Replace the session token; `None` logs the user out.
    async fn set_token(&self, id: Uuid, token: Option<&str>) -> Result<(), StoreError>;

    async fn set_subscription(
        &self,
        id: Uuid,
        subscription: Subscription,
    ) -> Result<Option<User>, StoreError>;

    async fn set_avatar_url(&self, id: Uuid, avatar_url: &str) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn list(
        &self,
        owner: Uuid,
        favorite: Option<bool>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Contact>, StoreError>;

    async fn count(&self, owner: Uuid, favorite: Option<bool>) -> Result<i64, StoreError>;

    async fn insert(&self, owner: Uuid, contact: CreateContactRequest) -> Result<Contact, StoreError>;

    async fn find(&self, id: Uuid, owner: Uuid) -> Result<Option<Contact>, StoreError>;

    async fn update(
        &self,
        id: Uuid,
        owner: Uuid,
        patch: &UpdateContactRequest,
    ) -> Result<Option<Contact>, StoreError>;

    async fn delete(&self, id: Uuid, owner: Uuid) -> Result<Option<Contact>, StoreError>;
}
