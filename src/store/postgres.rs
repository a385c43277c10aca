//! PostgreSQL store.

use super::{ContactStore, StoreError, UserStore};
use crate::models::{Contact, CreateContactRequest, NewUser, Subscription, UpdateContactRequest, User};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let db = PgPool::connect(database_url).await?;
        Ok(Self::new(db))
    }

    /// Create the schema if it does not exist yet
    pub async fn migrate(&self) -> Result<(), StoreError> {
        tracing::info!("Running database migrations");

        sqlx::query(
            r#"
            DO $$ BEGIN
                CREATE TYPE subscription AS ENUM ('starter', 'pro', 'business');
            EXCEPTION
                WHEN duplicate_object THEN null;
            END $$;
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                subscription subscription NOT NULL DEFAULT 'starter',
                token TEXT,
                verify BOOLEAN NOT NULL DEFAULT FALSE,
                verification_token VARCHAR(255) UNIQUE,
                avatar_url VARCHAR(500) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS contacts (
                id UUID PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                email VARCHAR(255) NOT NULL,
                phone VARCHAR(64) NOT NULL,
                favorite BOOLEAN NOT NULL DEFAULT FALSE,
                owner UUID NOT NULL REFERENCES users(id),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_contacts_owner ON contacts(owner, created_at);")
            .execute(&self.db)
            .await?;

        tracing::info!("Database migrations completed successfully");
        Ok(())
    }
}

fn map_insert_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::EmailTaken,
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, avatar_url, verification_token)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.avatar_url)
        .bind(&user.verification_token)
        .fetch_one(&self.db)
        .await
        .map_err(map_insert_error)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn consume_verification_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as(
            r#"
            UPDATE users SET verify = TRUE, verification_token = NULL, updated_at = NOW()
            WHERE verification_token = $1
            RETURNING *
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_token(&self, id: Uuid, token: Option<&str>) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET token = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(user_id = %id, "Session token update matched no user");
        }

        Ok(())
    }

    async fn set_subscription(
        &self,
        id: Uuid,
        subscription: Subscription,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as(
            "UPDATE users SET subscription = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(subscription)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_avatar_url(&self, id: Uuid, avatar_url: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as(
            "UPDATE users SET avatar_url = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(avatar_url)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl ContactStore for PgStore {
    async fn list(
        &self,
        owner: Uuid,
        favorite: Option<bool>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Contact>, StoreError> {
        let contacts = sqlx::query_as(
            r#"
            SELECT * FROM contacts
            WHERE owner = $1 AND ($2::BOOLEAN IS NULL OR favorite = $2)
            ORDER BY created_at, id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(owner)
        .bind(favorite)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        Ok(contacts)
    }

    async fn count(&self, owner: Uuid, favorite: Option<bool>) -> Result<i64, StoreError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM contacts WHERE owner = $1 AND ($2::BOOLEAN IS NULL OR favorite = $2)",
        )
        .bind(owner)
        .bind(favorite)
        .fetch_one(&self.db)
        .await?;
        Ok(total)
    }

    async fn insert(&self, owner: Uuid, contact: CreateContactRequest) -> Result<Contact, StoreError> {
        let contact = sqlx::query_as(
            r#"
            INSERT INTO contacts (id, name, email, phone, favorite, owner)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&contact.name)
        .bind(&contact.email)
        .bind(&contact.phone)
        .bind(contact.favorite)
        .bind(owner)
        .fetch_one(&self.db)
        .await?;
        Ok(contact)
    }

    async fn find(&self, id: Uuid, owner: Uuid) -> Result<Option<Contact>, StoreError> {
        let contact = sqlx::query_as("SELECT * FROM contacts WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.db)
            .await?;
        Ok(contact)
    }

    async fn update(
        &self,
        id: Uuid,
        owner: Uuid,
        patch: &UpdateContactRequest,
    ) -> Result<Option<Contact>, StoreError> {
        let contact = sqlx::query_as(
            r#"
            UPDATE contacts SET
                name = COALESCE($3, name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                favorite = COALESCE($6, favorite),
                updated_at = NOW()
            WHERE id = $1 AND owner = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(&patch.name)
        .bind(&patch.email)
        .bind(&patch.phone)
        .bind(patch.favorite)
        .fetch_optional(&self.db)
        .await?;
        Ok(contact)
    }

    async fn delete(&self, id: Uuid, owner: Uuid) -> Result<Option<Contact>, StoreError> {
        let contact = sqlx::query_as("DELETE FROM contacts WHERE id = $1 AND owner = $2 RETURNING *")
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.db)
            .await?;
        Ok(contact)
    }
}
