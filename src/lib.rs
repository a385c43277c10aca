//! Contacts API
//!
//! Multi-tenant contacts service providing:
//! - User registration with email verification
//! - JWT login with a single active session per user
//! - Subscription tiers and avatar uploads
//! - Owner-scoped contact CRUD with pagination and favorite filtering
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables by
//! [`AppConfig::from_env`]:
//! - `SECRET_KEY` - Secret key for signing session tokens (required, min 32 chars)
//! - `BASE_URL` - Public base URL used in verification links (default: `http://localhost:3000`)
//! - `PORT` - Listen port (default: 3000)
//! - `DATABASE_URL` - PostgreSQL connection string (optional, in-memory store if unset)
//! - `SESSION_TTL_HOURS` - Session token lifetime (default: 23)
//! - `AVATARS_DIR`, `TEMP_DIR`, `AVATAR_SIZE` - Avatar storage
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `MAIL_FROM` - Outbound email
//!
//! # Usage
//!
//! ```rust,ignore
//! use contacts_api::{build_app, connect_stores, mailer_from_config, AppConfig};
//!
//! let config = AppConfig::from_env()?;
//! let (users, contacts) = connect_stores(&config).await?;
//! let app = build_app(&config, users, contacts, mailer_from_config(&config)?)?;
//! axum::serve(listener, app).await?;
//! ```

pub mod avatar;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod password;
pub mod services;
pub mod store;
pub mod tokens;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::ApiError;
pub use handlers::AppState;
pub use models::*;
pub use services::{AuthService, ContactService};

use axum::Router;
use mailer::{LogMailer, Mailer, SmtpMailer};
use std::sync::Arc;
use store::{ContactStore, MemoryStore, PgStore, UserStore};

/// Wire services over the given collaborators and build the router
pub fn build_app(
    config: &AppConfig,
    users: Arc<dyn UserStore>,
    contacts: Arc<dyn ContactStore>,
    mailer: Arc<dyn Mailer>,
) -> Result<Router, ApiError> {
    let state = AppState {
        auth: Arc::new(AuthService::new(users, mailer, config)?),
        contacts: Arc::new(ContactService::new(contacts)),
    };

    Ok(handlers::create_routes(state, &config.avatars_dir))
}

/// Open the configured store. Without `DATABASE_URL` everything lives in memory.
pub async fn connect_stores(
    config: &AppConfig,
) -> Result<(Arc<dyn UserStore>, Arc<dyn ContactStore>), ApiError> {
    match &config.database_url {
        Some(url) => {
            let store = Arc::new(PgStore::connect(url).await?);
            store.migrate().await?;
            tracing::info!("Connected to PostgreSQL");
            let users: Arc<dyn UserStore> = store.clone();
            let contacts: Arc<dyn ContactStore> = store;
            Ok((users, contacts))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data will not persist");
            let store = Arc::new(MemoryStore::new());
            let users: Arc<dyn UserStore> = store.clone();
            let contacts: Arc<dyn ContactStore> = store;
            Ok((users, contacts))
        }
    }
}

/// SMTP delivery when configured, otherwise log-only
pub fn mailer_from_config(config: &AppConfig) -> Result<Arc<dyn Mailer>, ApiError> {
    match &config.smtp {
        Some(smtp) => Ok(Arc::new(SmtpMailer::new(smtp)?)),
        None => {
            tracing::warn!("SMTP_HOST not set, verification emails will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}
