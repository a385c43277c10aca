//! Data Models
//!
//! Database entities, request and response DTOs, and session token claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// ============================================
// Database Entities
// ============================================

/// Subscription tier matching database type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Subscription {
    #[default]
    Starter,
    Pro,
    Business,
}

impl Subscription {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subscription::Starter => "starter",
            Subscription::Pro => "pro",
            Subscription::Business => "business",
        }
    }
}

impl std::fmt::Display for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User entity from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub subscription: Subscription,
    /// Current session token; `None` once logged out.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub verify: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    pub avatar_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_email_verified(&self) -> bool {
        self.verify
    }
}

/// Fields needed to persist a freshly registered user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub verification_token: String,
}

/// Contact entity from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub favorite: bool,
    pub owner: Uuid,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub updated_at: DateTime<Utc>,
}

// ============================================
// Request DTOs
// ============================================

/// Registration and login share the same body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CredentialsRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

pub type RegisterRequest = CredentialsRequest;
pub type LoginRequest = CredentialsRequest;

/// Resend verification email request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResendVerificationRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Subscription change request; unknown tiers are rejected at deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionRequest {
    pub subscription: Subscription,
}

/// Create contact request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateContactRequest {
    #[validate(length(min = 1, message = "missing required name field"))]
    pub name: String,

    #[validate(length(min = 1, message = "missing required email field"))]
    pub email: String,

    #[validate(length(min = 1, message = "missing required phone field"))]
    pub phone: String,

    #[serde(default)]
    pub favorite: bool,
}

/// Partial contact update. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateContactRequest {
    #[validate(length(min = 1))]
    pub name: Option<String>,

    #[validate(length(min = 1))]
    pub email: Option<String>,

    #[validate(length(min = 1))]
    pub phone: Option<String>,

    pub favorite: Option<bool>,
}

impl UpdateContactRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none() && self.favorite.is_none()
    }
}

/// Favorite flag toggle
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FavoriteRequest {
    pub favorite: Option<bool>,
}

/// Contact list query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub favorite: Option<bool>,
}

impl ContactQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).max(1)
    }

    /// Rows to skip; `None` when `page * limit` does not fit in an `i64`.
    pub fn offset(&self) -> Option<i64> {
        (self.page() - 1).checked_mul(self.limit())
    }
}

// ============================================
// Response DTOs
// ============================================

/// Public profile fields; never carries hashes or tokens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicUser {
    pub email: String,
    pub subscription: Subscription,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            subscription: user.subscription,
        }
    }
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            subscription: user.subscription,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterResponse {
    pub user: PublicUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvatarResponse {
    #[serde(rename = "avatarURL")]
    pub avatar_url: String,
}

/// Owner as embedded in contact listings
#[derive(Debug, Clone, Serialize)]
pub struct OwnerInfo {
    pub id: Uuid,
    pub email: String,
}

/// Contact as it appears in a listing
#[derive(Debug, Clone, Serialize)]
pub struct ContactListItem {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub favorite: bool,
    pub owner: OwnerInfo,
}

/// One page of contacts. Counters are decimal strings on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct ContactPage {
    pub data: Vec<ContactListItem>,
    pub page: String,
    pub limit: String,
    pub count: String,
}

/// Simple message response
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================
// JWT Claims
// ============================================

/// JWT claims for session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// JWT ID, keeps tokens issued within the same second distinct
    pub jti: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_query_defaults() {
        let query = ContactQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), 20);
        assert_eq!(query.offset(), Some(0));
    }

    #[test]
    fn test_contact_query_offset_and_clamping() {
        let query = ContactQuery {
            page: Some(3),
            limit: Some(10),
            favorite: None,
        };
        assert_eq!(query.offset(), Some(20));

        let query = ContactQuery {
            page: Some(0),
            limit: Some(-5),
            favorite: None,
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), 1);
    }

    #[test]
    fn test_contact_query_offset_overflow() {
        let query = ContactQuery {
            page: Some(i64::MAX),
            limit: Some(20),
            favorite: None,
        };
        assert_eq!(query.offset(), None);

        let query = ContactQuery {
            page: Some(2),
            limit: Some(i64::MAX),
            favorite: None,
        };
        assert_eq!(query.offset(), Some(i64::MAX));

        let query = ContactQuery {
            page: Some(3),
            limit: Some(i64::MAX),
            favorite: None,
        };
        assert_eq!(query.offset(), None);
    }

    #[test]
    fn test_subscription_wire_format() {
        let tier: Subscription = serde_json::from_str("\"business\"").unwrap();
        assert_eq!(tier, Subscription::Business);
        assert!(serde_json::from_str::<Subscription>("\"enterprise\"").is_err());
        assert_eq!(Subscription::default().to_string(), "starter");
    }

    #[test]
    fn test_empty_patch_detection() {
        assert!(UpdateContactRequest::default().is_empty());
        let patch: UpdateContactRequest = serde_json::from_str(r#"{"phone":"555"}"#).unwrap();
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_contact_timestamps_are_not_serialized() {
        let contact = Contact {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: "555".into(),
            favorite: false,
            owner: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&contact).unwrap();
        assert!(value.get("created_at").is_none());
        assert!(value.get("updated_at").is_none());
        assert!(value.get("owner").is_some());
    }
}
