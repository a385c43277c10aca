//! Authentication Service
//!
//! Registration, email verification, login/logout, session resolution for the
//! guard, and profile changes (subscription, avatar).

use crate::avatar::{default_avatar_url, AvatarStorage, AvatarUpload};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::mailer::{EmailMessage, Mailer};
use crate::models::*;
use crate::password::PasswordHasher;
use crate::store::UserStore;
use crate::tokens::{new_verification_token, SessionTokenIssuer};

use chrono::Duration;
use std::sync::Arc;

const WRONG_CREDENTIALS: &str = "Email or password is wrong";

/// Authentication service
pub struct AuthService {
    users: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    hasher: PasswordHasher,
    sessions: SessionTokenIssuer,
    avatars: AvatarStorage,
    base_url: String,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        config: &AppConfig,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            users,
            mailer,
            hasher: PasswordHasher::from_config(config)?,
            sessions: SessionTokenIssuer::new(
                &config.secret_key,
                Duration::hours(config.session_ttl_hours),
            ),
            avatars: AvatarStorage::from_config(config),
            base_url: config.base_url.clone(),
        })
    }

    // ============================================
    // Registration / Verification
    // ============================================

    /// Register a new, unverified user and mail them a verification link
    pub async fn register(&self, req: RegisterRequest) -> Result<RegisterResponse, ApiError> {
        if self.users.find_by_email(&req.email).await?.is_some() {
            return Err(ApiError::Conflict("Email in use".to_string()));
        }

        let password_hash = self.hasher.hash(&req.password)?;
        let verification_token = new_verification_token();

        let user = self
            .users
            .insert(NewUser {
                avatar_url: default_avatar_url(&req.email, self.avatars.size()),
                email: req.email,
                password_hash,
                verification_token: verification_token.clone(),
            })
            .await?;

        tracing::info!(user_id = %user.id, "User registered");

        self.send_verification_email(&user.email, &verification_token)
            .await?;

        Ok(RegisterResponse {
            user: PublicUser::from(user),
        })
    }

    /// Consume a verification token
    pub async fn verify_email(&self, token: &str) -> Result<MessageResponse, ApiError> {
        let user = self
            .users
            .consume_verification_token(token)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        tracing::info!(user_id = %user.id, "Email verified");
        Ok(MessageResponse::new("Verification successful"))
    }

    /// Re-send the verification link with the user's existing token
    pub async fn resend_verification(&self, email: &str) -> Result<MessageResponse, ApiError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        let token = match (&user.verification_token, user.is_email_verified()) {
            (Some(token), false) => token,
            _ => {
                return Err(ApiError::BadRequest(
                    "Verification has already been passed".to_string(),
                ))
            }
        };

        self.send_verification_email(&user.email, token).await?;
        Ok(MessageResponse::new("Verification email sent"))
    }

    async fn send_verification_email(&self, to: &str, token: &str) -> Result<(), ApiError> {
        let link = format!("{}/auth/verify/{}", self.base_url, token);
        self.mailer
            .send(EmailMessage {
                to: to.to_string(),
                subject: "Verify email".to_string(),
                html: format!(r#"<a target="_blank" href="{link}">Click to verify email</a>"#),
            })
            .await?;
        Ok(())
    }

    // ============================================
    // Login / Logout
    // ============================================

    /// Authenticate credentials and start the user's single session
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, ApiError> {
        let user = self
            .users
            .find_by_email(&req.email)
            .await?
            .ok_or_else(|| ApiError::Unauthorized(WRONG_CREDENTIALS.to_string()))?;

        if !user.is_email_verified() {
            return Err(ApiError::Unauthorized("Email not verified".to_string()));
        }

        if !self.hasher.verify(&req.password, &user.password_hash)? {
            return Err(ApiError::Unauthorized(WRONG_CREDENTIALS.to_string()));
        }

        let token = self.sessions.issue(user.id)?;
        self.users.set_token(user.id, Some(&token)).await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginResponse {
            token,
            user: PublicUser::from(user),
        })
    }

    /// End the user's session
    pub async fn logout(&self, user: &User) -> Result<(), ApiError> {
        self.users.set_token(user.id, None).await?;
        tracing::info!(user_id = %user.id, "User logged out");
        Ok(())
    }

    // ============================================
    // Session Resolution
    // ============================================

    /// Resolve a presented session token to its user.
    ///
    /// The token must carry a valid signature and expiry, name an existing
    /// user, and equal that user's stored token. Only the latest login's token
    /// passes the last check.
    pub async fn authenticate(&self, token: &str) -> Result<User, ApiError> {
        let claims = self.sessions.verify(token)?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(ApiError::not_authorized)?;

        if user.token.as_deref() != Some(token) {
            tracing::warn!(user_id = %user.id, "Rejected superseded or revoked session token");
            return Err(ApiError::not_authorized());
        }

        Ok(user)
    }

    // ============================================
    // Profile
    // ============================================

    pub fn current(&self, user: &User) -> PublicUser {
        PublicUser::from(user)
    }

    /// Switch subscription tier; re-selecting the current tier is rejected
    pub async fn change_subscription(
        &self,
        user: &User,
        subscription: Subscription,
    ) -> Result<PublicUser, ApiError> {
        if user.subscription == subscription {
            return Err(ApiError::BadRequest(format!(
                "subscription \"{subscription}\" is already in use"
            )));
        }

        let updated = self
            .users
            .set_subscription(user.id, subscription)
            .await?
            .ok_or_else(ApiError::not_authorized)?;

        Ok(PublicUser::from(updated))
    }

    /// Normalize and publish a new avatar, replacing the previous upload
    pub async fn update_avatar(
        &self,
        user: &User,
        upload: Option<AvatarUpload>,
    ) -> Result<AvatarResponse, ApiError> {
        let upload = upload.ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

        let avatar_url = self.avatars.store(user.id, upload).await?;
        self.users
            .set_avatar_url(user.id, &avatar_url)
            .await?
            .ok_or_else(ApiError::not_authorized)?;

        if user.avatar_url != avatar_url {
            self.avatars.discard(&user.avatar_url).await;
        }

        tracing::info!(user_id = %user.id, avatar = %avatar_url, "Avatar updated");
        Ok(AvatarResponse { avatar_url })
    }
}
