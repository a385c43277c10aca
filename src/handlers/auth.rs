//! Authentication HTTP Handlers

use super::AppState;
use crate::avatar::AvatarUpload;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::models::*;

use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::JsonRejection,
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

/// Multipart field carrying the avatar image
const AVATAR_FIELD: &str = "avatar";

// ============================================
// Registration / Verification
// ============================================

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let response = state.auth.register(req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /auth/verify/:verification_token
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    Ok(Json(state.auth.verify_email(&token).await?))
}

/// POST /auth/verify
pub async fn resend_verification(
    State(state): State<AppState>,
    payload: Result<Json<ResendVerificationRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    Ok(Json(state.auth.resend_verification(&req.email).await?))
}

// ============================================
// Session
// ============================================

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    Ok(Json(state.auth.login(req).await?))
}

/// GET /auth/current
pub async fn current(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Json<PublicUser> {
    Json(state.auth.current(&user))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<StatusCode, ApiError> {
    state.auth.logout(&user).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================
// Profile
// ============================================

/// PATCH /auth/subscription
pub async fn change_subscription(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<SubscriptionRequest>, JsonRejection>,
) -> Result<Json<PublicUser>, ApiError> {
    let Json(req) = payload?;
    Ok(Json(
        state.auth.change_subscription(&user, req.subscription).await?,
    ))
}

/// PATCH /auth/avatars
///
/// Expects a multipart body with the image in the `avatar` field. Other
/// fields are ignored.
pub async fn update_avatar(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AvatarResponse>, ApiError> {
    let mut multipart = multipart?;
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?.to_vec();
        if !bytes.is_empty() {
            upload = Some(AvatarUpload { file_name, bytes });
        }
        break;
    }

    Ok(Json(state.auth.update_avatar(&user, upload).await?))
}
