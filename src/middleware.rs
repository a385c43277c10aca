//! Authentication Middleware
//!
//! Resolves the bearer session token to a [`User`](crate::models::User) and
//! stores it in request extensions for the [`AuthUser`](crate::extractors::AuthUser)
//! extractor.

use crate::error::ApiError;
use crate::handlers::AppState;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

/// Token from an `Authorization: Bearer <token>` header
fn bearer_token(header: Option<&str>) -> Option<&str> {
    let (scheme, token) = header?.split_once(' ')?;
    let token = token.trim();
    (scheme == "Bearer" && !token.is_empty()).then_some(token)
}

/// Require authenticated user
///
/// Every failure mode answers 401 "Not authorized".
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = bearer_token(header).ok_or_else(ApiError::not_authorized)?;
    let user = state.auth.authenticate(token).await?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
