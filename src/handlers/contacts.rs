//! Contact HTTP Handlers

use super::AppState;
use crate::error::ApiError;
use crate::extractors::{AuthUser, ContactId};
use crate::models::*;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

/// GET /contacts
pub async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: Result<Query<ContactQuery>, QueryRejection>,
) -> Result<Json<ContactPage>, ApiError> {
    let Query(query) = query?;
    Ok(Json(state.contacts.list(&user, &query).await?))
}

/// GET /contacts/:contact_id
pub async fn get_by_id(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ContactId(id): ContactId,
) -> Result<Json<Contact>, ApiError> {
    Ok(Json(state.contacts.get_by_id(&user, id).await?))
}

/// POST /contacts
pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateContactRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let contact = state.contacts.create(&user, req).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

/// PUT/PATCH /contacts/:contact_id
pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ContactId(id): ContactId,
    payload: Result<Json<UpdateContactRequest>, JsonRejection>,
) -> Result<Json<Contact>, ApiError> {
    let Json(patch) = payload?;
    patch.validate()?;

    Ok(Json(state.contacts.update(&user, id, patch).await?))
}

/// PATCH /contacts/:contact_id/favorite
pub async fn update_favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ContactId(id): ContactId,
    payload: Result<Json<FavoriteRequest>, JsonRejection>,
) -> Result<Json<Contact>, ApiError> {
    let Json(req) = payload?;
    Ok(Json(state.contacts.update_favorite(&user, id, req).await?))
}

/// DELETE /contacts/:contact_id
pub async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ContactId(id): ContactId,
) -> Result<Json<MessageResponse>, ApiError> {
    Ok(Json(state.contacts.remove(&user, id).await?))
}
