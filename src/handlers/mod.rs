//! HTTP Handlers
//!
//! Route table and shared state. Auth routes live in [`auth`], contact routes
//! in [`contacts`].

pub mod auth;
pub mod contacts;

use crate::avatar::AVATARS_URL_PREFIX;
use crate::error::ApiError;
use crate::middleware;
use crate::services::{AuthService, ContactService};

use axum::{
    http::{header, Method},
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub contacts: Arc<ContactService>,
}

// ============================================
// Route Builder
// ============================================

/// Create the application router
pub fn create_routes(state: AppState, avatars_dir: &Path) -> Router {
    // Public routes (no authentication required)
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/verify", post(auth::resend_verification))
        .route("/auth/verify/:verification_token", get(auth::verify_email));

    // Protected routes (require a live session)
    let protected = Router::new()
        .route("/auth/current", get(auth::current))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/subscription", patch(auth::change_subscription))
        .route("/auth/avatars", patch(auth::update_avatar))
        .route("/contacts", get(contacts::list).post(contacts::create))
        .route(
            "/contacts/:contact_id",
            get(contacts::get_by_id)
                .put(contacts::update)
                .patch(contacts::update)
                .delete(contacts::remove),
        )
        .route("/contacts/:contact_id/favorite", patch(contacts::update_favorite))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .merge(public)
        .merge(protected)
        .nest_service(&format!("/{AVATARS_URL_PREFIX}"), ServeDir::new(avatars_dir))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::not_found()
}
