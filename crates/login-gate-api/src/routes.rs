//! API route definitions

use crate::auth::middleware::request_gate;
use crate::handlers::{auth, health, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// OpenAPI document, paths shown with the default `/api` base route
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login_handler,
        auth::logout_handler,
        auth::register_handler,
        users::me_handler,
        users::get_user_handler,
        health::health_check,
    ),
    components(schemas(
        crate::models::LoginRequest,
        crate::models::RegisterRequest,
        crate::models::UserProfile,
        crate::models::UserResponse,
        crate::models::MessageResponse,
        crate::error::ApiError,
        health::HealthResponse,
    )),
    tags(
        (name = "auth", description = "Login, logout and registration"),
        (name = "users", description = "User profiles"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

/// Routes served under the base route
///
/// Public or protected is decided by the request gate from the configured
/// allow-list, not by how routes are grouped here.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(auth::login_handler))
        .route("/login/logout", post(auth::logout_handler))
        .route("/register", post(auth::register_handler))
        .route("/users/me", get(users::me_handler))
        .route("/users/:id", get(users::get_user_handler))
}

/// Build the full application router
///
/// The gate wraps every route; paths outside the base route pass through it
/// untouched.
pub fn create_router(state: Arc<AppState>) -> Router {
    let base_path = state.config.auth.base_path.clone();

    let router = if base_path == "/" {
        Router::new().merge(api_routes())
    } else {
        Router::new().nest(&base_path, api_routes())
    };

    router
        .route("/health", get(health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn_with_state(
            state.gate.clone(),
            request_gate,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
