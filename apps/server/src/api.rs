//! API router and the small informational endpoints.

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::get,
    Json, Router,
};
use elimu_auth::{RoleSet, User};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    auth_routes,
    middleware::{require_login, require_role},
    state::AppState,
};

/// Roles allowed on the admin endpoints.
pub const ADMIN_ROLES: [&str; 1] = ["admin"];

/// Creates the `/api` router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/admin/overview", get(admin_overview))
        .route_layer(from_fn_with_state(RoleSet::new(ADMIN_ROLES), require_role));

    let protected = Router::new()
        .route("/me", get(auth_routes::me))
        .merge(admin)
        .route_layer(from_fn_with_state(state.clone(), require_login));

    let api = Router::new()
        .route("/", get(welcome))
        .route("/health", get(health_check))
        .route("/login", get(auth_routes::login))
        .route("/callback", get(auth_routes::callback))
        .route("/logout", get(auth_routes::logout))
        .merge(protected);

    Router::new().nest("/api", api).with_state(state)
}

/// Welcome message
async fn welcome() -> Json<Value> {
    Json(json!({
        "message": "Elimu Portal API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Health check endpoint
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "Healthy",
        "timestamp": chrono::Utc::now().timestamp(),
    }))
}

/// Admin overview
#[derive(Debug, Serialize)]
pub struct AdminOverview {
    /// Number of live sessions
    pub active_sessions: usize,

    /// Users behind those sessions
    pub users: Vec<User>,
}

/// Lists the users with a live session.
async fn admin_overview(State(state): State<AppState>) -> Json<AdminOverview> {
    let mut users: Vec<User> = state
        .sessions
        .active()
        .await
        .into_iter()
        .map(|session| session.user)
        .collect();
    users.sort_by(|a, b| a.email.cmp(&b.email));

    Json(AdminOverview {
        active_sessions: users.len(),
        users,
    })
}
