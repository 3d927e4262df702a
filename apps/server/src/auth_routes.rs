//! Authentication route handlers
//!
//! This module provides the endpoints of the Google login flow:
//! - `/api/login` - Redirect to Google with a fresh CSRF state
//! - `/api/callback` - Validate state, exchange the code, start a session
//! - `/api/me` - Get current user info
//! - `/api/logout` - Revoke the session

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use elimu_auth::{CallbackParams, PendingLogin, SessionId, User};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{cookies, error::ApiError, middleware::AuthenticatedUser, state::AppState};

/// Successful login
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Success message
    pub message: String,

    /// Authenticated user data
    pub user: User,
}

/// Logout confirmation
#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// Start Google login.
///
/// Sets the state cookie (and PKCE verifier cookie) and redirects (307) to
/// the provider.
pub async fn login(State(state): State<AppState>, jar: CookieJar) -> Result<Response, ApiError> {
    let (pending, auth_url) = PendingLogin::begin(state.provider.as_ref())?;

    let jar = cookies::add_login_cookies(
        jar,
        &pending.state,
        pending.code_verifier.as_deref(),
        state.config.state_ttl_secs,
        state.config.secure_cookies,
    );

    info!(pkce = pending.code_verifier.is_some(), "Initiating Google login");

    Ok((jar, Redirect::temporary(&auth_url)).into_response())
}

/// Handle the OAuth callback.
///
/// The login cookies are cleared whatever the outcome, so a state value is
/// only ever checked once.
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Json<LoginResponse>), (CookieJar, ApiError)> {
    let (stored_state, code_verifier) = cookies::login_cookies(&jar);
    let jar = cookies::clear_login_cookies(jar);

    match complete_login(&state, stored_state, code_verifier, &params).await {
        Ok((session_id, user)) => {
            let jar = cookies::add_session_cookie(
                jar,
                session_id.as_str(),
                state.config.session_ttl_secs,
                state.config.secure_cookies,
            );
            Ok((
                jar,
                Json(LoginResponse {
                    message: "Login successful!".to_string(),
                    user,
                }),
            ))
        }
        Err(e) => Err((jar, e)),
    }
}

/// validate → exchange → fetch profile → look up role → create session
async fn complete_login(
    state: &AppState,
    stored_state: Option<String>,
    code_verifier: Option<String>,
    params: &CallbackParams,
) -> Result<(SessionId, User), ApiError> {
    let pending = PendingLogin::restore(stored_state, code_verifier).inspect_err(|_| {
        warn!("Callback without a login state cookie");
    })?;

    let profile = pending.complete(state.provider.as_ref(), params).await?;

    // Roles are keyed by email, so only a verified one may claim them
    let email_verified = profile.verified_email == Some(true);
    let mut user = profile.into_user();
    if !email_verified {
        warn!(user_id = %user.id, "Email not verified by provider, skipping role lookup");
    } else if let Some(role) = lookup_role(state, &user.email).await {
        user = user.with_role(role);
    }

    let session_id = state.sessions.create(user.clone()).await;

    info!(user_id = %user.id, role = user.role().unwrap_or("<none>"), "User logged in");

    Ok((session_id, user))
}

/// Role for an email. Missing directory or a failing lookup means no role.
async fn lookup_role(state: &AppState, email: &str) -> Option<String> {
    let directory = state.directory.as_ref()?;
    if email.is_empty() {
        return None;
    }

    match directory.role_for(email).await {
        Ok(role) => role,
        Err(e) => {
            warn!(error = %e, "Role lookup failed, continuing without a role");
            None
        }
    }
}

/// Get current user info
pub async fn me(user: AuthenticatedUser) -> Json<User> {
    Json(user.into_inner())
}

/// Logout. Always succeeds, even without a session.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    if let Some(session_id) = cookies::session_cookie(&jar) {
        state.sessions.revoke(&SessionId::from(session_id)).await;
        info!("Session revoked");
    }

    (
        cookies::clear_session_cookie(jar),
        Json(LogoutResponse {
            message: "Logged out".to_string(),
        }),
    )
}
