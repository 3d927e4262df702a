//! Authentication and authorization middleware
//!
//! Protected routes are layered in two steps:
//!
//! ```rust,ignore
//! let admin = Router::new()
//!     .route("/admin/overview", get(admin_overview))
//!     .route_layer(from_fn_with_state(RoleSet::new(["admin"]), require_role));
//!
//! Router::new()
//!     .route("/me", get(me))
//!     .merge(admin)
//!     .route_layer(from_fn_with_state(state.clone(), require_login));
//! ```
//!
//! `require_login` resolves the session cookie and attaches an
//! [`AuthenticatedUser`]; `require_role` and handlers take that type as an
//! extractor.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use elimu_auth::{RoleSet, SessionId, User};
use tracing::{debug, warn};

use crate::{cookies, error::ApiError, state::AppState};

/// The user behind the current request's session.
///
/// Only `require_login` inserts this into request extensions. Extracting it
/// on a route without that layer is a wiring bug and fails with a 500.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    /// The resolved user
    pub fn user(&self) -> &User {
        &self.0
    }

    /// Unwrap into the resolved user
    pub fn into_inner(self) -> User {
        self.0
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                ApiError::Configuration(format!(
                    "no authenticated user on {}; is require_login layered before this route?",
                    parts.uri.path()
                ))
            })
    }
}

/// Session middleware.
///
/// Rejects with 401 when the session cookie is missing or does not resolve;
/// otherwise attaches the user and runs the rest of the stack.
pub async fn require_login(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session_id = cookies::session_cookie(&jar).ok_or_else(|| {
        debug!("No session cookie");
        ApiError::NotLoggedIn
    })?;

    let user = state
        .sessions
        .resolve(&SessionId::from(session_id))
        .await
        .ok_or_else(|| {
            debug!("Session cookie did not resolve");
            ApiError::SessionExpired
        })?;

    debug!(user_id = %user.id, "Authenticated user");
    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Role middleware.
///
/// Layer with `from_fn_with_state(RoleSet::new([...]), require_role)` inside
/// `require_login`. Rejects with 403 unless the user's role is in the set.
pub async fn require_role(
    State(allowed): State<RoleSet>,
    user: AuthenticatedUser,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !allowed.allows(user.user()) {
        warn!(
            user_id = %user.user().id,
            role = user.user().role().unwrap_or("<none>"),
            allowed = %allowed,
            path = %request.uri().path(),
            "Role denied"
        );
        return Err(ApiError::Forbidden);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::http::Request as HttpRequest;

    use super::*;

    #[tokio::test]
    async fn test_extractor_reads_extension() {
        let request = HttpRequest::builder().uri("/api/me").body(()).unwrap();
        let (mut parts, _) = request.into_parts();
        parts
            .extensions
            .insert(AuthenticatedUser(User::new("u1").with_role("admin")));

        let user = AuthenticatedUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user.user().id, "u1");
    }

    #[tokio::test]
    async fn test_extractor_without_login_layer() {
        let request = HttpRequest::builder().uri("/api/admin/overview").body(()).unwrap();
        let (mut parts, _) = request.into_parts();

        let result = AuthenticatedUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(ApiError::Configuration(_))));
    }
}
