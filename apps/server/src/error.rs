//! API error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use elimu_auth::AuthError;
use serde::Serialize;

/// Error returned by handlers and middleware.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No session cookie on the request.
    #[error("Not logged in")]
    NotLoggedIn,

    /// The session cookie does not resolve to a live session.
    #[error("Session expired")]
    SessionExpired,

    /// The user's role is not allowed on this route.
    #[error("Insufficient permissions")]
    Forbidden,

    /// A handler or middleware ran without the state it depends on. This is a
    /// bug in route wiring, never a client mistake.
    #[error("Server misconfiguration: {0}")]
    Configuration(String),

    /// Login flow failure.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error code
    pub error: &'static str,

    /// Human-readable error description
    pub error_description: String,
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotLoggedIn | ApiError::SessionExpired => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Auth(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) | ApiError::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::NotLoggedIn => "not_logged_in",
            ApiError::SessionExpired => "session_expired",
            ApiError::Forbidden => "forbidden",
            ApiError::Configuration(_) => "server_error",
            ApiError::Auth(e) => e.code(),
        }
    }

    // Server-side details stay in the logs
    fn description(&self) -> String {
        match self {
            ApiError::Configuration(_) => "Internal server error".to_string(),
            ApiError::Auth(AuthError::Exchange(_)) => "Token exchange failed".to_string(),
            ApiError::Auth(AuthError::ProfileFetch(_)) => "Failed to get user info".to_string(),
            ApiError::Auth(AuthError::Configuration(_) | AuthError::Directory(_)) => {
                "Internal server error".to_string()
            }
            ApiError::Auth(AuthError::CsrfMismatch) => "Invalid state parameter".to_string(),
            ApiError::Auth(AuthError::ProviderDenied { error, description }) => description
                .clone()
                .unwrap_or_else(|| format!("Provider returned {}", error)),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorBody {
            error: self.code(),
            error_description: self.description(),
        };

        (status, Json(body)).into_response()
    }
}
