//! Authentication error types.

use thiserror::Error;

/// Errors that can occur while logging a user in.
///
/// Session lookups never produce an error: a missing or expired session is
/// reported as `None` by the [`SessionStore`](crate::SessionStore).
#[derive(Debug, Error)]
pub enum AuthError {
    /// The callback `state` did not match the value issued at login.
    #[error("OAuth state mismatch")]
    CsrfMismatch,

    /// The callback carried no authorization code.
    #[error("No authorization code provided")]
    MissingCode,

    /// The provider redirected back with an error instead of a code.
    #[error("Provider denied the request: {error}")]
    ProviderDenied {
        /// OAuth error code (e.g. `access_denied`).
        error: String,
        /// Human-readable description, if the provider sent one.
        description: Option<String>,
    },

    /// Exchanging the authorization code for a token failed.
    #[error("Token exchange failed: {0}")]
    Exchange(String),

    /// Fetching the user profile with the exchanged token failed.
    #[error("Profile fetch failed: {0}")]
    ProfileFetch(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The user directory could not be queried.
    #[error("Directory lookup failed: {0}")]
    Directory(String),
}

impl AuthError {
    /// Short machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CsrfMismatch => "invalid_state",
            Self::MissingCode => "missing_code",
            Self::ProviderDenied { .. } => "provider_error",
            Self::Exchange(_) => "token_error",
            Self::ProfileFetch(_) => "userinfo_error",
            Self::Configuration(_) => "server_error",
            Self::Directory(_) => "directory_error",
        }
    }

    /// Returns true if the failure was caused by the client's request rather
    /// than by the server or the provider.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::CsrfMismatch | Self::MissingCode | Self::ProviderDenied { .. }
        )
    }
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(AuthError::CsrfMismatch.is_client_error());
        assert!(AuthError::MissingCode.is_client_error());
        assert!(AuthError::ProviderDenied {
            error: "access_denied".to_string(),
            description: None,
        }
        .is_client_error());

        assert!(!AuthError::Exchange("timeout".to_string()).is_client_error());
        assert!(!AuthError::ProfileFetch("bad json".to_string()).is_client_error());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AuthError::CsrfMismatch.code(), "invalid_state");
        assert_eq!(AuthError::Exchange(String::new()).code(), "token_error");
        assert_eq!(AuthError::ProfileFetch(String::new()).code(), "userinfo_error");
    }
}
