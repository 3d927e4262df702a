//! Application state

use std::sync::Arc;

use chrono::Duration;
use elimu_auth::{
    IdentityProvider, MemoryRoleDirectory, MemorySessionStore, OAuthClient, RoleDirectory,
    SessionStore,
};

use crate::config::ServerConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// OAuth client for the identity provider
    pub provider: Arc<dyn IdentityProvider>,

    /// Session store
    pub sessions: Arc<dyn SessionStore>,

    /// Role lookup at login (None if no directory is wired up)
    pub directory: Option<Arc<dyn RoleDirectory>>,

    /// Server configuration
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Create application state from configuration
    pub fn new(config: ServerConfig) -> Result<Self, StateError> {
        let provider = OAuthClient::new(config.oauth.clone())
            .map_err(|e| StateError::Auth(e.to_string()))?;

        let ttl = Duration::try_seconds(config.session_ttl_secs)
            .ok_or(StateError::SessionTtl(config.session_ttl_secs))?;
        let sessions = MemorySessionStore::with_ttl(ttl);

        let directory: Option<Arc<dyn RoleDirectory>> = if config.role_assignments.is_empty() {
            None
        } else {
            let directory: MemoryRoleDirectory =
                config.role_assignments.clone().into_iter().collect();
            tracing::info!(assignments = directory.len(), "Role directory loaded");
            Some(Arc::new(directory))
        };

        Ok(Self::from_parts(
            config,
            Arc::new(provider),
            Arc::new(sessions),
            directory,
        ))
    }

    /// Assemble state from explicit components (tests, alternative backends)
    pub fn from_parts(
        config: ServerConfig,
        provider: Arc<dyn IdentityProvider>,
        sessions: Arc<dyn SessionStore>,
        directory: Option<Arc<dyn RoleDirectory>>,
    ) -> Self {
        Self {
            provider,
            sessions,
            directory,
            config: Arc::new(config),
        }
    }
}

/// State initialization errors
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to initialize auth: {0}")]
    Auth(String),

    #[error("Session TTL out of range: {0}s")]
    SessionTtl(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_from_default_config() {
        let state = AppState::new(ServerConfig::default()).unwrap();
        assert!(state.directory.is_none());
        assert!(state.provider.uses_pkce());
    }

    #[test]
    fn test_new_rejects_unrepresentable_ttl() {
        let config = ServerConfig {
            session_ttl_secs: i64::MAX,
            ..Default::default()
        };
        assert!(matches!(
            AppState::new(config),
            Err(StateError::SessionTtl(i64::MAX))
        ));
    }
}
