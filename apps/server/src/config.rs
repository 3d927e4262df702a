//! Server configuration

use std::collections::BTreeMap;
use std::path::PathBuf;

use elimu_auth::{OAuthConfig, DEFAULT_SESSION_TTL_SECS, DEFAULT_STATE_TTL_SECS};
use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0:8080")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether cookies are marked `Secure` (enable behind HTTPS)
    #[serde(default)]
    pub secure_cookies: bool,

    /// Session lifetime in seconds
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: i64,

    /// Lifetime of the login state cookie in seconds
    #[serde(default = "default_state_ttl")]
    pub state_ttl_secs: i64,

    /// How often expired sessions are purged, in seconds
    #[serde(default = "default_purge_interval")]
    pub session_purge_interval_secs: u64,

    /// Whether to enable CORS
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,

    /// Allowed CORS origins
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Google OAuth client settings
    #[serde(default = "default_oauth")]
    pub oauth: OAuthConfig,

    /// Email → role assignments used when the user directory is not wired up
    #[serde(default)]
    pub role_assignments: BTreeMap<String, String>,
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_session_ttl() -> i64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_state_ttl() -> i64 {
    DEFAULT_STATE_TTL_SECS
}

fn default_purge_interval() -> u64 {
    60
}

fn default_enable_cors() -> bool {
    true
}

fn default_redirect_url() -> String {
    "http://localhost:8080/api/callback".to_string()
}

fn default_oauth() -> OAuthConfig {
    OAuthConfig::google(String::new(), String::new(), default_redirect_url())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            log_level: default_log_level(),
            secure_cookies: false,
            session_ttl_secs: default_session_ttl(),
            state_ttl_secs: default_state_ttl(),
            session_purge_interval_secs: default_purge_interval(),
            enable_cors: default_enable_cors(),
            cors_origins: Vec::new(),
            oauth: default_oauth(),
            role_assignments: BTreeMap::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        // Start from the config file if there is one, otherwise defaults
        let mut config = match Self::find_config_file() {
            Some(path) => {
                let contents = std::fs::read_to_string(&path)?;
                tracing::debug!(path = %path.display(), "Loaded config file");
                toml::from_str(&contents)?
            }
            None => Self::default(),
        };

        // Environment takes precedence over the file
        config.apply_env(|key| std::env::var(key).ok())?;

        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment variables
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(port) = var("PORT") {
            self.bind_address = format!("0.0.0.0:{}", port.trim());
        }

        if let Some(addr) = var("ELIMU_BIND_ADDRESS") {
            self.bind_address = addr;
        }

        if let Some(level) = var("ELIMU_LOG_LEVEL") {
            self.log_level = level;
        }

        if let Some(val) = var("ELIMU_SECURE_COOKIES") {
            self.secure_cookies = parse_bool(&val);
        }

        if let Some(ttl) = var("ELIMU_SESSION_TTL_SECS") {
            self.session_ttl_secs = parse_number("ELIMU_SESSION_TTL_SECS", &ttl)?;
        }

        if let Some(ttl) = var("ELIMU_STATE_TTL_SECS") {
            self.state_ttl_secs = parse_number("ELIMU_STATE_TTL_SECS", &ttl)?;
        }

        if let Some(interval) = var("ELIMU_SESSION_PURGE_INTERVAL_SECS") {
            self.session_purge_interval_secs =
                parse_number("ELIMU_SESSION_PURGE_INTERVAL_SECS", &interval)?;
        }

        if let Some(val) = var("ELIMU_ENABLE_CORS") {
            self.enable_cors = parse_bool(&val);
        }

        if let Some(origins) = var("ELIMU_CORS_ORIGINS") {
            self.cors_origins = split_list(&origins);
        }

        if let Some(client_id) = var("GOOGLE_CLIENT_ID") {
            self.oauth.client_id = client_id;
        }

        if let Some(client_secret) = var("GOOGLE_CLIENT_SECRET") {
            self.oauth.client_secret = client_secret;
        }

        if let Some(redirect_url) = var("GOOGLE_REDIRECT_URL") {
            self.oauth.redirect_url = redirect_url;
        }

        if let Some(scopes) = var("GOOGLE_SCOPES") {
            self.oauth.scopes = split_list(&scopes);
        }

        if let Some(val) = var("ELIMU_USE_PKCE") {
            self.oauth.use_pkce = parse_bool(&val);
        }

        if let Some(assignments) = var("ELIMU_ROLE_ASSIGNMENTS") {
            for entry in split_list(&assignments) {
                let (email, role) = entry
                    .split_once('=')
                    .ok_or_else(|| ConfigError::InvalidValue {
                        key: "ELIMU_ROLE_ASSIGNMENTS",
                        value: entry.clone(),
                    })?;
                self.role_assignments
                    .insert(email.trim().to_string(), role.trim().to_string());
            }
        }

        Ok(())
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut locations = vec![
            PathBuf::from("elimu-server.toml"),
            PathBuf::from("/etc/elimu/server.toml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            locations.push(dir.join("elimu").join("server.toml"));
        }

        locations.into_iter().find(|p| p.exists())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_ttl_secs <= 0 || self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(ConfigError::InvalidValue {
                key: "session_ttl_secs",
                value: self.session_ttl_secs.to_string(),
            });
        }

        if self.state_ttl_secs <= 0 || self.state_ttl_secs > MAX_STATE_TTL_SECS {
            return Err(ConfigError::InvalidValue {
                key: "state_ttl_secs",
                value: self.state_ttl_secs.to_string(),
            });
        }

        if self.session_purge_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "session_purge_interval_secs",
                value: "0".to_string(),
            });
        }

        if url::Url::parse(&self.oauth.redirect_url).is_err() {
            return Err(ConfigError::InvalidValue {
                key: "oauth.redirect_url",
                value: self.oauth.redirect_url.clone(),
            });
        }

        if self.oauth.client_id.is_empty() {
            tracing::warn!("GOOGLE_CLIENT_ID is not set, logins will be rejected by Google");
        }

        if !self.secure_cookies && self.oauth.redirect_url.starts_with("https://") {
            tracing::warn!("Serving over HTTPS without secure cookies");
        }

        Ok(())
    }
}

/// Longest accepted session lifetime (30 days)
pub const MAX_SESSION_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Longest accepted login state lifetime (1 hour)
pub const MAX_STATE_TTL_SECS: i64 = 60 * 60;

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
