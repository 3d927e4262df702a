//! OAuth2 authorization code flow against Google
//!
//! Three steps, each gated on the previous one:
//! 1. build the authorization URL the browser is redirected to,
//! 2. exchange the returned code for a token (server to server),
//! 3. fetch the user's profile with that token.
//!
//! Nothing here retries. An authorization code is single-use, so replaying a
//! failed exchange is never valid.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{AuthError, AuthResult, PkceChallenge, User, PKCE_METHOD};

/// Google's authorization endpoint
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";

/// Google's token endpoint
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Google's v2 userinfo endpoint
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Default timeout for calls to the provider, in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// OAuth2 client configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// OAuth2 client ID
    pub client_id: String,

    /// OAuth2 client secret
    pub client_secret: String,

    /// Redirect URL registered with the provider
    pub redirect_url: String,

    /// Scopes to request
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Authorization endpoint
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// Token endpoint
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Profile endpoint
    #[serde(default = "default_userinfo_url")]
    pub userinfo_url: String,

    /// Whether to send a PKCE challenge with the authorization request
    #[serde(default = "default_use_pkce")]
    pub use_pkce: bool,

    /// Timeout for token and profile requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// The Google userinfo scopes
pub fn default_scopes() -> Vec<String> {
    vec![
        "https://www.googleapis.com/auth/userinfo.email".to_string(),
        "https://www.googleapis.com/auth/userinfo.profile".to_string(),
    ]
}

fn default_auth_url() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_token_url() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

fn default_userinfo_url() -> String {
    GOOGLE_USERINFO_URL.to_string()
}

fn default_use_pkce() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .field("scopes", &self.scopes)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .field("use_pkce", &self.use_pkce)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl OAuthConfig {
    /// Create a configuration for Google with the default scopes
    pub fn google(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            scopes: default_scopes(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            userinfo_url: default_userinfo_url(),
            use_pkce: default_use_pkce(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Point the client at different endpoints (tests, other providers)
    pub fn with_endpoints(
        mut self,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
        userinfo_url: impl Into<String>,
    ) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self.userinfo_url = userinfo_url.into();
        self
    }

    /// Enable or disable PKCE
    pub fn with_pkce(mut self, use_pkce: bool) -> Self {
        self.use_pkce = use_pkce;
        self
    }

    /// Build the authorization URL for a login attempt.
    ///
    /// Pure function of the configuration and its arguments.
    pub fn authorization_url(
        &self,
        state: &str,
        pkce: Option<&PkceChallenge>,
    ) -> AuthResult<String> {
        let mut url = url::Url::parse(&self.auth_url).map_err(|e| {
            AuthError::Configuration(format!("Invalid authorization endpoint: {}", e))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("response_type", "code");
            query.append_pair("client_id", &self.client_id);
            query.append_pair("redirect_uri", &self.redirect_url);
            query.append_pair("scope", &self.scopes.join(" "));
            query.append_pair("state", state);

            if let Some(pkce) = pkce {
                query.append_pair("code_challenge", &pkce.challenge);
                query.append_pair("code_challenge_method", PKCE_METHOD);
            }
        }

        Ok(url.to_string())
    }

    /// Form parameters for the token request
    fn token_request_params(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            ("redirect_uri", self.redirect_url.clone()),
            ("client_id", self.client_id.clone()),
            ("client_secret", self.client_secret.clone()),
        ];

        if let Some(verifier) = code_verifier {
            params.push(("code_verifier", verifier.to_string()));
        }

        params
    }
}

/// Token response from the provider
#[derive(Clone, Deserialize)]
pub struct ProviderToken {
    /// The access token
    pub access_token: String,

    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Lifetime of the access token in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,

    /// The refresh token (if granted)
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// The ID token (if the openid scope was requested)
    #[serde(default)]
    pub id_token: Option<String>,

    /// Scopes granted
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl ProviderToken {
    /// Create a bearer token (mostly useful for tests and mocks)
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            expires_in: None,
            refresh_token: None,
            id_token: None,
            scope: None,
        }
    }
}

impl fmt::Debug for ProviderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderToken")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Profile returned by Google's userinfo endpoint
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Google's unique user ID
    pub id: String,

    /// Email address
    #[serde(default)]
    pub email: Option<String>,

    /// Whether Google verified the email
    #[serde(default)]
    pub verified_email: Option<bool>,

    /// Full name
    #[serde(default)]
    pub name: Option<String>,

    /// First name
    #[serde(default)]
    pub given_name: Option<String>,

    /// Last name
    #[serde(default)]
    pub family_name: Option<String>,

    /// Avatar URL
    #[serde(default)]
    pub picture: Option<String>,
}

impl Profile {
    /// Convert to a user without a role.
    pub fn into_user(self) -> User {
        let email = self.email.unwrap_or_default();
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .or_else(|| {
                // Fall back to given/family name, then the email
                self.given_name
                    .filter(|g| !g.is_empty())
                    .map(|given| match self.family_name.filter(|f| !f.is_empty()) {
                        Some(family) => format!("{} {}", given, family),
                        None => given,
                    })
            })
            .unwrap_or_else(|| email.clone());

        User {
            google_id: self.id.clone(),
            id: self.id,
            email,
            name,
            picture: self.picture.unwrap_or_default(),
            role: None,
        }
    }
}

/// The external identity provider, as seen by the login flow.
///
/// [`OAuthClient`] talks to the real provider; tests substitute a mock.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Build the URL the browser is sent to.
    fn authorization_url(&self, state: &str, pkce: Option<&PkceChallenge>) -> AuthResult<String>;

    /// Whether login attempts should carry a PKCE challenge.
    fn uses_pkce(&self) -> bool;

    /// Exchange an authorization code for a token.
    ///
    /// Fails with [`AuthError::Exchange`].
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> AuthResult<ProviderToken>;

    /// Fetch the user's profile.
    ///
    /// Fails with [`AuthError::ProfileFetch`].
    async fn fetch_identity(&self, token: &ProviderToken) -> AuthResult<Profile>;
}

/// OAuth2 client backed by reqwest
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl OAuthClient {
    /// Create a new client
    pub fn new(config: OAuthConfig) -> AuthResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AuthError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    /// Get the current configuration
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }
}

#[async_trait]
impl IdentityProvider for OAuthClient {
    fn authorization_url(&self, state: &str, pkce: Option<&PkceChallenge>) -> AuthResult<String> {
        self.config.authorization_url(state, pkce)
    }

    fn uses_pkce(&self) -> bool {
        self.config.use_pkce
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> AuthResult<ProviderToken> {
        let params = self.config.token_request_params(code, code_verifier);

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Exchange(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            // The body may echo the code or client details, keep it out of errors
            return Err(AuthError::Exchange(format!(
                "Token endpoint returned {}",
                status
            )));
        }

        response
            .json::<ProviderToken>()
            .await
            .map_err(|e| AuthError::Exchange(format!("Invalid token response: {}", e)))
    }

    async fn fetch_identity(&self, token: &ProviderToken) -> AuthResult<Profile> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| AuthError::ProfileFetch(format!("Userinfo request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::ProfileFetch(format!(
                "Userinfo endpoint returned {}",
                status
            )));
        }

        let profile: Profile = response
            .json()
            .await
            .map_err(|e| AuthError::ProfileFetch(format!("Invalid userinfo response: {}", e)))?;

        if profile.id.is_empty() {
            return Err(AuthError::ProfileFetch(
                "Userinfo response has no user id".to_string(),
            ));
        }

        Ok(profile)
    }
}
