//! Shared helpers for the HTTP tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use elimu_auth::{
    AuthError, AuthResult, IdentityProvider, MemorySessionStore, OAuthConfig, PkceChallenge,
    Profile, ProviderToken, RoleDirectory,
};
use elimu_server::{create_app, AppState, ServerConfig};
use serde_json::Value;
use tower::ServiceExt;

/// The only code the mock provider accepts.
pub const GOOD_CODE: &str = "abc";

/// Identity provider that never leaves the process.
#[derive(Default)]
pub struct MockProvider {
    pub pkce: bool,
    pub fail_profile: bool,
    pub unverified_email: bool,
    pub email: String,
    pub exchanges: AtomicUsize,
    pub fetches: AtomicUsize,
    pub last_verifier: Mutex<Option<String>>,
}

impl MockProvider {
    pub fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
            ..Default::default()
        }
    }

    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    fn authorization_url(&self, state: &str, pkce: Option<&PkceChallenge>) -> AuthResult<String> {
        OAuthConfig::google("test-client", "test-secret", "http://localhost:8080/api/callback")
            .with_endpoints(
                "https://accounts.test/auth",
                "https://accounts.test/token",
                "https://accounts.test/userinfo",
            )
            .authorization_url(state, pkce)
    }

    fn uses_pkce(&self) -> bool {
        self.pkce
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> AuthResult<ProviderToken> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        *self.last_verifier.lock().unwrap() = code_verifier.map(str::to_string);

        if code != GOOD_CODE {
            return Err(AuthError::Exchange(
                "Token endpoint returned 400 Bad Request".to_string(),
            ));
        }
        Ok(ProviderToken::bearer("ya29.test"))
    }

    async fn fetch_identity(&self, _token: &ProviderToken) -> AuthResult<Profile> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_profile {
            return Err(AuthError::ProfileFetch(
                "Userinfo endpoint returned 500".to_string(),
            ));
        }

        let local = self.email.split('@').next().unwrap_or_default();
        Ok(Profile {
            id: format!("google-{}", local),
            email: Some(self.email.clone()),
            verified_email: Some(!self.unverified_email),
            name: Some(format!("Test {}", local)),
            picture: Some("https://example.com/pic.jpg".to_string()),
            ..Default::default()
        })
    }
}

/// Directory that is always down.
pub struct FailingDirectory;

#[async_trait]
impl RoleDirectory for FailingDirectory {
    async fn role_for(&self, _email: &str) -> AuthResult<Option<String>> {
        Err(AuthError::Directory("connection refused".to_string()))
    }
}

/// Everything a test needs to poke at the server.
pub struct TestServer {
    pub app: Router,
    pub provider: Arc<MockProvider>,
    pub sessions: Arc<MemorySessionStore>,
}

impl TestServer {
    pub fn new(provider: MockProvider) -> Self {
        Self::build(provider, MemorySessionStore::new(), None)
    }

    pub fn build(
        provider: MockProvider,
        sessions: MemorySessionStore,
        directory: Option<Arc<dyn RoleDirectory>>,
    ) -> Self {
        let provider = Arc::new(provider);
        let sessions = Arc::new(sessions);
        let state = AppState::from_parts(
            ServerConfig::default(),
            provider.clone(),
            sessions.clone(),
            directory,
        );

        Self {
            app: create_app(state),
            provider,
            sessions,
        }
    }
}

/// Minimal cookie-keeping client.
#[derive(Default)]
pub struct Browser {
    pub cookies: HashMap<String, String>,
}

impl Browser {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&mut self, app: &Router, uri: &str) -> TestResponse {
        let mut request = Request::builder().uri(uri);
        if !self.cookies.is_empty() {
            let header_value = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header(header::COOKIE, header_value);
        }

        let response = app
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let response = TestResponse::read(response).await;
        for (name, cookie) in &response.set_cookies {
            if cookie.removed {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.clone(), cookie.value.clone());
            }
        }
        response
    }
}

#[derive(Debug, Clone)]
pub struct SetCookie {
    pub value: String,
    pub removed: bool,
    pub attributes: String,
}

/// A fully read response.
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub set_cookies: HashMap<String, SetCookie>,
    pub body: Value,
}

impl TestResponse {
    async fn read(response: Response<Body>) -> Self {
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());

        let set_cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| parse_set_cookie(v.to_str().unwrap()))
            .collect();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        Self {
            status,
            location,
            set_cookies,
            body,
        }
    }

    /// Value of a cookie this response set (not removed)
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.set_cookies
            .get(name)
            .filter(|c| !c.removed)
            .map(|c| c.value.as_str())
    }

    /// Whether this response expired a cookie
    pub fn removed_cookie(&self, name: &str) -> bool {
        self.set_cookies.get(name).is_some_and(|c| c.removed)
    }
}

fn parse_set_cookie(header_value: &str) -> Option<(String, SetCookie)> {
    let (pair, attributes) = header_value.split_once(';').unwrap_or((header_value, ""));
    let (name, value) = pair.split_once('=')?;
    let attributes = attributes.to_string();
    let removed = attributes.to_lowercase().contains("max-age=0");

    Some((
        name.trim().to_string(),
        SetCookie {
            value: value.trim().to_string(),
            removed,
            attributes,
        },
    ))
}

/// Query parameter from a URL
pub fn query_param(url: &str, key: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
