//! A single login attempt, from redirect to verified profile.
//!
//! [`PendingLogin`] holds what the browser has to bring back to the
//! callback (the CSRF state and, optionally, the PKCE verifier). It is
//! consumed by [`PendingLogin::complete`], so a pending login can be checked
//! at most once whatever the outcome.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::{tokens_match, AuthError, AuthResult, IdentityProvider, PkceChallenge, Profile};

/// Query parameters the provider sends to the callback
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    /// Authorization code
    #[serde(default)]
    pub code: Option<String>,

    /// State parameter for CSRF protection
    #[serde(default)]
    pub state: Option<String>,

    /// Error from the provider (e.g. the user declined consent)
    #[serde(default)]
    pub error: Option<String>,

    /// Optional error description
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Per-attempt values issued at login and expected back at the callback
#[derive(Debug, Clone)]
pub struct PendingLogin {
    /// CSRF state token
    pub state: String,

    /// PKCE verifier, if the provider uses PKCE
    pub code_verifier: Option<String>,
}

impl PendingLogin {
    /// Start a login attempt.
    ///
    /// Returns the pending values to hand to the browser together with the
    /// provider URL to redirect it to.
    pub fn begin(provider: &dyn IdentityProvider) -> AuthResult<(Self, String)> {
        let state = crate::generate_token();
        let pkce = provider.uses_pkce().then(PkceChallenge::new);

        let url = provider.authorization_url(&state, pkce.as_ref())?;

        Ok((
            Self {
                state,
                code_verifier: pkce.map(|p| p.verifier),
            },
            url,
        ))
    }

    /// Restore a pending login from the values the browser sent back.
    ///
    /// A missing state means there is nothing to check the callback against.
    pub fn restore(state: Option<String>, code_verifier: Option<String>) -> AuthResult<Self> {
        let state = state.filter(|s| !s.is_empty()).ok_or(AuthError::CsrfMismatch)?;
        Ok(Self {
            state,
            code_verifier,
        })
    }

    /// Check the callback against this attempt.
    ///
    /// Returns the authorization code to exchange.
    pub fn validate(&self, params: &CallbackParams) -> AuthResult<String> {
        let received = params.state.as_deref().unwrap_or_default();
        if !tokens_match(&self.state, received) {
            warn!("OAuth state mismatch");
            return Err(AuthError::CsrfMismatch);
        }

        if let Some(error) = &params.error {
            warn!(
                error = %error,
                description = ?params.error_description,
                "OAuth error from provider"
            );
            return Err(AuthError::ProviderDenied {
                error: error.clone(),
                description: params.error_description.clone(),
            });
        }

        params
            .code
            .clone()
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::MissingCode)
    }

    /// Run the rest of the attempt: validate, exchange, fetch profile.
    ///
    /// Each step runs only if the previous one succeeded.
    pub async fn complete(
        self,
        provider: &dyn IdentityProvider,
        params: &CallbackParams,
    ) -> AuthResult<Profile> {
        let code = self.validate(params)?;

        let token = provider
            .exchange_code(&code, self.code_verifier.as_deref())
            .await?;
        debug!("Authorization code exchanged");

        provider.fetch_identity(&token).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::ProviderToken;

    #[derive(Default)]
    struct CountingProvider {
        pkce: bool,
        fail_exchange: bool,
        exchanges: AtomicUsize,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl IdentityProvider for CountingProvider {
        fn authorization_url(
            &self,
            state: &str,
            pkce: Option<&PkceChallenge>,
        ) -> AuthResult<String> {
            Ok(format!(
                "https://provider.test/auth?state={}&pkce={}",
                state,
                pkce.is_some()
            ))
        }

        fn uses_pkce(&self) -> bool {
            self.pkce
        }

        async fn exchange_code(
            &self,
            code: &str,
            _verifier: Option<&str>,
        ) -> AuthResult<ProviderToken> {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            if self.fail_exchange {
                return Err(AuthError::Exchange("boom".to_string()));
            }
            Ok(ProviderToken::bearer(format!("token-for-{}", code)))
        }

        async fn fetch_identity(&self, _token: &ProviderToken) -> AuthResult<Profile> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(Profile {
                id: "user-1".to_string(),
                ..Default::default()
            })
        }
    }

    fn params(code: Option<&str>, state: Option<&str>) -> CallbackParams {
        CallbackParams {
            code: code.map(str::to_string),
            state: state.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_begin_with_and_without_pkce() {
        let provider = CountingProvider::default();
        let (pending, url) = PendingLogin::begin(&provider).unwrap();
        assert!(pending.code_verifier.is_none());
        assert!(url.contains(&pending.state));
        assert!(url.ends_with("pkce=false"));

        let provider = CountingProvider {
            pkce: true,
            ..Default::default()
        };
        let (pending, url) = PendingLogin::begin(&provider).unwrap();
        assert!(pending.code_verifier.is_some());
        assert!(url.ends_with("pkce=true"));
    }

    #[test]
    fn test_restore_requires_state() {
        assert!(matches!(
            PendingLogin::restore(None, None),
            Err(AuthError::CsrfMismatch)
        ));
        assert!(matches!(
            PendingLogin::restore(Some(String::new()), None),
            Err(AuthError::CsrfMismatch)
        ));
        assert!(PendingLogin::restore(Some("s".to_string()), None).is_ok());
    }

    #[test]
    fn test_validate_order() {
        let pending = PendingLogin::restore(Some("expected".to_string()), None).unwrap();

        // State is checked before anything else
        let mut bad = params(None, Some("other"));
        bad.error = Some("access_denied".to_string());
        assert!(matches!(pending.validate(&bad), Err(AuthError::CsrfMismatch)));

        assert!(matches!(
            pending.validate(&params(Some("abc"), None)),
            Err(AuthError::CsrfMismatch)
        ));

        let mut denied = params(None, Some("expected"));
        denied.error = Some("access_denied".to_string());
        assert!(matches!(
            pending.validate(&denied),
            Err(AuthError::ProviderDenied { .. })
        ));

        assert!(matches!(
            pending.validate(&params(None, Some("expected"))),
            Err(AuthError::MissingCode)
        ));

        assert_eq!(
            pending.validate(&params(Some("abc"), Some("expected"))).unwrap(),
            "abc"
        );
    }

    #[tokio::test]
    async fn test_mismatch_never_reaches_provider() {
        let provider = CountingProvider::default();
        let pending = PendingLogin::restore(Some("expected".to_string()), None).unwrap();

        let result = pending
            .complete(&provider, &params(Some("abc"), Some("forged")))
            .await;

        assert!(matches!(result, Err(AuthError::CsrfMismatch)));
        assert_eq!(provider.exchanges.load(Ordering::SeqCst), 0);
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_exchange_skips_profile() {
        let provider = CountingProvider {
            fail_exchange: true,
            ..Default::default()
        };
        let pending = PendingLogin::restore(Some("s".to_string()), None).unwrap();

        let result = pending.complete(&provider, &params(Some("abc"), Some("s"))).await;

        assert!(matches!(result, Err(AuthError::Exchange(_))));
        assert_eq!(provider.exchanges.load(Ordering::SeqCst), 1);
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_complete_success() {
        let provider = CountingProvider::default();
        let pending = PendingLogin::restore(Some("s".to_string()), None).unwrap();

        let profile = pending
            .complete(&provider, &params(Some("abc"), Some("s")))
            .await
            .unwrap();

        assert_eq!(profile.id, "user-1");
        assert_eq!(provider.exchanges.load(Ordering::SeqCst), 1);
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);
    }
}
