//! Cookies set by the login flow

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Session cookie name
pub const SESSION_COOKIE: &str = "session_id";

/// Login state cookie name
pub const STATE_COOKIE: &str = "oauth_state";

/// PKCE verifier cookie name
pub const PKCE_COOKIE: &str = "oauth_pkce";

fn build(name: &'static str, value: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(max_age_secs))
        .build()
}

fn removal(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .http_only(true)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// Add the state cookie (and the PKCE verifier cookie, if any) for a new
/// login attempt.
pub fn add_login_cookies(
    jar: CookieJar,
    state: &str,
    code_verifier: Option<&str>,
    max_age_secs: i64,
    secure: bool,
) -> CookieJar {
    let jar = jar.add(build(STATE_COOKIE, state.to_string(), max_age_secs, secure));
    match code_verifier {
        Some(verifier) => jar.add(build(PKCE_COOKIE, verifier.to_string(), max_age_secs, secure)),
        None => jar.remove(removal(PKCE_COOKIE)),
    }
}

/// Read the state and PKCE verifier cookies.
pub fn login_cookies(jar: &CookieJar) -> (Option<String>, Option<String>) {
    (
        jar.get(STATE_COOKIE).map(|c| c.value().to_string()),
        jar.get(PKCE_COOKIE).map(|c| c.value().to_string()),
    )
}

/// Expire the state and PKCE verifier cookies.
pub fn clear_login_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(removal(STATE_COOKIE)).remove(removal(PKCE_COOKIE))
}

/// Add the session cookie.
pub fn add_session_cookie(
    jar: CookieJar,
    session_id: &str,
    max_age_secs: i64,
    secure: bool,
) -> CookieJar {
    jar.add(build(SESSION_COOKIE, session_id.to_string(), max_age_secs, secure))
}

/// Read the session cookie.
pub fn session_cookie(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Expire the session cookie.
pub fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(removal(SESSION_COOKIE))
}
