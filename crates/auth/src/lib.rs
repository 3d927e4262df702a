//! Google login and session authorization for the Elimu portal.
//!
//! This crate provides:
//! - CSRF state and session token generation
//! - The OAuth2 authorization code flow with optional PKCE
//! - An in-memory session store with expiry
//! - Role sets and the role directory lookup used at login

mod directory;
mod error;
mod login;
mod oauth;
mod pkce;
mod session;
mod token;
mod user;

pub use directory::*;
pub use error::*;
pub use login::*;
pub use oauth::*;
pub use pkce::*;
pub use session::*;
pub use token::*;
pub use user::*;

/// Default session lifetime in seconds.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 3600;

/// Default lifetime of a pending login (state cookie) in seconds.
pub const DEFAULT_STATE_TTL_SECS: i64 = 300;
