//! Random token generation for CSRF state values and session identifiers.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use subtle::ConstantTimeEq;

/// Number of random bytes behind every generated token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Length of an encoded token: 32 bytes in unpadded base64url.
pub const TOKEN_LEN: usize = 43;

/// Generates an unguessable token from the thread-local CSPRNG.
///
/// The result is base64url-encoded without padding, so it is safe to place
/// in cookies and query strings as-is.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compares two tokens in constant time.
///
/// Tokens of different length never match.
pub fn tokens_match(expected: &str, received: &str) -> bool {
    expected.as_bytes().ct_eq(received.as_bytes()).into()
}
