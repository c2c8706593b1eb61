//! Bearer token format: `ext_v1_` followed by 32 random bytes, hex-encoded.
//!
//! Tokens are stored and looked up by their SHA-256 digest so a leaked
//! `extension_tokens` table does not yield usable credentials.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const TOKEN_PREFIX: &str = "ext_v1_";
const TOKEN_BYTES: usize = 32;

/// Generate a fresh bearer token from the OS CSPRNG.
pub fn generate() -> String {
    let mut random_bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut random_bytes);
    format!("{}{}", TOKEN_PREFIX, hex::encode(random_bytes))
}

/// Digest used as the storage key.
pub fn hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Cheap shape check. Anything failing it cannot have been issued here.
pub fn is_well_formed(token: &str) -> bool {
    token
        .strip_prefix(TOKEN_PREFIX)
        .map(|body| body.len() == TOKEN_BYTES * 2 && body.bytes().all(|b| b.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// Log-safe rendering: prefix plus first and last four characters of the body.
pub fn mask(token: &str) -> String {
    match token.strip_prefix(TOKEN_PREFIX) {
        Some(body) if body.len() > 8 && body.is_ascii() => {
            format!("{}{}…{}", TOKEN_PREFIX, &body[..4], &body[body.len() - 4..])
        }
        _ => "****".to_string(),
    }
}
