//! Token and nonce generation for authentication.

use base64::{engine::general_purpose, Engine as _};
use rand::Rng;

/// Generate a cryptographically random session token.
///
/// Returns a base64-encoded string (44 characters) from 32 random bytes.
pub fn generate_session_token() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes);
    general_purpose::STANDARD.encode(bytes)
}

/// Generate a cryptographically random challenge nonce.
///
/// Returns a hex-encoded string (32 characters) from 16 random bytes, so
/// the nonce can sit inside a line-oriented message without delimiters.
pub fn generate_challenge_nonce() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    hex::encode(bytes)
}

/// Length in characters of a hex-encoded challenge nonce.
pub const NONCE_LEN: usize = 32;
