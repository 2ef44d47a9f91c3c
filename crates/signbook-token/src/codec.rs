//! Raw token generation and one-way hashing.
//!
//! Raw tokens are bearer secrets: they travel to the recipient once, inside
//! the emailed confirmation link, and are never persisted or logged
//! server-side. Only the SHA-256 digest is stored, so a storage leak does
//! not leak usable tokens — the same discipline applied to password hashes,
//! even though no password is involved.

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Number of random bytes in a raw token. 32 bytes = 256 bits of entropy.
pub const TOKEN_BYTES: usize = 32;

/// Generate a fresh raw token from the OS entropy source.
///
/// The token is hex-encoded: 64 lowercase ASCII characters, safe to embed
/// in a URL path segment with no escaping or padding.
pub fn generate_raw_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Compute the deterministic storage/lookup key for a raw token.
///
/// Returns the lowercase 64-character hex SHA-256 digest of the token's
/// UTF-8 bytes. A future lookup by `hash_token(presented)` succeeds iff
/// `presented` is the same token that was issued.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
