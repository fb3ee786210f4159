//! Opaque identifier generation for tokens and aliases.
//!
//! Everything here is derived from a fresh UUID run through SHA-256, so no
//! identifier is guessable from the principal id, the clock, or another
//! identifier.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Length of a subscription token in hex characters.
const TOKEN_LEN: usize = 12;

/// Length of a subscriber or file alias in hex characters.
const ALIAS_LEN: usize = 16;

fn random_hex(len: usize) -> String {
    let digest = Sha256::digest(Uuid::new_v4().as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(len);
    hex
}

/// A one-time subscription token.
pub fn subscription_token() -> String {
    random_hex(TOKEN_LEN)
}

/// A permanent anonymous alias for a subscriber.
pub fn subscriber_alias() -> String {
    random_hex(ALIAS_LEN)
}

/// An anonymous alias for a pool file.
pub fn file_alias() -> String {
    random_hex(ALIAS_LEN)
}

/// The shareable redemption reference for a token.
pub fn redemption_url(link_base: &str, token: &str) -> String {
    format!("{link_base}?start={token}")
}
