//! # signbook-token
//!
//! Token codec and expiry policy for the one-time request flows.

pub mod codec;
pub mod expiry;

pub use codec::{generate_raw_token, hash_token, TOKEN_BYTES};
pub use expiry::{add_days, DEFAULT_EXPIRY_DAYS};
