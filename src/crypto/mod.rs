//! Built-in cryptographic backend
//!
//! - X25519 ephemeral key agreement
//! - HKDF-SHA256 master key derivation bound to the tag identity
//! - truncated HMAC-SHA256 key confirmation
//! - `rand`-backed entropy sources

mod backend;
mod entropy;
mod keys;

pub use backend::NfcSecBackend;
pub use entropy::{OsEntropy, RngEntropy};
pub use keys::EphemeralKeypair;
