//! Collaborator traits for the pairing session.
//!
//! The session drives three collaborators it owns exclusively: a
//! cryptographic backend, a transport adapter for its role, and an entropy
//! source. Implementations live outside the state machine; the built-in
//! ones are in [`crate::crypto`] and [`crate::transport::memory`].

use std::time::Duration;

use super::error::{CryptoError, EntropyError, TransportError};
use crate::handshake::Role;

/// Source of unpredictable bytes.
pub trait EntropySource {
    /// Fill `dest` completely, or fail.
    ///
    /// A failure aborts the handshake attempt in progress.
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError>;
}

impl<E: EntropySource + ?Sized> EntropySource for &mut E {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
        (**self).fill(dest)
    }
}

/// Key agreement and key confirmation primitives.
///
/// # Lifecycle
///
/// - `generate_keypair` runs once per session, at `begin`.
/// - `set_peer_public_key` and `generate_nonce` run once per attempt.
/// - `derive_master_key` runs once both nonces are known.
/// - the confirmation tag is generated and verified once per attempt.
///
/// An abandoned attempt leaves stale per-attempt fields behind; the next
/// attempt MUST be able to overwrite all of them without regenerating the
/// keypair.
pub trait CryptoBackend {
    /// Select which confirmation tag this side produces and which it verifies.
    fn set_role(&mut self, role: Role);

    /// Public key size in bytes.
    fn public_key_len(&self) -> usize;

    /// Nonce size in bytes.
    fn nonce_len(&self) -> usize;

    /// Confirmation tag size in bytes.
    fn tag_len(&self) -> usize;

    /// Generate the key-agreement keypair.
    fn generate_keypair(&mut self, rng: &mut dyn EntropySource) -> Result<(), CryptoError>;

    /// Local public key.
    fn public_key(&self) -> Result<&[u8], CryptoError>;

    /// Record the peer's public key for this attempt.
    fn set_peer_public_key(&mut self, key: &[u8]) -> Result<(), CryptoError>;

    /// Draw a fresh local nonce for this attempt.
    fn generate_nonce(&mut self, rng: &mut dyn EntropySource) -> Result<(), CryptoError>;

    /// Local nonce for this attempt.
    fn local_nonce(&self) -> Result<&[u8], CryptoError>;

    /// Derive the master key from the peer's nonce and the shared identity.
    fn derive_master_key(
        &mut self,
        peer_nonce: &[u8],
        shared_identity: &[u8],
    ) -> Result<(), CryptoError>;

    /// Key-confirmation tag for this side's role.
    fn generate_confirmation_tag(&self) -> Result<Vec<u8>, CryptoError>;

    /// Check the peer's key-confirmation tag.
    fn verify_confirmation_tag(&self, tag: &[u8]) -> bool;

    /// Set the identity bound into key derivation.
    fn set_local_identity(&mut self, identity: &[u8]);
}

/// One read of the tag image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRead {
    /// UID of the tag the image was read from.
    pub identity: Vec<u8>,
    /// Frame bytes carried in the first NDEF record.
    pub frame: Vec<u8>,
}

/// Role-specific NFC adapter.
///
/// Reads and writes may block for on the order of 100 ms; the session calls
/// at most one read and one write per tick and never concurrently.
pub trait Transport {
    /// Non-blocking presence check: a tag in the field (reader side) or a
    /// reader field on the antenna (tag side).
    fn peer_present(&mut self) -> bool;

    /// Read the shared image.
    ///
    /// `Ok(None)` means nothing new; it is not an error.
    fn read(&mut self, timeout: Duration) -> Result<Option<TagRead>, TransportError>;

    /// Replace the shared image with `frame`.
    fn write(&mut self, frame: &[u8], timeout: Duration) -> Result<(), TransportError>;

    /// Whether the RF interface is currently busy. Polled every tick by the
    /// initiator; readers keep the default.
    fn field_busy(&mut self) -> bool {
        false
    }

    /// This device's own NFCID, if it has one. Readers keep the default.
    fn local_identity(&mut self) -> Option<Vec<u8>> {
        None
    }
}
