//! X25519 key management
//!
//! One ephemeral keypair per session, drawn from the session's entropy
//! source at `begin` and reused across handshake attempts.

use std::fmt;

use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::core::{CryptoError, EntropySource, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};

/// An X25519 keypair for the duration of one session.
///
/// The secret scalar is zeroized on drop.
pub struct EphemeralKeypair {
    secret: StaticSecret,
    public: [u8; PUBLIC_KEY_SIZE],
}

impl EphemeralKeypair {
    /// Generate a keypair from 32 entropy bytes.
    pub fn generate(rng: &mut dyn EntropySource) -> Result<Self, CryptoError> {
        let mut seed = Zeroizing::new([0u8; PRIVATE_KEY_SIZE]);
        rng.fill(seed.as_mut())?;
        Ok(Self::from_secret_bytes(*seed))
    }

    /// Create a keypair from an existing secret scalar.
    pub fn from_secret_bytes(bytes: [u8; PRIVATE_KEY_SIZE]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret).to_bytes();
        Self { secret, public }
    }

    /// Get the public key.
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.public
    }

    /// Compute the shared secret with a peer public key.
    ///
    /// Low-order peer points yield an all-zero secret and are rejected.
    pub fn diffie_hellman(
        &self,
        peer_public: &[u8; PUBLIC_KEY_SIZE],
    ) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
        let shared = self.secret.diffie_hellman(&PublicKey::from(*peer_public));
        if !shared.was_contributory() {
            return Err(CryptoError::KeyDerivationFailed);
        }
        Ok(Zeroizing::new(shared.to_bytes()))
    }
}

impl fmt::Debug for EphemeralKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeypair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}
