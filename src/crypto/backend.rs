//! Built-in cryptographic backend.
//!
//! Shaped after NFC-SEC-01 key agreement and confirmation:
//!
//! ```text
//! Z    = X25519(d, Q_peer)
//! MK   = HKDF-SHA256(salt = N_A || N_B, ikm = Z,
//!                    info = "nfc-pairing mk v1" || NFCID || Q_A || Q_B)
//! MacTag_X = HMAC-SHA256(MK, "KC_1_" X || NFCID || Q_A || Q_B)[..12]
//! ```
//!
//! Inputs are always ordered initiator first, so both roles derive the same
//! key and the same pair of tags.

use std::fmt;

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use super::keys::EphemeralKeypair;
use crate::core::{
    CONFIRM_LABEL_A, CONFIRM_LABEL_B, CryptoBackend, CryptoError, EntropySource, MAC_TAG_SIZE,
    MASTER_KEY_LABEL, MASTER_KEY_SIZE, NONCE_SIZE, PUBLIC_KEY_SIZE,
};
use crate::handshake::Role;

type HmacSha256 = Hmac<Sha256>;

/// X25519 / HKDF-SHA256 / HMAC-SHA256 backend.
pub struct NfcSecBackend {
    role: Role,
    keypair: Option<EphemeralKeypair>,
    identity: Vec<u8>,

    // Per attempt, overwritten by the next one
    peer_public: Option<[u8; PUBLIC_KEY_SIZE]>,
    local_nonce: Option<[u8; NONCE_SIZE]>,
    master_key: Option<Zeroizing<[u8; MASTER_KEY_SIZE]>>,
}

impl NfcSecBackend {
    /// Create a backend with no key material yet.
    pub fn new() -> Self {
        Self {
            role: Role::Initiator,
            keypair: None,
            identity: Vec::new(),
            peer_public: None,
            local_nonce: None,
            master_key: None,
        }
    }

    /// Master key agreed by the most recent derivation.
    pub fn master_key(&self) -> Option<&[u8; MASTER_KEY_SIZE]> {
        self.master_key.as_deref()
    }

    /// Identity bound into the derivation.
    pub fn identity(&self) -> &[u8] {
        &self.identity
    }

    /// Public keys ordered (Q_A, Q_B).
    fn ordered_keys(&self) -> Result<([u8; PUBLIC_KEY_SIZE], [u8; PUBLIC_KEY_SIZE]), CryptoError> {
        let local = *self
            .keypair
            .as_ref()
            .ok_or(CryptoError::MissingKeypair)?
            .public_key();
        let peer = self
            .peer_public
            .ok_or(CryptoError::MissingMaterial("peer public key"))?;
        Ok(match self.role {
            Role::Initiator => (local, peer),
            Role::Responder => (peer, local),
        })
    }

    fn confirmation_mac(&self, role: Role) -> Result<HmacSha256, CryptoError> {
        let mk = self
            .master_key
            .as_ref()
            .ok_or(CryptoError::MissingMaterial("master key"))?;
        let (qa, qb) = self.ordered_keys()?;
        let label = match role {
            Role::Initiator => CONFIRM_LABEL_A,
            Role::Responder => CONFIRM_LABEL_B,
        };

        let mut mac = <HmacSha256 as Mac>::new_from_slice(&mk[..])
            .map_err(|_| CryptoError::KeyDerivationFailed)?;
        mac.update(label);
        mac.update(&self.identity);
        mac.update(&qa);
        mac.update(&qb);
        Ok(mac)
    }
}

impl Default for NfcSecBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NfcSecBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NfcSecBackend")
            .field("role", &self.role)
            .field("keypair", &self.keypair)
            .field("has_peer_key", &self.peer_public.is_some())
            .field("has_master_key", &self.master_key.is_some())
            .finish_non_exhaustive()
    }
}

impl CryptoBackend for NfcSecBackend {
    fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    fn public_key_len(&self) -> usize {
        PUBLIC_KEY_SIZE
    }

    fn nonce_len(&self) -> usize {
        NONCE_SIZE
    }

    fn tag_len(&self) -> usize {
        MAC_TAG_SIZE
    }

    fn generate_keypair(&mut self, rng: &mut dyn EntropySource) -> Result<(), CryptoError> {
        self.keypair = Some(EphemeralKeypair::generate(rng)?);
        Ok(())
    }

    fn public_key(&self) -> Result<&[u8], CryptoError> {
        self.keypair
            .as_ref()
            .map(|kp| &kp.public_key()[..])
            .ok_or(CryptoError::MissingKeypair)
    }

    fn set_peer_public_key(&mut self, key: &[u8]) -> Result<(), CryptoError> {
        let key: [u8; PUBLIC_KEY_SIZE] =
            key.try_into().map_err(|_| CryptoError::InvalidPublicKey)?;
        self.peer_public = Some(key);
        Ok(())
    }

    fn generate_nonce(&mut self, rng: &mut dyn EntropySource) -> Result<(), CryptoError> {
        let mut nonce = [0u8; NONCE_SIZE];
        rng.fill(&mut nonce)?;
        self.local_nonce = Some(nonce);
        Ok(())
    }

    fn local_nonce(&self) -> Result<&[u8], CryptoError> {
        self.local_nonce
            .as_ref()
            .map(|n| &n[..])
            .ok_or(CryptoError::MissingMaterial("local nonce"))
    }

    fn derive_master_key(
        &mut self,
        peer_nonce: &[u8],
        shared_identity: &[u8],
    ) -> Result<(), CryptoError> {
        let keypair = self.keypair.as_ref().ok_or(CryptoError::MissingKeypair)?;
        let peer_public = self
            .peer_public
            .ok_or(CryptoError::MissingMaterial("peer public key"))?;
        let local_nonce = self
            .local_nonce
            .ok_or(CryptoError::MissingMaterial("local nonce"))?;
        if peer_nonce.len() != NONCE_SIZE {
            return Err(CryptoError::KeyDerivationFailed);
        }

        let z = keypair.diffie_hellman(&peer_public)?;
        self.identity = shared_identity.to_vec();
        let (qa, qb) = self.ordered_keys()?;
        let (na, nb) = match self.role {
            Role::Initiator => (&local_nonce[..], peer_nonce),
            Role::Responder => (peer_nonce, &local_nonce[..]),
        };

        let mut salt = [0u8; 2 * NONCE_SIZE];
        salt[..NONCE_SIZE].copy_from_slice(na);
        salt[NONCE_SIZE..].copy_from_slice(nb);

        let mut info = Vec::with_capacity(
            MASTER_KEY_LABEL.len() + shared_identity.len() + 2 * PUBLIC_KEY_SIZE,
        );
        info.extend_from_slice(MASTER_KEY_LABEL);
        info.extend_from_slice(shared_identity);
        info.extend_from_slice(&qa);
        info.extend_from_slice(&qb);

        let hk = Hkdf::<Sha256>::new(Some(&salt[..]), &z[..]);
        let mut mk = Zeroizing::new([0u8; MASTER_KEY_SIZE]);
        hk.expand(&info, &mut mk[..])
            .map_err(|_| CryptoError::KeyDerivationFailed)?;

        self.master_key = Some(mk);
        Ok(())
    }

    fn generate_confirmation_tag(&self) -> Result<Vec<u8>, CryptoError> {
        let mac = self.confirmation_mac(self.role)?;
        Ok(mac.finalize().into_bytes()[..MAC_TAG_SIZE].to_vec())
    }

    fn verify_confirmation_tag(&self, tag: &[u8]) -> bool {
        if tag.len() != MAC_TAG_SIZE {
            return false;
        }
        match self.confirmation_mac(self.role.peer()) {
            Ok(mac) => mac.verify_truncated_left(tag).is_ok(),
            Err(_) => false,
        }
    }

    fn set_local_identity(&mut self, identity: &[u8]) {
        self.identity = identity.to_vec();
    }
}
