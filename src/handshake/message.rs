//! Key-exchange message catalog.
//!
//! Six kinds, ordered by protocol phase and tagged with the role that sends
//! them. The order `QA < QB < NA < NB < MAC_TAG_A < MAC_TAG_B` is what lets a
//! device classify anything it reads from the discriminant alone.

use std::fmt;

use super::state::Role;
use crate::core::{CryptoBackend, FrameError};

/// Message kind identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// Initiator public key (QA).
    PublicKeyA = 0x01,
    /// Responder public key (QB).
    PublicKeyB = 0x02,
    /// Initiator nonce (NA).
    NonceA = 0x03,
    /// Responder nonce (NB).
    NonceB = 0x04,
    /// Initiator key-confirmation tag.
    ConfirmA = 0x05,
    /// Responder key-confirmation tag.
    ConfirmB = 0x06,
}

impl MessageKind {
    /// Every kind in protocol order.
    pub const ALL: [MessageKind; 6] = [
        MessageKind::PublicKeyA,
        MessageKind::PublicKeyB,
        MessageKind::NonceA,
        MessageKind::NonceB,
        MessageKind::ConfirmA,
        MessageKind::ConfirmB,
    ];

    /// Parse a kind from its discriminant.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::PublicKeyA),
            0x02 => Some(Self::PublicKeyB),
            0x03 => Some(Self::NonceA),
            0x04 => Some(Self::NonceB),
            0x05 => Some(Self::ConfirmA),
            0x06 => Some(Self::ConfirmB),
            _ => None,
        }
    }

    /// Discriminant byte.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Role that sends this kind.
    pub fn origin(self) -> Role {
        match self {
            Self::PublicKeyA | Self::NonceA | Self::ConfirmA => Role::Initiator,
            Self::PublicKeyB | Self::NonceB | Self::ConfirmB => Role::Responder,
        }
    }

    /// Payload size this kind must carry, as reported by the backend.
    pub fn payload_len<C: CryptoBackend + ?Sized>(self, backend: &C) -> usize {
        match self {
            Self::PublicKeyA | Self::PublicKeyB => backend.public_key_len(),
            Self::NonceA | Self::NonceB => backend.nonce_len(),
            Self::ConfirmA | Self::ConfirmB => backend.tag_len(),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PublicKeyA => "QA",
            Self::PublicKeyB => "QB",
            Self::NonceA => "NA",
            Self::NonceB => "NB",
            Self::ConfirmA => "MAC_TAG_A",
            Self::ConfirmB => "MAC_TAG_B",
        };
        f.write_str(name)
    }
}

/// A decoded handshake message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Kind discriminant.
    pub kind: MessageKind,
    /// Payload bytes.
    pub payload: Vec<u8>,
}

impl Message {
    /// Create a message.
    pub fn new(kind: MessageKind, payload: Vec<u8>) -> Self {
        Self { kind, payload }
    }

    /// Check the payload against the backend's size contract for its kind.
    pub fn check_payload_len<C: CryptoBackend + ?Sized>(
        &self,
        backend: &C,
    ) -> Result<(), FrameError> {
        let expected = self.kind.payload_len(backend);
        if self.payload.len() != expected {
            return Err(FrameError::PayloadLength {
                kind: self.kind.as_byte(),
                expected,
                actual: self.payload.len(),
            });
        }
        Ok(())
    }
}
