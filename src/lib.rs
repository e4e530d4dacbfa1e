//! # NFC Pairing
//!
//! Authenticated key establishment between two NFC devices that share one
//! passive tag image.
//!
//! One device runs the **Responder** role and polls the tag as an active
//! reader; the other runs the **Initiator** role and reaches the same image
//! over the tag's wired side, sensing reader accesses through the RF field.
//! Neither side can push data to the other: every message is a write that
//! replaces the image. The handshake therefore tolerates stale reads, its
//! own echoes and a peer that lags one phase behind.
//!
//! ```text
//! Initiator                     tag image                     Responder
//!     | ---- QA ------------------> [QA]
//!     |                             [QB] <------------------ QB ---- |
//!     | ---- NA ------------------> [NA]
//!     |                             [NB] <------------------ NB ---- |
//!     | ---- MAC_TAG_A -----------> [TA]
//!     |                             [TB] <----------- MAC_TAG_B ---- |
//! ```
//!
//! ## Feature Flags
//!
//! - `crypto` (default): X25519 / HKDF-SHA256 / HMAC-SHA256 backend and OS entropy
//! - `memory` (default): in-memory tag simulator for tests and demos
//!
//! ## Modules
//!
//! - [`core`]: traits, constants, configuration and error types (always included)
//! - [`transport`]: frame codec, NDEF record, timing gates, simulated medium
//! - [`handshake`]: message catalog and the session state machine
//! - [`crypto`]: built-in backend (requires `crypto` feature)
//!
//! ## Example Usage
//!
//! ```rust
//! # #[cfg(all(feature = "crypto", feature = "memory"))]
//! # fn main() -> Result<(), nfc_pairing::PairingError> {
//! use std::time::Duration;
//! use nfc_pairing::prelude::*;
//! use nfc_pairing::transport::memory::{MemoryMedium, SimClock};
//!
//! let clock = SimClock::new();
//! let medium = MemoryMedium::new([0x04, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06], clock.clone());
//!
//! let mut initiator = AuthenticationSession::initiator(
//!     NfcSecBackend::new(), medium.tag(), OsEntropy, SessionConfig::default());
//! let mut responder = AuthenticationSession::responder(
//!     NfcSecBackend::new(), medium.reader(), OsEntropy, SessionConfig::default());
//! initiator.begin_at(clock.now())?;
//! responder.begin_at(clock.now())?;
//!
//! let (mut a, mut b) = (false, false);
//! while !(a && b) {
//!     let now = clock.advance(Duration::from_millis(10));
//!     a |= initiator.tick_at(now);
//!     b |= responder.tick_at(now);
//! }
//! assert_eq!(initiator.backend().master_key(), responder.backend().master_key());
//! # Ok(())
//! # }
//! # #[cfg(not(all(feature = "crypto", feature = "memory")))]
//! # fn main() {}
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Frame codec and medium timing (always included)
pub mod transport;

// Handshake state machine (always included)
pub mod handshake;

// Built-in backend (feature-gated)
#[cfg(feature = "crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "crypto")))]
pub mod crypto;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core traits and types
    pub use crate::core::{
        CryptoBackend, CryptoError, EntropyError, EntropySource, FrameError, PairingError,
        SessionConfig, TagRead, Transport, TransportError,
    };

    // Handshake types
    pub use crate::handshake::{AuthenticationSession, Message, MessageKind, Role, State};

    // Crypto types (when enabled)
    #[cfg(feature = "crypto")]
    pub use crate::crypto::*;
}

// Re-export commonly used items at crate root
pub use crate::core::{CryptoBackend, EntropySource, PairingError, SessionConfig, Transport};
pub use crate::handshake::{AuthenticationSession, MessageKind, Role, State};
