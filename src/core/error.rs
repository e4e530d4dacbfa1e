//! Error types for NFC pairing.
//!
//! None of these escape [`tick`](crate::handshake::AuthenticationSession::tick):
//! the session classifies each one as "no progress", a resync, or an aborted
//! attempt. They surface to callers only from setup and from the lower-level
//! codec and backend APIs.

use thiserror::Error;

/// Errors decoding or encoding a frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes than kind + checksum.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Frame would not fit the shared payload buffer.
    #[error("frame too long: at most {max} bytes, got {actual}")]
    TooLong {
        /// Maximum length.
        max: usize,
        /// Actual length.
        actual: usize,
    },

    /// Trailing CRC does not match the frame contents.
    #[error("checksum mismatch: computed {expected:#06x}, frame carries {actual:#06x}")]
    ChecksumMismatch {
        /// CRC computed over the frame.
        expected: u16,
        /// CRC carried in the frame.
        actual: u16,
    },

    /// Discriminant outside the message catalog.
    #[error("unknown message kind {0:#04x}")]
    UnknownKind(u8),

    /// Payload size does not match the backend's contract for its kind.
    #[error("payload length for kind {kind:#04x}: expected {expected}, got {actual}")]
    PayloadLength {
        /// Kind discriminant.
        kind: u8,
        /// Backend-reported size.
        expected: usize,
        /// Received size.
        actual: usize,
    },
}

/// Errors parsing an NDEF tag image.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NdefError {
    /// Image holds no record.
    #[error("empty NDEF message")]
    Empty,

    /// Record header announces more bytes than the image holds.
    #[error("truncated NDEF record")]
    Truncated,

    /// Payload does not fit a short record.
    #[error("payload of {0} bytes does not fit a short record")]
    PayloadTooLong(usize),
}

/// Entropy source failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("entropy source failed: {0}")]
pub struct EntropyError(pub String);

/// Errors in the cryptographic backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Random bytes could not be drawn.
    #[error(transparent)]
    Entropy(#[from] EntropyError),

    /// Operation needs a keypair that has not been generated.
    #[error("keypair not generated")]
    MissingKeypair,

    /// Operation needs material from an earlier handshake step.
    #[error("missing handshake material: {0}")]
    MissingMaterial(&'static str),

    /// Peer public key has the wrong size or is unusable.
    #[error("invalid peer public key")]
    InvalidPublicKey,

    /// Key derivation failed.
    #[error("key derivation failed")]
    KeyDerivationFailed,
}

/// Errors reported by a physical transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The field or the tag's other interface is in use.
    #[error("medium busy")]
    Busy,

    /// No peer in range.
    #[error("peer not present")]
    NotPresent,

    /// Adapter-specific I/O failure.
    #[error("transport i/o: {0}")]
    Io(String),
}

/// Invalid session configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A duration that must be positive is zero.
    #[error("{0} must be non-zero")]
    ZeroDuration(&'static str),

    /// The watchdog would fire before the reader could poll twice.
    #[error("pairing timeout must exceed twice the poll interval")]
    TimeoutTooShort,
}

/// Top-level pairing errors.
#[derive(Debug, Error)]
pub enum PairingError {
    /// Frame error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Crypto error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
