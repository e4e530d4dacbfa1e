//! Protocol constants for NFC pairing.
//!
//! Frame and NDEF values are fixed by the wire format and MUST NOT be
//! changed. Timing values are defaults; see [`SessionConfig`](super::SessionConfig).

use std::time::Duration;

// =============================================================================
// FRAME LAYOUT
// =============================================================================

/// Size of the kind discriminant that opens every frame.
pub const KIND_SIZE: usize = 1;

/// Size of the trailing CRC-16 (low byte, then high byte).
pub const CHECKSUM_SIZE: usize = 2;

/// Maximum frame size, bounded by the shared payload buffer.
pub const MAX_FRAME_LEN: usize = 64;

/// Minimum decodable frame (kind + checksum, empty payload).
pub const MIN_FRAME_LEN: usize = KIND_SIZE + CHECKSUM_SIZE;

/// Largest payload a single frame can carry.
pub const MAX_PAYLOAD_LEN: usize = MAX_FRAME_LEN - KIND_SIZE - CHECKSUM_SIZE;

/// CRC-16 initial register value.
pub const CRC_INIT: u16 = 0xFFFF;

/// Reflected CCITT polynomial (0x1021 bit-reversed).
pub const CRC_POLY_REFLECTED: u16 = 0x8408;

// =============================================================================
// NDEF RECORD
// =============================================================================

/// Message Begin flag.
pub const NDEF_FLAG_MB: u8 = 0x80;

/// Message End flag.
pub const NDEF_FLAG_ME: u8 = 0x40;

/// Short Record flag (1-byte payload length).
pub const NDEF_FLAG_SR: u8 = 0x10;

/// ID Length field present.
pub const NDEF_FLAG_IL: u8 = 0x08;

/// Mask for the 3-bit Type Name Format.
pub const NDEF_TNF_MASK: u8 = 0x07;

/// TNF "Unknown": the frame is opaque to NDEF readers.
pub const NDEF_TNF_UNKNOWN: u8 = 0x05;

// =============================================================================
// TIMING DEFAULTS
// =============================================================================

/// Watchdog forcing a stalled handshake back to the initial state.
pub const PAIRING_TIMEOUT: Duration = Duration::from_millis(5000);

/// Minimum interval between medium accesses by the active reader.
///
/// Polling the tag faster than this starves its I2C side.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(150);

/// Shortest field-busy pulse the tag side treats as a reader access.
pub const MIN_PULSE_DURATION: Duration = Duration::from_millis(50);

/// Read timeout handed to the transport.
pub const READ_TIMEOUT: Duration = Duration::from_millis(200);

/// Write timeout handed to the transport.
pub const WRITE_TIMEOUT: Duration = Duration::from_millis(200);

// =============================================================================
// CRYPTOGRAPHIC CONSTANTS (built-in backend)
// =============================================================================

/// X25519 public key size.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// X25519 private key size.
pub const PRIVATE_KEY_SIZE: usize = 32;

/// Handshake nonce size (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Truncated key-confirmation tag size (96 bits).
pub const MAC_TAG_SIZE: usize = 12;

/// Derived master key size.
pub const MASTER_KEY_SIZE: usize = 32;

/// HKDF info label for the master key.
pub const MASTER_KEY_LABEL: &[u8] = b"nfc-pairing mk v1";

/// HMAC label prefix for the initiator's confirmation tag.
pub const CONFIRM_LABEL_A: &[u8] = b"KC_1_A";

/// HMAC label prefix for the responder's confirmation tag.
pub const CONFIRM_LABEL_B: &[u8] = b"KC_1_B";
