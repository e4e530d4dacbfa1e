//! Transport layer
//!
//! Everything between the handshake and the physical tag:
//!
//! - **Frame codec**: [`frame::encode`] / [`frame::decode`] with a trailing CRC-16
//! - **NDEF wrapping**: [`ndef::wrap`] / [`ndef::first_record_payload`]
//! - **Medium timing**: [`PairingWatchdog`], [`PollBackoff`], [`PulseDetector`]
//! - **Simulated medium**: [`memory::MemoryMedium`] (requires `memory`)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       AuthenticationSession             │
//! ├─────────────────────────────────────────┤
//! │   frames, NDEF record, timing gates     │  ← This module
//! ├─────────────────────────────────────────┤
//! │   Transport adapter (reader / tag)      │
//! ├─────────────────────────────────────────┤
//! │   shared passive tag image              │
//! └─────────────────────────────────────────┘
//! ```

pub mod frame;
pub mod ndef;
pub mod timing;

#[cfg(feature = "memory")]
#[cfg_attr(docsrs, doc(cfg(feature = "memory")))]
pub mod memory;

pub use frame::{Frame, crc16, decode, encode};
pub use timing::{
    BackoffEvent, PairingWatchdog, PollBackoff, PulseDetector, PulseEvent, WatchdogEvent,
};
