//! Session configuration.

use std::time::Duration;

use super::constants::{
    MIN_POLL_INTERVAL, MIN_PULSE_DURATION, PAIRING_TIMEOUT, READ_TIMEOUT, WRITE_TIMEOUT,
};
use super::error::ConfigError;

/// Timing parameters for one [`AuthenticationSession`](crate::handshake::AuthenticationSession).
///
/// Defaults come from [`constants`](super::constants).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum time a handshake may spend away from `AwaitingPeer`.
    pub pairing_timeout: Duration,
    /// Responder backoff between medium accesses.
    pub min_poll_interval: Duration,
    /// Initiator pulse debounce threshold.
    pub min_pulse_duration: Duration,
    /// Timeout passed to transport reads.
    pub read_timeout: Duration,
    /// Timeout passed to transport writes.
    pub write_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pairing_timeout: PAIRING_TIMEOUT,
            min_poll_interval: MIN_POLL_INTERVAL,
            min_pulse_duration: MIN_PULSE_DURATION,
            read_timeout: READ_TIMEOUT,
            write_timeout: WRITE_TIMEOUT,
        }
    }
}

impl SessionConfig {
    /// Set the pairing watchdog timeout.
    pub fn with_pairing_timeout(mut self, timeout: Duration) -> Self {
        self.pairing_timeout = timeout;
        self
    }

    /// Set the responder poll interval.
    pub fn with_min_poll_interval(mut self, interval: Duration) -> Self {
        self.min_poll_interval = interval;
        self
    }

    /// Set the initiator pulse threshold.
    pub fn with_min_pulse_duration(mut self, duration: Duration) -> Self {
        self.min_pulse_duration = duration;
        self
    }

    /// Set the transport read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the transport write timeout.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Check the configuration for values the session cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("pairing_timeout", self.pairing_timeout),
            ("min_poll_interval", self.min_poll_interval),
            ("read_timeout", self.read_timeout),
            ("write_timeout", self.write_timeout),
        ];
        for (name, value) in durations {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration(name));
            }
        }
        match self.min_poll_interval.checked_mul(2) {
            Some(two_polls) if self.pairing_timeout > two_polls => Ok(()),
            _ => Err(ConfigError::TimeoutTooShort),
        }
    }
}
