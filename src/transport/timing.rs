//! Watchdog, backoff and field-pulse timing.
//!
//! The shared medium has no arbitration of its own. These small state
//! machines decide, per tick, whether a session may touch it at all:
//!
//! - [`PairingWatchdog`] bounds how long a handshake can stall.
//! - [`PollBackoff`] keeps the active reader from polling too often.
//! - [`PulseDetector`] lets the tag side act only after a complete reader
//!   access, so it never competes with the reader for the image.

use std::time::{Duration, Instant};

/// Watchdog decision for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogEvent {
    /// Session is awaiting a peer; the deadline follows `now`.
    Idle,
    /// Handshake in flight, deadline not reached.
    Armed,
    /// Deadline passed; the session must return to `AwaitingPeer`.
    Expired,
}

/// Forces a stalled handshake back to the initial state.
#[derive(Debug, Clone)]
pub struct PairingWatchdog {
    /// Last time the session was seen awaiting a peer.
    started: Instant,
    timeout: Duration,
}

impl PairingWatchdog {
    /// Create a watchdog armed from `now`.
    pub fn new(now: Instant, timeout: Duration) -> Self {
        Self {
            started: now,
            timeout,
        }
    }

    /// Evaluate the watchdog for this tick.
    ///
    /// On `Expired` the start mark moves to `now`, so a session that stays
    /// stuck expires again only after another full timeout. A deadline past
    /// the end of `Instant` never expires.
    pub fn update(&mut self, now: Instant, awaiting_peer: bool) -> WatchdogEvent {
        if awaiting_peer {
            self.started = now;
            return WatchdogEvent::Idle;
        }
        match self.deadline() {
            Some(deadline) if now > deadline => {
                self.started = now;
                WatchdogEvent::Expired
            }
            _ => WatchdogEvent::Armed,
        }
    }

    /// Instant after which the in-flight attempt expires, if representable.
    pub fn deadline(&self) -> Option<Instant> {
        self.started.checked_add(self.timeout)
    }
}

/// Backoff decision for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffEvent {
    /// The medium may be accessed.
    Ready,
    /// Inside the backoff window.
    Wait,
}

/// Minimum spacing between reader accesses to the tag.
#[derive(Debug, Clone)]
pub struct PollBackoff {
    last_poll: Instant,
    interval: Duration,
}

impl PollBackoff {
    /// Create a backoff whose first window starts at `now`.
    pub fn new(now: Instant, interval: Duration) -> Self {
        Self {
            last_poll: now,
            interval,
        }
    }

    /// Check whether the window has elapsed.
    pub fn update(&self, now: Instant) -> BackoffEvent {
        match self.next_allowed() {
            Some(next) if now >= next => BackoffEvent::Ready,
            _ => BackoffEvent::Wait,
        }
    }

    /// Record a medium access at `now`.
    pub fn mark_polled(&mut self, now: Instant) {
        self.last_poll = now;
    }

    /// Earliest instant the next access is allowed, if representable.
    pub fn next_allowed(&self) -> Option<Instant> {
        self.last_poll.checked_add(self.interval)
    }
}

/// Pulse debouncer result for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseEvent {
    /// Nothing changed.
    None,
    /// Field went busy.
    Started,
    /// Field went idle after a pulse longer than the threshold.
    Found(Duration),
    /// Field went idle after a pulse too short to be a reader access.
    TooShort(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PulseState {
    Idle,
    Active { start: Instant },
}

/// Detects complete field-busy pulses longer than a minimum duration.
#[derive(Debug, Clone)]
pub struct PulseDetector {
    state: PulseState,
    min_duration: Duration,
}

impl PulseDetector {
    /// Create an idle detector.
    pub fn new(min_duration: Duration) -> Self {
        Self {
            state: PulseState::Idle,
            min_duration,
        }
    }

    /// Feed one field-busy sample.
    pub fn update(&mut self, now: Instant, busy: bool) -> PulseEvent {
        match self.state {
            PulseState::Idle => {
                if busy {
                    self.state = PulseState::Active { start: now };
                    PulseEvent::Started
                } else {
                    PulseEvent::None
                }
            }
            PulseState::Active { start } => {
                if busy {
                    return PulseEvent::None;
                }
                self.state = PulseState::Idle;
                let width = now.saturating_duration_since(start);
                if width > self.min_duration {
                    PulseEvent::Found(width)
                } else {
                    PulseEvent::TooShort(width)
                }
            }
        }
    }

    /// Whether a pulse is currently in progress.
    pub fn is_active(&self) -> bool {
        matches!(self.state, PulseState::Active { .. })
    }
}
