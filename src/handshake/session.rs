//! Authentication session state machine.
//!
//! One [`AuthenticationSession`] per device, driven by calling
//! [`tick`](AuthenticationSession::tick) once per polling cycle. Each tick
//! performs at most one read and at most one write on the medium:
//!
//! 1. the pairing watchdog may force the state back to `AwaitingPeer`;
//! 2. the role gate decides whether the medium may be touched at all
//!    (reader: poll backoff, tag: a complete field-busy pulse);
//! 3. the state step reads, classifies, runs the backend and publishes the
//!    next message.
//!
//! Nothing here returns an error mid-handshake. Stale reads, corrupt frames
//! and failed writes cost one tick; resyncs move the state back; violations
//! and crypto failures end the attempt. The watchdog bounds everything else.

use std::time::Instant;

use tracing::{debug, info, trace, warn};

use super::message::{Message, MessageKind};
use super::state::{Expectation, Role, State, Verdict};
use crate::core::{
    CryptoBackend, CryptoError, EntropySource, PairingError, SessionConfig, Transport,
};
use crate::transport::frame;
use crate::transport::timing::{
    BackoffEvent, PairingWatchdog, PollBackoff, PulseDetector, PulseEvent, WatchdogEvent,
};

/// What an accepted message leads to.
struct Advance {
    /// Message to publish before moving on.
    reply: Option<MessageKind>,
    /// State after a successful publish.
    next: State,
    /// Whether this step completes the handshake.
    completes: bool,
}

/// Per-device authenticated key establishment session.
pub struct AuthenticationSession<C, T, E> {
    role: Role,
    state: State,
    config: SessionConfig,

    backend: C,
    transport: T,
    entropy: E,

    /// Own NFCID, initiator only.
    local_identity: Vec<u8>,
    /// Identity reported by the last successful read.
    remote_identity: Vec<u8>,

    watchdog: PairingWatchdog,
    backoff: PollBackoff,
    pulse: PulseDetector,

    started: bool,
    completed: u64,
}

impl<C, T, E> AuthenticationSession<C, T, E>
where
    C: CryptoBackend,
    T: Transport,
    E: EntropySource,
{
    /// Create a session for the field-sensing, tag-emulation side.
    pub fn initiator(backend: C, transport: T, entropy: E, config: SessionConfig) -> Self {
        Self::new(Role::Initiator, backend, transport, entropy, config)
    }

    /// Create a session for the active reader side.
    pub fn responder(backend: C, transport: T, entropy: E, config: SessionConfig) -> Self {
        Self::new(Role::Responder, backend, transport, entropy, config)
    }

    fn new(role: Role, backend: C, transport: T, entropy: E, config: SessionConfig) -> Self {
        let now = Instant::now();
        Self {
            role,
            state: State::AwaitingPeer,
            config,
            backend,
            transport,
            entropy,
            local_identity: Vec::new(),
            remote_identity: Vec::new(),
            watchdog: PairingWatchdog::new(now, config.pairing_timeout),
            backoff: PollBackoff::new(now, config.min_poll_interval),
            pulse: PulseDetector::new(config.min_pulse_duration),
            started: false,
            completed: 0,
        }
    }

    /// One-time setup using the current time.
    pub fn begin(&mut self) -> Result<(), PairingError> {
        self.begin_at(Instant::now())
    }

    /// One-time setup: configure the backend role, bind the initiator's own
    /// NFCID, generate the keypair and arm the timers from `now`.
    pub fn begin_at(&mut self, now: Instant) -> Result<(), PairingError> {
        self.config.validate()?;
        self.backend.set_role(self.role);

        if self.role == Role::Initiator {
            if let Some(id) = self.transport.local_identity() {
                self.backend.set_local_identity(&id);
                self.local_identity = id;
            }
        }

        self.backend.generate_keypair(&mut self.entropy)?;

        self.state = State::AwaitingPeer;
        self.watchdog = PairingWatchdog::new(now, self.config.pairing_timeout);
        self.backoff = PollBackoff::new(now, self.config.min_poll_interval);
        self.pulse = PulseDetector::new(self.config.min_pulse_duration);
        self.started = true;

        info!(role = %self.role, "pairing session started");
        Ok(())
    }

    /// Run one polling cycle using the current time.
    ///
    /// Returns `true` exactly on the tick a handshake completes.
    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    /// Run one polling cycle at `now`.
    pub fn tick_at(&mut self, now: Instant) -> bool {
        if !self.started {
            trace!(role = %self.role, "tick before begin");
            return false;
        }

        if self.watchdog.update(now, self.state == State::AwaitingPeer) == WatchdogEvent::Expired {
            warn!(role = %self.role, state = %self.state, "pairing timed out");
            self.transition(State::AwaitingPeer);
        }

        match self.role {
            Role::Responder => self.reader_tick(now),
            Role::Initiator => self.tag_tick(now),
        }
    }

    /// Fixed role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Own NFCID bound at `begin` (initiator only, empty otherwise).
    pub fn local_identity(&self) -> &[u8] {
        &self.local_identity
    }

    /// Identity reported by the last successful read.
    pub fn remote_identity(&self) -> &[u8] {
        &self.remote_identity
    }

    /// Number of handshakes completed.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The cryptographic backend.
    pub fn backend(&self) -> &C {
        &self.backend
    }

    /// The transport adapter.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport adapter.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Take the session apart.
    pub fn into_parts(self) -> (C, T, E) {
        (self.backend, self.transport, self.entropy)
    }

    fn reader_tick(&mut self, now: Instant) -> bool {
        if self.backoff.update(now) == BackoffEvent::Wait {
            return false;
        }
        self.backoff.mark_polled(now);

        if !self.transport.peer_present() {
            if self.state != State::AwaitingPeer {
                debug!(role = %self.role, "tag left the field");
            }
            self.transition(State::AwaitingPeer);
            return false;
        }

        self.step()
    }

    fn tag_tick(&mut self, now: Instant) -> bool {
        let busy = self.transport.field_busy();
        match self.pulse.update(now, busy) {
            PulseEvent::Found(width) => {
                trace!(
                    role = %self.role,
                    width_ms = width.as_millis() as u64,
                    "reader access detected"
                );
            }
            PulseEvent::TooShort(width) => {
                trace!(
                    role = %self.role,
                    width_ms = width.as_millis() as u64,
                    "ignoring short field pulse"
                );
                return false;
            }
            PulseEvent::None | PulseEvent::Started => return false,
        }

        if !self.transport.peer_present() {
            if self.state != State::AwaitingPeer {
                debug!(role = %self.role, "reader field lost");
            }
            self.transition(State::AwaitingPeer);
            return false;
        }

        self.step()
    }

    fn step(&mut self) -> bool {
        let state = self.state;
        let Some(expectation) = Expectation::for_state(self.role, state) else {
            return self.open_exchange();
        };

        let Some(msg) = self.receive() else {
            return false;
        };

        match expectation.classify(msg.kind) {
            Verdict::Expected => {}
            Verdict::Echo => {
                trace!(role = %self.role, state = %state, kind = %msg.kind, "ignoring own message");
                return false;
            }
            Verdict::Regress(target) => {
                debug!(
                    role = %self.role,
                    state = %state,
                    kind = %msg.kind,
                    "peer behind, resynchronizing"
                );
                self.transition(target);
                return false;
            }
            Verdict::Reset => {
                warn!(
                    role = %self.role,
                    state = %state,
                    kind = %msg.kind,
                    "unexpected message, resetting"
                );
                self.transition(State::AwaitingPeer);
                return false;
            }
        }

        let advance = match self.accept(state, &msg.payload) {
            Ok(Some(advance)) => advance,
            Ok(None) => {
                debug!(role = %self.role, kind = %msg.kind, "confirmation tag mismatch");
                return false;
            }
            Err(e) => {
                warn!(role = %self.role, state = %state, error = %e, "handshake attempt aborted");
                self.transition(State::AwaitingPeer);
                return false;
            }
        };

        if let Some(kind) = advance.reply {
            if !self.publish(kind) {
                return false;
            }
        }
        self.transition(advance.next);

        if advance.completes {
            self.completed += 1;
            info!(role = %self.role, completed = self.completed, "handshake complete");
        }
        advance.completes
    }

    /// `AwaitingPeer` with a peer present: the initiator opens with its
    /// public key, the responder starts listening for it.
    fn open_exchange(&mut self) -> bool {
        match self.role {
            Role::Responder => self.transition(State::ExchangingPublicKeys),
            Role::Initiator => {
                if self.publish(self.role.public_key_kind()) {
                    self.transition(State::ExchangingPublicKeys);
                }
            }
        }
        false
    }

    /// Read and decode one message. `None` covers every "nothing usable"
    /// case: no data, transport error, bad frame, size mismatch.
    fn receive(&mut self) -> Option<Message> {
        let read = match self.transport.read(self.config.read_timeout) {
            Ok(Some(read)) => read,
            Ok(None) => return None,
            Err(e) => {
                trace!(role = %self.role, error = %e, "read failed");
                return None;
            }
        };
        self.remote_identity = read.identity;

        let msg = match frame::decode(&read.frame) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(role = %self.role, state = %self.state, error = %e, "discarding frame");
                return None;
            }
        };
        if let Err(e) = msg.check_payload_len(&self.backend) {
            warn!(role = %self.role, state = %self.state, error = %e, "discarding frame");
            return None;
        }

        debug!(role = %self.role, state = %self.state, kind = %msg.kind, "read");
        Some(msg)
    }

    /// Run the backend for an expected message.
    ///
    /// `Ok(None)` is a confirmation tag that did not verify: no progress,
    /// state kept.
    fn accept(&mut self, state: State, payload: &[u8]) -> Result<Option<Advance>, CryptoError> {
        let advance = match state {
            State::ExchangingPublicKeys => {
                self.backend.set_peer_public_key(payload)?;
                self.backend.generate_nonce(&mut self.entropy)?;
                let reply = match self.role {
                    Role::Responder => self.role.public_key_kind(),
                    Role::Initiator => self.role.nonce_kind(),
                };
                Advance {
                    reply: Some(reply),
                    next: State::ExchangingNonces,
                    completes: false,
                }
            }
            State::ExchangingNonces => {
                // The reader has no NFCID; both sides bind the tag's.
                self.backend.set_local_identity(&self.remote_identity);
                self.backend.derive_master_key(payload, &self.remote_identity)?;
                let reply = match self.role {
                    Role::Responder => self.role.nonce_kind(),
                    Role::Initiator => self.role.confirm_kind(),
                };
                Advance {
                    reply: Some(reply),
                    next: State::AwaitingConfirmation,
                    completes: false,
                }
            }
            State::AwaitingConfirmation => {
                if !self.backend.verify_confirmation_tag(payload) {
                    return Ok(None);
                }
                let reply = match self.role {
                    Role::Responder => Some(self.role.confirm_kind()),
                    Role::Initiator => None,
                };
                Advance {
                    reply,
                    next: State::AwaitingPeer,
                    completes: true,
                }
            }
            State::AwaitingPeer => return Ok(None),
        };
        Ok(Some(advance))
    }

    /// Frame and write one of our messages. `false` leaves the state as is,
    /// so the same message goes out again on the next eligible tick.
    fn publish(&mut self, kind: MessageKind) -> bool {
        match self.try_publish(kind) {
            Ok(()) => {
                debug!(role = %self.role, kind = %kind, "written");
                true
            }
            Err(PairingError::Transport(e)) => {
                debug!(role = %self.role, kind = %kind, error = %e, "write failed, retrying");
                false
            }
            Err(e) => {
                warn!(
                    role = %self.role,
                    kind = %kind,
                    error = %e,
                    "cannot build message, resetting"
                );
                self.transition(State::AwaitingPeer);
                false
            }
        }
    }

    fn try_publish(&mut self, kind: MessageKind) -> Result<(), PairingError> {
        let frame = match kind {
            MessageKind::PublicKeyA | MessageKind::PublicKeyB => {
                frame::encode(kind, self.backend.public_key()?)?
            }
            MessageKind::NonceA | MessageKind::NonceB => {
                frame::encode(kind, self.backend.local_nonce()?)?
            }
            MessageKind::ConfirmA | MessageKind::ConfirmB => {
                frame::encode(kind, &self.backend.generate_confirmation_tag()?)?
            }
        };
        self.transport
            .write(frame.as_bytes(), self.config.write_timeout)?;
        Ok(())
    }

    fn transition(&mut self, next: State) {
        if self.state != next {
            debug!(role = %self.role, from = %self.state, to = %next, "state transition");
            self.state = next;
        }
    }
}
