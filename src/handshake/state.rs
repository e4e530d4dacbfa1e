//! Handshake roles, states and the per-role resynchronization table.
//!
//! Both devices poll the same passive image, so whatever a device reads is
//! one of:
//!
//! - its own last message, not yet overwritten (an echo, ignored),
//! - the peer's previous message, the peer still catching up (regress),
//! - the message it is waiting for (accept),
//! - anything else (reset, or regress where the table says so).
//!
//! The two roles share one machine; [`Expectation::for_state`] is the only
//! place their behaviour differs.

use std::fmt;

use super::message::MessageKind;

/// Fixed role of a device in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Field-sensing, tag-emulation side. Writes first.
    Initiator,
    /// Active reader side.
    Responder,
}

impl Role {
    /// The other role.
    pub fn peer(self) -> Role {
        match self {
            Role::Initiator => Role::Responder,
            Role::Responder => Role::Initiator,
        }
    }

    /// Public-key kind this role sends.
    pub fn public_key_kind(self) -> MessageKind {
        match self {
            Role::Initiator => MessageKind::PublicKeyA,
            Role::Responder => MessageKind::PublicKeyB,
        }
    }

    /// Nonce kind this role sends.
    pub fn nonce_kind(self) -> MessageKind {
        match self {
            Role::Initiator => MessageKind::NonceA,
            Role::Responder => MessageKind::NonceB,
        }
    }

    /// Confirmation kind this role sends.
    pub fn confirm_kind(self) -> MessageKind {
        match self {
            Role::Initiator => MessageKind::ConfirmA,
            Role::Responder => MessageKind::ConfirmB,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => f.write_str("initiator"),
            Role::Responder => f.write_str("responder"),
        }
    }
}

/// Handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Initial and reset state.
    AwaitingPeer,
    /// Waiting for the peer's public key.
    ExchangingPublicKeys,
    /// Waiting for the peer's nonce.
    ExchangingNonces,
    /// Waiting for the peer's confirmation tag.
    AwaitingConfirmation,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::AwaitingPeer => "WAITING_FOR_PEER",
            State::ExchangingPublicKeys => "READING_PUBLIC_KEY",
            State::ExchangingNonces => "READING_NONCE",
            State::AwaitingConfirmation => "WAITING_FOR_MAC_TAG",
        };
        f.write_str(name)
    }
}

/// How a read message relates to the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The message this state waits for.
    Expected,
    /// Our own last message; retry the same state.
    Echo,
    /// The peer is behind; move back to the given state.
    Regress(State),
    /// Protocol violation or stale session; back to `AwaitingPeer`.
    Reset,
}

/// What a reading state accepts, ignores and regresses on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expectation {
    /// Kind that advances the state.
    pub expected: MessageKind,
    /// Own message that may still sit on the medium.
    pub echo: Option<MessageKind>,
    /// Peer's previous message and the state to regress to on seeing it.
    pub behind: Option<(MessageKind, State)>,
    /// Target for any other kind.
    pub fallback: State,
}

impl Expectation {
    /// Table entry for a role and state. `AwaitingPeer` reads nothing.
    pub fn for_state(role: Role, state: State) -> Option<Expectation> {
        use MessageKind::*;
        use State::*;

        let entry = match (role, state) {
            (_, AwaitingPeer) => return None,

            (Role::Responder, ExchangingPublicKeys) => Expectation {
                expected: PublicKeyA,
                echo: None,
                behind: None,
                fallback: AwaitingPeer,
            },
            (Role::Responder, ExchangingNonces) => Expectation {
                expected: NonceA,
                echo: Some(PublicKeyB),
                behind: None,
                fallback: ExchangingPublicKeys,
            },
            (Role::Responder, AwaitingConfirmation) => Expectation {
                expected: ConfirmA,
                echo: Some(NonceB),
                behind: Some((NonceA, ExchangingNonces)),
                fallback: AwaitingPeer,
            },

            (Role::Initiator, ExchangingPublicKeys) => Expectation {
                expected: PublicKeyB,
                echo: Some(PublicKeyA),
                behind: None,
                fallback: AwaitingPeer,
            },
            (Role::Initiator, ExchangingNonces) => Expectation {
                expected: NonceB,
                echo: Some(NonceA),
                behind: Some((PublicKeyB, ExchangingPublicKeys)),
                fallback: AwaitingPeer,
            },
            (Role::Initiator, AwaitingConfirmation) => Expectation {
                expected: ConfirmB,
                echo: Some(ConfirmA),
                behind: Some((NonceB, ExchangingNonces)),
                fallback: AwaitingPeer,
            },
        };
        Some(entry)
    }

    /// Classify a read kind.
    pub fn classify(&self, kind: MessageKind) -> Verdict {
        if kind == self.expected {
            return Verdict::Expected;
        }
        if self.echo == Some(kind) {
            return Verdict::Echo;
        }
        if let Some((behind, target)) = self.behind {
            if behind == kind {
                return Verdict::Regress(target);
            }
        }
        match self.fallback {
            State::AwaitingPeer => Verdict::Reset,
            target => Verdict::Regress(target),
        }
    }
}
