//! End-to-end handshakes between both roles over the in-memory tag.

#![cfg(all(feature = "crypto", feature = "memory"))]

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use nfc_pairing::core::{EntropyError, MIN_POLL_INTERVAL, PAIRING_TIMEOUT};
use nfc_pairing::crypto::RngEntropy;
use nfc_pairing::prelude::*;
use nfc_pairing::transport::memory::{MemoryMedium, ReaderEndpoint, SimClock, TagEndpoint};
use rand::SeedableRng;
use rand::rngs::StdRng;

const UID: [u8; 7] = [0x04, 0xA2, 0x3B, 0x91, 0x5C, 0x12, 0x80];
const STEP: Duration = Duration::from_millis(10);
const T: Duration = Duration::from_millis(200);

type Session<X, E> = AuthenticationSession<NfcSecBackend, X, E>;

struct Pair<E> {
    clock: SimClock,
    medium: MemoryMedium,
    initiator: Session<TagEndpoint, E>,
    responder: Session<ReaderEndpoint, E>,
}

impl Pair<RngEntropy<StdRng>> {
    fn seeded(seed: u64) -> Self {
        Self::with_entropy(
            RngEntropy::new(StdRng::seed_from_u64(seed)),
            RngEntropy::new(StdRng::seed_from_u64(seed.wrapping_add(1))),
        )
    }
}

impl<E: EntropySource> Pair<E> {
    fn with_entropy(initiator_entropy: E, responder_entropy: E) -> Self {
        let clock = SimClock::new();
        let medium = MemoryMedium::new(UID, clock.clone());
        Self::on_medium(medium, initiator_entropy, responder_entropy)
    }

    fn on_medium(medium: MemoryMedium, initiator_entropy: E, responder_entropy: E) -> Self {
        let clock = medium.clock().clone();
        let config = SessionConfig::default();
        let mut initiator = AuthenticationSession::initiator(
            NfcSecBackend::new(),
            medium.tag(),
            initiator_entropy,
            config,
        );
        let mut responder = AuthenticationSession::responder(
            NfcSecBackend::new(),
            medium.reader(),
            responder_entropy,
            config,
        );
        initiator.begin_at(clock.now()).unwrap();
        responder.begin_at(clock.now()).unwrap();
        Self {
            clock,
            medium,
            initiator,
            responder,
        }
    }

    /// Advance one step and tick both sides, initiator first.
    fn step(&mut self) -> Instant {
        let now = self.clock.advance(STEP);
        self.initiator.tick_at(now);
        self.responder.tick_at(now);
        now
    }

    fn both_paired(&self) -> bool {
        self.initiator.completed() > 0 && self.responder.completed() > 0
    }

    /// Step until both sides completed once, calling `on_step` after every step.
    fn run(&mut self, limit: Duration, mut on_step: impl FnMut(&mut Self)) -> bool {
        let t0 = self.clock.now();
        while self.clock.now() - t0 < limit {
            self.step();
            on_step(self);
            if self.both_paired() {
                return true;
            }
        }
        false
    }

    fn assert_agreed(&self) {
        let a = self.initiator.backend().master_key();
        assert!(a.is_some());
        assert_eq!(a, self.responder.backend().master_key());
    }
}

/// Hands out fixed byte strings, one per fill.
struct VectorEntropy(VecDeque<Vec<u8>>);

impl VectorEntropy {
    fn new(chunks: &[&str]) -> Self {
        Self(chunks.iter().map(|c| hex::decode(c).unwrap()).collect())
    }
}

impl EntropySource for VectorEntropy {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
        match self.0.pop_front() {
            Some(chunk) if chunk.len() == dest.len() => {
                dest.copy_from_slice(&chunk);
                Ok(())
            }
            _ => Err(EntropyError("test vectors exhausted".into())),
        }
    }
}

#[test]
fn test_six_messages_in_order_and_equal_keys() {
    let mut pair = Pair::seeded(1);
    assert!(pair.run(Duration::from_secs(2), |_| {}));

    assert_eq!(
        pair.medium.written_kinds(),
        vec![
            MessageKind::PublicKeyA,
            MessageKind::PublicKeyB,
            MessageKind::NonceA,
            MessageKind::NonceB,
            MessageKind::ConfirmA,
            MessageKind::ConfirmB,
        ]
    );
    for (role, frame) in pair.medium.written_frames() {
        let kind = MessageKind::from_byte(frame[0]).unwrap();
        assert_eq!(kind.origin(), role);
    }

    pair.assert_agreed();
    assert_eq!(pair.initiator.state(), State::AwaitingPeer);
    assert_eq!(pair.responder.state(), State::AwaitingPeer);
    assert_eq!(pair.initiator.local_identity(), &UID[..]);
    assert_eq!(pair.initiator.remote_identity(), &UID[..]);
    assert_eq!(pair.responder.remote_identity(), &UID[..]);
    assert_eq!(pair.responder.backend().identity(), &UID[..]);
}

#[test]
fn test_fixed_vectors_reach_the_wire() {
    // RFC 7748 section 6.1 scalars, then one nonce each
    const ALICE_SK: &str = "77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a";
    const ALICE_PK: &str = "8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a";
    const BOB_SK: &str = "5dab087e624a8a4b79e17f8b83800ee66f3bb1292618b6fd1c2f8b27ff88e0eb";
    const BOB_PK: &str = "de9edb7d7b7dc1b4d35b61c2ece435373f8343c85b78674dadfc7e146f882b4f";
    const NONCE_A: &str = "000102030405060708090a0b";
    const NONCE_B: &str = "f0f1f2f3f4f5f6f7f8f9fafb";

    let mut pair = Pair::with_entropy(
        VectorEntropy::new(&[ALICE_SK, NONCE_A]),
        VectorEntropy::new(&[BOB_SK, NONCE_B]),
    );
    assert!(pair.run(Duration::from_secs(2), |_| {}));

    let payloads: Vec<String> = pair
        .medium
        .written_frames()
        .iter()
        .map(|(_, f)| hex::encode(&f[1..f.len() - 2]))
        .collect();
    assert_eq!(&payloads[..4], &[ALICE_PK, BOB_PK, NONCE_A, NONCE_B]);
    assert_eq!(payloads[4].len(), 24);
    pair.assert_agreed();
}

#[test]
fn test_same_seeds_same_key() {
    let mut a = Pair::seeded(7);
    let mut b = Pair::seeded(7);
    let mut c = Pair::seeded(8);
    assert!(a.run(Duration::from_secs(2), |_| {}));
    assert!(b.run(Duration::from_secs(2), |_| {}));
    assert!(c.run(Duration::from_secs(2), |_| {}));

    assert_eq!(
        a.initiator.backend().master_key(),
        b.initiator.backend().master_key()
    );
    assert_ne!(
        a.initiator.backend().master_key(),
        c.initiator.backend().master_key()
    );
}

#[test]
fn test_duplicate_public_key_a_regresses_then_completes() {
    let mut pair = Pair::seeded(2);
    let mut injected = false;
    let mut saw_regress = false;

    let done = pair.run(Duration::from_secs(5), |p| {
        if injected && !saw_regress && p.responder.state() != State::ExchangingNonces {
            assert_eq!(p.responder.state(), State::ExchangingPublicKeys);
            saw_regress = true;
        }
        if !injected && p.responder.state() == State::ExchangingNonces {
            let (_, qa) = p.medium.written_frames()[0].clone();
            p.medium.inject_frame(&qa).unwrap();
            injected = true;
        }
    });

    assert!(injected);
    assert!(saw_regress);
    assert!(done);
    pair.assert_agreed();

    // QB went out twice; everything else once, still in protocol order
    let kinds = pair.medium.written_kinds();
    assert_eq!(
        kinds.iter().filter(|k| **k == MessageKind::PublicKeyB).count(),
        2
    );
    assert_eq!(kinds.last(), Some(&MessageKind::ConfirmB));
}

#[test]
fn test_corrupted_nonce_b_is_discarded_then_completes() {
    let mut pair = Pair::seeded(3);
    let mut corrupted = false;
    let mut checked = false;

    let done = pair.run(Duration::from_secs(5), |p| {
        if corrupted && !checked && !p.medium.corruption_pending(Role::Initiator) {
            // The corrupted NB was read and dropped
            assert_eq!(p.initiator.state(), State::ExchangingNonces);
            checked = true;
        }
        if !corrupted && p.responder.state() == State::AwaitingConfirmation {
            p.medium.corrupt_next_read(Role::Initiator);
            corrupted = true;
        }
    });

    assert!(checked);
    assert!(done);
    pair.assert_agreed();
    assert_eq!(pair.medium.written_kinds().len(), 6);
}

#[test]
fn test_redelivered_frame_never_advances_two_steps() {
    let clock = SimClock::new();
    let medium = MemoryMedium::new(UID, clock.clone());
    let mut responder = AuthenticationSession::responder(
        NfcSecBackend::new(),
        medium.reader(),
        RngEntropy::new(StdRng::seed_from_u64(4)),
        SessionConfig::default(),
    );
    responder.begin_at(clock.now()).unwrap();

    // A foreign initiator key, replayed before every reader poll
    let mut stranger = NfcSecBackend::new();
    stranger
        .generate_keypair(&mut RngEntropy::new(StdRng::seed_from_u64(5)))
        .unwrap();
    let qa = nfc_pairing::transport::encode(
        MessageKind::PublicKeyA,
        stranger.public_key().unwrap(),
    )
    .unwrap();

    for _ in 0..300 {
        medium.inject_frame(qa.as_bytes()).unwrap();
        responder.tick_at(clock.advance(STEP));
        assert!(matches!(
            responder.state(),
            State::AwaitingPeer | State::ExchangingPublicKeys | State::ExchangingNonces
        ));
    }
    assert_eq!(responder.completed(), 0);
    assert!(
        medium
            .written_kinds()
            .iter()
            .all(|k| *k == MessageKind::PublicKeyB)
    );
}

#[test]
fn test_stale_nonce_a_keeps_bound_identity_and_key() {
    let mut pair = Pair::seeded(11);
    let mut snapshot: Option<(Vec<u8>, Vec<u8>, [u8; 32])> = None;
    let mut saw_regress = false;

    let done = pair.run(Duration::from_secs(5), |p| {
        if let Some((identity, remote, key)) = &snapshot {
            assert_eq!(p.responder.backend().identity(), &identity[..]);
            assert_eq!(p.responder.remote_identity(), &remote[..]);
            assert_eq!(p.responder.backend().master_key(), Some(key));
            assert_eq!(p.initiator.backend().identity(), &UID[..]);
            saw_regress |= p.responder.state() == State::ExchangingNonces;
            return;
        }
        if p.responder.state() == State::AwaitingConfirmation {
            let key = *p.responder.backend().master_key().unwrap();
            snapshot = Some((
                p.responder.backend().identity().to_vec(),
                p.responder.remote_identity().to_vec(),
                key,
            ));
            // NB is on the tag; put the initiator's NA back over it
            let (role, na) = p.medium.written_frames()[2].clone();
            assert_eq!(role, Role::Initiator);
            p.medium.inject_frame(&na).unwrap();
        }
    });

    assert!(snapshot.is_some());
    assert!(saw_regress);
    assert!(done);
    pair.assert_agreed();
    assert_eq!(
        pair.initiator.backend().master_key(),
        snapshot.as_ref().map(|(_, _, key)| key)
    );
    assert_eq!(
        pair.medium
            .written_kinds()
            .iter()
            .filter(|k| **k == MessageKind::NonceB)
            .count(),
        2
    );
}

#[test]
fn test_watchdog_resets_abandoned_handshake() {
    let mut pair = Pair::seeded(9);

    // Drive both until the responder is waiting for NA, then drop the initiator.
    let mut armed_at = pair.clock.now();
    while pair.responder.state() != State::ExchangingNonces {
        let now = pair.clock.advance(STEP);
        pair.initiator.tick_at(now);
        if pair.responder.state() == State::AwaitingPeer {
            armed_at = now;
        }
        pair.responder.tick_at(now);
        assert!(now - armed_at < PAIRING_TIMEOUT);
    }

    let reset_at = loop {
        let now = pair.clock.advance(STEP);
        pair.responder.tick_at(now);
        if pair.responder.state() == State::AwaitingPeer {
            break now;
        }
        assert!(now - armed_at <= PAIRING_TIMEOUT);
    };
    let stalled = reset_at - armed_at;
    assert!(stalled > PAIRING_TIMEOUT);
    assert!(stalled <= PAIRING_TIMEOUT + STEP);

    // The responder starts over and listens for QA again
    let restarted = (0..30).any(|_| {
        pair.responder.tick_at(pair.clock.advance(STEP));
        pair.responder.state() == State::ExchangingPublicKeys
    });
    assert!(restarted);
}

#[test]
fn test_responder_polls_at_most_once_per_interval() {
    let mut pair = Pair::seeded(10);
    let mut polls: Vec<(Instant, usize)> = Vec::new();
    let mut last = 0;

    let done = pair.run(Duration::from_secs(2), |p| {
        let count = p.medium.access_count(Role::Responder);
        if count > last {
            polls.push((p.clock.now(), count - last));
            last = count;
        }
    });
    assert!(done);
    assert!(polls.len() >= 4);

    for (_, accesses) in &polls {
        // at most one read and one write per poll
        assert!(*accesses <= 2);
    }
    for w in polls.windows(2) {
        assert!(w[1].0 - w[0].0 >= MIN_POLL_INTERVAL);
    }
}

#[test]
fn test_initiator_ignores_short_pulses() {
    let medium =
        MemoryMedium::new(UID, SimClock::new()).with_access_time(Duration::from_millis(30));
    let mut pair = Pair::on_medium(
        medium,
        RngEntropy::new(StdRng::seed_from_u64(11)),
        RngEntropy::new(StdRng::seed_from_u64(12)),
    );

    assert!(!pair.run(Duration::from_secs(3), |_| {}));
    assert!(pair.medium.access_count(Role::Responder) > 0);
    assert_eq!(pair.medium.access_count(Role::Initiator), 0);
    assert!(pair.medium.written_kinds().is_empty());
    assert_eq!(pair.initiator.state(), State::AwaitingPeer);
}

#[test]
fn test_initiator_acts_only_after_reader_access() {
    let mut pair = Pair::seeded(13);

    for _ in 0..100 {
        let now = pair.clock.advance(STEP);
        pair.initiator.tick_at(now);
    }
    assert!(pair.medium.written_kinds().is_empty());

    // One reader access of the default 100 ms
    pair.medium.reader().read(T).unwrap();
    for _ in 0..11 {
        let now = pair.clock.advance(STEP);
        pair.initiator.tick_at(now);
    }
    assert_eq!(pair.medium.written_kinds(), vec![MessageKind::PublicKeyA]);
    assert_eq!(pair.initiator.state(), State::ExchangingPublicKeys);
}

#[test]
fn test_failed_write_is_retried() {
    let mut pair = Pair::seeded(14);
    pair.medium.fail_next_write(Role::Responder);

    assert!(pair.run(Duration::from_secs(3), |_| {}));
    pair.assert_agreed();
    assert_eq!(pair.medium.written_kinds().len(), 6);
}

#[test]
fn test_recovers_after_tag_leaves_field() {
    let mut pair = Pair::seeded(15);
    let mut removed = false;
    let mut saw_reset = false;

    let done = pair.run(Duration::from_secs(15), |p| {
        if removed && !saw_reset && p.responder.state() == State::AwaitingPeer {
            saw_reset = true;
            p.medium.set_tag_present(true);
        }
        if !removed && p.responder.state() == State::AwaitingConfirmation {
            p.medium.set_tag_present(false);
            removed = true;
        }
    });

    assert!(saw_reset);
    assert!(done);
    pair.assert_agreed();
    assert_eq!(pair.initiator.completed(), 1);
    assert_eq!(pair.responder.completed(), 1);
}
