//! NFC Pairing Loopback
//!
//! Runs an initiator and a responder against one in-memory tag image on a
//! simulated clock, then prints the master key both sides agreed on.
//!
//! Environment variables:
//! - NFC_PAIRING_LOG_LEVEL: trace|debug|info|warn|error (default info, `RUST_LOG` wins)
//! - NFC_PAIRING_TIMEOUT_MS: pairing watchdog (default 5000)
//! - NFC_PAIRING_POLL_MS: responder poll interval (default 150)
//! - NFC_PAIRING_PULSE_MS: initiator pulse threshold (default 50)
//! - NFC_PAIRING_ACCESS_MS: simulated RF time per reader access (default 100)
//! - NFC_PAIRING_UID: tag UID as hex (default 04a23b915c1280)

use std::env;
use std::process::ExitCode;
use std::time::Duration;

use nfc_pairing::prelude::*;
use nfc_pairing::transport::memory::{MemoryMedium, SimClock};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Simulated time per loop iteration.
const STEP: Duration = Duration::from_millis(10);

const DEFAULT_UID: [u8; 7] = [0x04, 0xA2, 0x3B, 0x91, 0x5C, 0x12, 0x80];

#[derive(Debug, Error)]
enum DemoError {
    #[error("invalid {name}: {value:?}")]
    BadEnv { name: &'static str, value: String },

    #[error(transparent)]
    Pairing(#[from] PairingError),

    #[error("no handshake within {0:?} of simulated time")]
    Stalled(Duration),

    #[error("master keys differ")]
    KeyMismatch,
}

fn env_ms(name: &'static str, default: Duration) -> Result<Duration, DemoError> {
    match env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| DemoError::BadEnv { name, value }),
        Err(_) => Ok(default),
    }
}

fn env_uid() -> Result<Vec<u8>, DemoError> {
    const NAME: &str = "NFC_PAIRING_UID";
    match env::var(NAME) {
        Ok(value) => match hex::decode(&value) {
            Ok(uid) if !uid.is_empty() => Ok(uid),
            _ => Err(DemoError::BadEnv { name: NAME, value }),
        },
        Err(_) => Ok(DEFAULT_UID.to_vec()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(env::var("NFC_PAIRING_LOG_LEVEL").unwrap_or_else(|_| "info".into()))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run() -> Result<(), DemoError> {
    let defaults = SessionConfig::default();
    let config = SessionConfig::default()
        .with_pairing_timeout(env_ms("NFC_PAIRING_TIMEOUT_MS", defaults.pairing_timeout)?)
        .with_min_poll_interval(env_ms("NFC_PAIRING_POLL_MS", defaults.min_poll_interval)?)
        .with_min_pulse_duration(env_ms("NFC_PAIRING_PULSE_MS", defaults.min_pulse_duration)?);
    config.validate().map_err(PairingError::from)?;

    let access_time = env_ms("NFC_PAIRING_ACCESS_MS", MemoryMedium::DEFAULT_ACCESS_TIME)?;
    let clock = SimClock::new();
    let medium = MemoryMedium::new(env_uid()?, clock.clone()).with_access_time(access_time);
    info!(
        uid = %hex::encode(medium.uid()),
        access_ms = access_time.as_millis() as u64,
        "tag ready"
    );

    let mut initiator =
        AuthenticationSession::initiator(NfcSecBackend::new(), medium.tag(), OsEntropy, config);
    let mut responder =
        AuthenticationSession::responder(NfcSecBackend::new(), medium.reader(), OsEntropy, config);
    let t0 = clock.now();
    initiator.begin_at(t0)?;
    responder.begin_at(t0)?;

    let limit = config.pairing_timeout * 4;
    let (mut initiator_done, mut responder_done) = (false, false);
    while !(initiator_done && responder_done) {
        if clock.now() - t0 > limit {
            return Err(DemoError::Stalled(limit));
        }
        let now = clock.advance(STEP);
        initiator_done |= initiator.tick_at(now);
        responder_done |= responder.tick_at(now);
    }

    let key = initiator.backend().master_key();
    if key.is_none() || key != responder.backend().master_key() {
        return Err(DemoError::KeyMismatch);
    }

    let elapsed = clock.now() - t0;
    let kinds: Vec<String> = medium.written_kinds().iter().map(|k| k.to_string()).collect();
    info!(
        elapsed_ms = elapsed.as_millis() as u64,
        messages = %kinds.join(" "),
        "paired"
    );
    if let Some(key) = key {
        println!("{}", hex::encode(key));
    }
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "loopback failed");
            ExitCode::FAILURE
        }
    }
}
