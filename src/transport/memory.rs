//! In-memory passive tag.
//!
//! [`MemoryMedium`] holds one NDEF image shared by a [`TagEndpoint`]
//! (the initiator, writing over its wired side) and a [`ReaderEndpoint`]
//! (the responder, accessing it over RF). Time comes from a shared
//! [`SimClock`], so tests and demos can step both sessions deterministically.
//!
//! Every reader access keeps the RF field busy for `access_time` from the
//! access instant; that window is what the tag side's pulse detector sees.
//! Tag-side accesses never touch the field.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::trace;

use super::{frame, ndef};
use crate::core::{MAX_FRAME_LEN, NdefError, TagRead, Transport, TransportError};
use crate::handshake::{MessageKind, Role};

/// Manually stepped clock shared by the medium and its drivers.
#[derive(Debug, Clone)]
pub struct SimClock(Rc<Cell<Instant>>);

impl SimClock {
    /// Start at the current instant.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Start at `t0`.
    pub fn starting_at(t0: Instant) -> Self {
        Self(Rc::new(Cell::new(t0)))
    }

    /// Current simulated time.
    pub fn now(&self) -> Instant {
        self.0.get()
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) -> Instant {
        let next = self.0.get() + by;
        self.0.set(next);
        next
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct TagImage {
    uid: Vec<u8>,
    image: Vec<u8>,
    /// Tag within the reader's field.
    tag_present: bool,
    /// Reader field on the tag's antenna.
    reader_present: bool,
    access_time: Duration,
    busy_until: Option<Instant>,
    writes: Vec<(Role, Vec<u8>)>,
    accesses: [usize; 2],
    corrupt_next_read: [bool; 2],
    fail_next_write: [bool; 2],
}

fn slot(role: Role) -> usize {
    match role {
        Role::Initiator => 0,
        Role::Responder => 1,
    }
}

/// Simulated passive tag shared by both roles.
#[derive(Debug, Clone)]
pub struct MemoryMedium {
    inner: Rc<RefCell<TagImage>>,
    clock: SimClock,
}

impl MemoryMedium {
    /// RF busy time of one reader access.
    pub const DEFAULT_ACCESS_TIME: Duration = Duration::from_millis(100);

    /// Create an empty tag with the given UID.
    pub fn new(uid: impl Into<Vec<u8>>, clock: SimClock) -> Self {
        let inner = TagImage {
            uid: uid.into(),
            image: Vec::new(),
            tag_present: true,
            reader_present: true,
            access_time: Self::DEFAULT_ACCESS_TIME,
            busy_until: None,
            writes: Vec::new(),
            accesses: [0; 2],
            corrupt_next_read: [false; 2],
            fail_next_write: [false; 2],
        };
        Self {
            inner: Rc::new(RefCell::new(inner)),
            clock,
        }
    }

    /// Override the RF busy time of one reader access.
    pub fn with_access_time(self, access_time: Duration) -> Self {
        self.inner.borrow_mut().access_time = access_time;
        self
    }

    /// The shared clock.
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Endpoint for the responder session.
    pub fn reader(&self) -> ReaderEndpoint {
        ReaderEndpoint {
            medium: self.clone(),
        }
    }

    /// Endpoint for the initiator session.
    pub fn tag(&self) -> TagEndpoint {
        TagEndpoint {
            medium: self.clone(),
        }
    }

    /// Tag UID.
    pub fn uid(&self) -> Vec<u8> {
        self.inner.borrow().uid.clone()
    }

    /// Raw NDEF image.
    pub fn image(&self) -> Vec<u8> {
        self.inner.borrow().image.clone()
    }

    /// Replace the raw NDEF image without logging a write.
    pub fn set_image(&self, image: impl Into<Vec<u8>>) {
        self.inner.borrow_mut().image = image.into();
    }

    /// Frame currently carried by the first record, if any.
    pub fn current_frame(&self) -> Option<Vec<u8>> {
        let inner = self.inner.borrow();
        ndef::first_record_payload(&inner.image).ok().map(<[u8]>::to_vec)
    }

    /// Overwrite the image with `frame`, as a stray or replayed write would.
    pub fn inject_frame(&self, frame: &[u8]) -> Result<(), NdefError> {
        trace!(len = frame.len(), "injecting frame");
        self.inner.borrow_mut().image = ndef::wrap(frame)?;
        Ok(())
    }

    /// Move the reader field onto or off the tag's antenna.
    pub fn set_reader_present(&self, present: bool) {
        self.inner.borrow_mut().reader_present = present;
    }

    /// Move the tag into or out of the reader's field.
    pub fn set_tag_present(&self, present: bool) {
        self.inner.borrow_mut().tag_present = present;
    }

    /// Flip the checksum of the next frame `role` reads.
    pub fn corrupt_next_read(&self, role: Role) {
        self.inner.borrow_mut().corrupt_next_read[slot(role)] = true;
    }

    /// Whether a requested corruption is still pending for `role`.
    pub fn corruption_pending(&self, role: Role) -> bool {
        self.inner.borrow().corrupt_next_read[slot(role)]
    }

    /// Make the next write by `role` fail with [`TransportError::Busy`].
    pub fn fail_next_write(&self, role: Role) {
        self.inner.borrow_mut().fail_next_write[slot(role)] = true;
    }

    /// Every successful write, in order.
    pub fn written_frames(&self) -> Vec<(Role, Vec<u8>)> {
        self.inner.borrow().writes.clone()
    }

    /// Kinds of every successful write, in order.
    pub fn written_kinds(&self) -> Vec<MessageKind> {
        self.inner
            .borrow()
            .writes
            .iter()
            .filter_map(|(_, bytes)| frame::decode(bytes).ok().map(|m| m.kind))
            .collect()
    }

    /// Reads plus writes attempted by `role`.
    pub fn access_count(&self, role: Role) -> usize {
        self.inner.borrow().accesses[slot(role)]
    }

    /// Whether the RF field is busy at the clock's current time.
    pub fn field_busy(&self) -> bool {
        let now = self.clock.now();
        self.inner
            .borrow()
            .busy_until
            .is_some_and(|until| now < until)
    }

    fn read_as(&self, role: Role) -> Result<Option<TagRead>, TransportError> {
        let now = self.clock.now();
        let mut inner = self.inner.borrow_mut();
        inner.accesses[slot(role)] += 1;
        if role == Role::Responder {
            inner.busy_until = Some(now + inner.access_time);
        }

        if inner.image.is_empty() {
            return Ok(None);
        }
        let mut frame = ndef::first_record_payload(&inner.image)
            .map_err(|e| TransportError::Io(e.to_string()))?
            .to_vec();

        if std::mem::take(&mut inner.corrupt_next_read[slot(role)]) {
            if let Some(last) = frame.last_mut() {
                *last ^= 0xFF;
            }
            trace!(%role, "corrupting read");
        }

        Ok(Some(TagRead {
            identity: inner.uid.clone(),
            frame,
        }))
    }

    fn write_as(&self, role: Role, frame: &[u8]) -> Result<(), TransportError> {
        let now = self.clock.now();
        let mut inner = self.inner.borrow_mut();
        inner.accesses[slot(role)] += 1;
        if role == Role::Responder {
            inner.busy_until = Some(now + inner.access_time);
        }

        if std::mem::take(&mut inner.fail_next_write[slot(role)]) {
            trace!(%role, "failing write");
            return Err(TransportError::Busy);
        }

        if frame.len() > MAX_FRAME_LEN {
            return Err(TransportError::Io(format!(
                "{} byte frame exceeds the {MAX_FRAME_LEN} byte tag buffer",
                frame.len()
            )));
        }
        inner.image = ndef::wrap(frame).map_err(|e| TransportError::Io(e.to_string()))?;
        inner.writes.push((role, frame.to_vec()));
        Ok(())
    }
}

/// Reader side of a [`MemoryMedium`].
#[derive(Debug, Clone)]
pub struct ReaderEndpoint {
    medium: MemoryMedium,
}

impl Transport for ReaderEndpoint {
    fn peer_present(&mut self) -> bool {
        self.medium.inner.borrow().tag_present
    }

    fn read(&mut self, _timeout: Duration) -> Result<Option<TagRead>, TransportError> {
        if !self.medium.inner.borrow().tag_present {
            return Err(TransportError::NotPresent);
        }
        self.medium.read_as(Role::Responder)
    }

    fn write(&mut self, frame: &[u8], _timeout: Duration) -> Result<(), TransportError> {
        if !self.medium.inner.borrow().tag_present {
            return Err(TransportError::NotPresent);
        }
        self.medium.write_as(Role::Responder, frame)
    }
}

/// Tag side of a [`MemoryMedium`].
#[derive(Debug, Clone)]
pub struct TagEndpoint {
    medium: MemoryMedium,
}

impl Transport for TagEndpoint {
    fn peer_present(&mut self) -> bool {
        self.medium.inner.borrow().reader_present
    }

    fn read(&mut self, _timeout: Duration) -> Result<Option<TagRead>, TransportError> {
        self.medium.read_as(Role::Initiator)
    }

    fn write(&mut self, frame: &[u8], _timeout: Duration) -> Result<(), TransportError> {
        self.medium.write_as(Role::Initiator, frame)
    }

    fn field_busy(&mut self) -> bool {
        self.medium.field_busy()
    }

    fn local_identity(&mut self) -> Option<Vec<u8>> {
        Some(self.medium.uid())
    }
}
