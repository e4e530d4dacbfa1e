//! Handshake layer: message catalog, resynchronization table and the
//! per-device session state machine.

mod message;
mod session;
mod state;

pub use message::{Message, MessageKind};
pub use session::AuthenticationSession;
pub use state::{Expectation, Role, State, Verdict};
