//! Core types, constants and collaborator traits.

mod config;
pub mod constants;
mod error;
mod traits;

pub use config::SessionConfig;
pub use constants::*;
pub use error::*;
pub use traits::*;
