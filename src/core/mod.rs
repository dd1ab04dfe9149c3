//! Core types shared across the crate
//!
//! - `SessionPhase` - State machine of a session
//! - `SessionError` - Error types

pub mod error;
pub mod state;

pub use error::{SessionError, SessionResult};
pub use state::SessionPhase;
