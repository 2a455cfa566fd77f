mod machine;
mod runner;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use machine::{SessionEffect, SessionEvent, SessionMachine, SessionState, TimerToken};
pub use runner::{SessionCommand, SessionHandle, SessionNotice, SessionRunner};
