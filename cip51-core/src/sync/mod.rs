//! ISR / foreground plumbing
//!
//! Interrupt handlers are the only producers; the main loop is the only
//! consumer. Every value crossing that boundary goes through one of these
//! types instead of a bare global.

pub mod mailbox;
pub mod poll;
pub mod shared;

pub use mailbox::{Mailbox, ReadyFlag};
pub use poll::{poll_until, WaitTimeout};
pub use shared::Shared;
