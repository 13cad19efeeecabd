//! Status-vector dispatchers
//!
//! One enum state machine per protocol, generic over the capability trait
//! from `cip51-hal`. Every `on_interrupt` reads the hardware status once,
//! performs the action for that status, and clears the pending flag last.
//! Data crosses into the foreground through [`crate::sync`] primitives
//! held in a `*Shared` struct the caller places in a `static`.

pub mod can;
pub mod lin;
pub mod smbus;
pub mod spi;

pub use can::{CanLedNode, CanOutcome, CanShared};
pub use lin::{LinOutcome, LinShared, LinSlaveDispatcher};
pub use smbus::{SmbusOutcome, SmbusShared, SmbusSlaveDispatcher, SmbusState};
pub use spi::{SpiOutcome, SpiShared, SpiSlaveDispatcher, SpiState, SpiUpdate};
