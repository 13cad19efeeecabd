//! Single-slot ISR-to-foreground mailbox
//!
//! Replaces the `DATA_READY` flag + holder byte pair. Posting overwrites an
//! unconsumed value, matching the one-byte holder it replaces.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicBool, Ordering};

use super::poll::{poll_until, WaitTimeout};

/// One-element SPSC channel between an interrupt handler and the main loop
pub struct Mailbox<T> {
    signal: Signal<CriticalSectionRawMutex, T>,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Mailbox<T> {
    /// Create an empty mailbox
    pub const fn new() -> Self {
        Self {
            signal: Signal::new(),
        }
    }

    /// Publish a value (ISR side), replacing any unconsumed one
    pub fn post(&self, value: T) {
        self.signal.signal(value);
    }

    /// Consume the value if one is waiting
    pub fn take(&self) -> Option<T> {
        self.signal.try_take()
    }

    /// Whether a value is waiting
    pub fn is_ready(&self) -> bool {
        self.signal.signaled()
    }

    /// Drop any waiting value
    pub fn clear(&self) {
        self.signal.reset();
    }

    /// Wait for a value from an async context
    pub async fn wait(&self) -> T {
        self.signal.wait().await
    }

    /// Busy-wait for a value, calling `tick` between polls
    ///
    /// `tick` stands in for time passing: on hardware it is a no-op while
    /// interrupts fire; against a simulated peripheral it advances the model.
    pub fn poll_take(&self, budget: u32, mut tick: impl FnMut()) -> Result<T, WaitTimeout> {
        let mut value = None;
        poll_until(budget, &mut tick, || {
            value = self.take();
            value.is_some()
        })?;
        value.ok_or(WaitTimeout { polls: budget })
    }
}

/// Set-once, test-and-clear flag for events without a payload
pub struct ReadyFlag {
    flag: AtomicBool,
}

impl Default for ReadyFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadyFlag {
    pub const fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    /// Raise the flag (ISR side)
    pub fn set(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether the flag is raised
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Lower the flag, returning whether it was raised
    pub fn take(&self) -> bool {
        self.flag.swap(false, Ordering::AcqRel)
    }
}
