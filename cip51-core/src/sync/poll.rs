//! Bounded busy-waiting
//!
//! The vendor examples spin on `while (!FLAG);` forever. Every wait here
//! carries a poll budget and reports a timeout instead of hanging.

/// A bounded wait ran out of polls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WaitTimeout {
    /// Number of polls performed
    pub polls: u32,
}

/// Poll `ready` up to `budget` times, calling `tick` after each miss
///
/// Returns the number of ticks that elapsed before `ready` held.
pub fn poll_until(
    budget: u32,
    mut tick: impl FnMut(),
    mut ready: impl FnMut() -> bool,
) -> Result<u32, WaitTimeout> {
    for polls in 0..budget {
        if ready() {
            return Ok(polls);
        }
        tick();
    }
    if ready() {
        Ok(budget)
    } else {
        Err(WaitTimeout { polls: budget })
    }
}
