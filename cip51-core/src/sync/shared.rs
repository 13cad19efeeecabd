//! Critical-section guarded cell
//!
//! Stands in for the `EA = 0; ...; EA = 1;` bracket around multi-byte reads
//! of ISR-owned variables. The closure form releases the section on every
//! exit path, including early returns inside the closure.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// A value shared between interrupt and foreground context
///
/// Nested `lock` calls on the same cell panic (the `RefCell` is already
/// borrowed); the handlers in this crate never nest.
pub struct Shared<T> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<T>>,
}

impl<T> Shared<T> {
    /// Create a new shared cell
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Run `f` with exclusive access inside a critical section
    pub fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Replace the value
    pub fn set(&self, value: T) {
        self.lock(|slot| *slot = value);
    }

    /// Consume the cell
    pub fn into_inner(self) -> T {
        self.inner.into_inner().into_inner()
    }
}

impl<T: Copy> Shared<T> {
    /// Copy the value out atomically with respect to interrupts
    pub fn get(&self) -> T {
        self.lock(|value| *value)
    }
}

impl<T: Default> Default for Shared<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let cell = Shared::new(0u32);
        cell.set(0x1234_5678);
        assert_eq!(cell.get(), 0x1234_5678);
    }

    #[test]
    fn test_lock_returns_value() {
        let cell = Shared::new([0u8; 4]);
        let sum = cell.lock(|bytes| {
            bytes[1] = 3;
            bytes[2] = 4;
            bytes.iter().map(|&b| b as u32).sum::<u32>()
        });
        assert_eq!(sum, 7);
        assert_eq!(cell.into_inner(), [0, 3, 4, 0]);
    }

    #[test]
    fn test_released_after_early_return() {
        let cell = Shared::new(5u8);
        let early = cell.lock(|value| {
            if *value == 5 {
                return true;
            }
            *value = 0;
            false
        });
        assert!(early);
        // A second lock would panic if the first had not been released
        assert_eq!(cell.get(), 5);
    }
}
