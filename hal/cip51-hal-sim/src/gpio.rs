//! Shared-handle port pins
//!
//! Cloning a [`SimPin`] yields a second handle on the same level, so a
//! test can keep one end while a dispatcher owns the other: the test
//! presses a switch or inspects an LED through its clone.

use std::cell::Cell;
use std::rc::Rc;

use cip51_hal::gpio::{InputPin, OutputPin};

/// A port pin usable as LED output or switch input
#[derive(Debug, Clone, Default)]
pub struct SimPin {
    level: Rc<Cell<bool>>,
}

impl SimPin {
    pub fn new(high: bool) -> Self {
        Self {
            level: Rc::new(Cell::new(high)),
        }
    }

    /// Drive the pin from outside (a switch being pressed or released)
    pub fn drive(&self, high: bool) {
        self.level.set(high);
    }

    /// Current level
    pub fn level(&self) -> bool {
        self.level.get()
    }
}

impl OutputPin for SimPin {
    fn set_high(&mut self) {
        self.level.set(true);
    }

    fn set_low(&mut self) {
        self.level.set(false);
    }

    fn is_set_high(&self) -> bool {
        self.level.get()
    }
}

impl InputPin for SimPin {
    fn is_high(&self) -> bool {
        self.level.get()
    }
}
