//! GPIO pin abstractions
//!
//! LEDs and push-button switches are the only port pins the demo programs
//! touch after crossbar setup. Pins from any `embedded-hal` implementation
//! can be wrapped with [`EhOutput`] and [`EhInput`].

/// Digital output pin
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Toggle the pin state
    fn toggle(&mut self) {
        if self.is_set_high() {
            self.set_low();
        } else {
            self.set_high();
        }
    }

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Check if the pin is currently set high
    fn is_set_high(&self) -> bool;

    /// Check if the pin is currently set low
    fn is_set_low(&self) -> bool {
        !self.is_set_high()
    }
}

/// Digital input pin
pub trait InputPin {
    /// Check if the pin reads high (logic 1)
    fn is_high(&self) -> bool;

    /// Check if the pin reads low (logic 0)
    fn is_low(&self) -> bool {
        !self.is_high()
    }
}

/// Adapter from an `embedded-hal` output pin
///
/// The latched level is tracked locally since `embedded_hal::digital::OutputPin`
/// cannot be read back. Pin errors are dropped: port latches on these parts
/// cannot fail.
pub struct EhOutput<P> {
    pin: P,
    high: bool,
}

impl<P: embedded_hal::digital::OutputPin> EhOutput<P> {
    /// Wrap a pin, driving it low
    ///
    /// If that first write fails the adapter reports the pin as high.
    pub fn new(mut pin: P) -> Self {
        // Not known to be low unless the write went through
        let high = pin.set_low().is_err();
        Self { pin, high }
    }

    /// Release the wrapped pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: embedded_hal::digital::OutputPin> OutputPin for EhOutput<P> {
    fn set_high(&mut self) {
        if self.pin.set_high().is_ok() {
            self.high = true;
        }
    }

    fn set_low(&mut self) {
        if self.pin.set_low().is_ok() {
            self.high = false;
        }
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}

/// Adapter from an `embedded-hal` input pin
///
/// `embedded_hal::digital::InputPin` reads through `&mut self`, so the pin
/// sits behind a `RefCell`.
pub struct EhInput<P> {
    pin: core::cell::RefCell<P>,
}

impl<P: embedded_hal::digital::InputPin> EhInput<P> {
    /// Wrap a pin
    pub fn new(pin: P) -> Self {
        Self {
            pin: core::cell::RefCell::new(pin),
        }
    }
}

impl<P: embedded_hal::digital::InputPin> InputPin for EhInput<P> {
    fn is_high(&self) -> bool {
        self.pin.borrow_mut().is_high().unwrap_or(false)
    }
}

/// Pin that can be used for both input and output
pub trait IoPin: OutputPin + InputPin {}

// Blanket implementation for types that implement both traits
impl<T: OutputPin + InputPin> IoPin for T {}
