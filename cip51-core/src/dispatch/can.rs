//! CAN LED-toggle node
//!
//! Two boards share a bus. Each transmits its switch state on one
//! identifier and drives its LED from frames on the other, so pressing the
//! switch on one board lights the LED on its peer.

use cip51_hal::can::{
    CanController, CanStatus, InterruptSource, MessageObjectConfig, ObjectDirection,
};
use cip51_hal::gpio::{InputPin, OutputPin};
use portable_atomic::{AtomicU32, Ordering};

use crate::config::CanNodeConfig;
use crate::sync::{Mailbox, Shared};

/// Payload that turns the remote LED on
pub const LED_ON: u8 = 0x11;
/// Payload that turns the remote LED off
pub const LED_OFF: u8 = 0x00;

/// What one interrupt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CanOutcome {
    /// `CAN0IID` read zero
    Spurious,
    Status(CanStatus),
    /// Controller was bus-off and has been restarted
    BusOffRestart,
    LedSet(bool),
    /// Receive object carried a payload other than `LED_ON` / `LED_OFF`
    UnknownCommand(u8),
    Transmitted,
    /// Interrupt from an object this node never configured
    UnexpectedObject(u8),
}

/// State shared between the CAN interrupt and the foreground loop
pub struct CanShared {
    /// LED level commanded by the peer
    pub led: Mailbox<bool>,
    pub last_status: Shared<CanStatus>,
    bus_off: AtomicU32,
    errors: AtomicU32,
}

impl CanShared {
    pub const fn new() -> Self {
        Self {
            led: Mailbox::new(),
            last_status: Shared::new(CanStatus(0)),
            bus_off: AtomicU32::new(0),
            errors: AtomicU32::new(0),
        }
    }

    /// Bus-off recoveries since reset
    pub fn bus_off_count(&self) -> u32 {
        self.bus_off.load(Ordering::Relaxed)
    }

    /// Unexpected objects and payloads since reset
    pub fn error_count(&self) -> u32 {
        self.errors.load(Ordering::Relaxed)
    }
}

impl Default for CanShared {
    fn default() -> Self {
        Self::new()
    }
}

/// One node of the LED-toggle pair
pub struct CanLedNode<'a, L, B> {
    config: CanNodeConfig,
    led: L,
    switch: B,
    pressed: bool,
    shared: &'a CanShared,
}

impl<'a, L: OutputPin, B: InputPin> CanLedNode<'a, L, B> {
    pub fn new(config: CanNodeConfig, led: L, switch: B, shared: &'a CanShared) -> Self {
        Self {
            config,
            led,
            switch,
            pressed: false,
            shared,
        }
    }

    pub fn led(&self) -> &L {
        &self.led
    }

    /// Program the transmit and receive message objects
    pub fn init<C: CanController>(&mut self, hw: &mut C) -> Result<(), C::Error> {
        hw.configure_object(
            self.config.tx_object,
            MessageObjectConfig {
                id: self.config.tx_id,
                direction: ObjectDirection::Transmit,
                dlc: 1,
                interrupt: true,
            },
        )?;
        hw.configure_object(
            self.config.rx_object,
            MessageObjectConfig {
                id: self.config.rx_id,
                direction: ObjectDirection::Receive,
                dlc: 1,
                interrupt: true,
            },
        )
    }

    /// Interrupt body: service the source named by `CAN0IID`
    pub fn on_interrupt<C: CanController>(&mut self, hw: &mut C) -> Result<CanOutcome, C::Error> {
        match hw.interrupt_source() {
            InterruptSource::None => Ok(CanOutcome::Spurious),
            InterruptSource::Status => {
                let status = hw.status();
                self.shared.last_status.set(status);
                if status.bus_off() {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("can: bus-off, restarting");
                    hw.restart();
                    self.shared.bus_off.fetch_add(1, Ordering::Relaxed);
                    Ok(CanOutcome::BusOffRestart)
                } else {
                    Ok(CanOutcome::Status(status))
                }
            }
            InterruptSource::Object(object) if object == self.config.rx_object => {
                let mut data = [0u8; 1];
                let len = hw.read_object(object, &mut data);
                hw.clear_pending(object);
                let len = len?;
                let outcome = match data[0] {
                    LED_ON if len > 0 => self.set_led(true),
                    LED_OFF if len > 0 => self.set_led(false),
                    other => {
                        self.shared.errors.fetch_add(1, Ordering::Relaxed);
                        CanOutcome::UnknownCommand(other)
                    }
                };
                Ok(outcome)
            }
            InterruptSource::Object(object) if object == self.config.tx_object => {
                hw.clear_pending(object);
                Ok(CanOutcome::Transmitted)
            }
            InterruptSource::Object(object) => {
                hw.clear_pending(object);
                self.shared.errors.fetch_add(1, Ordering::Relaxed);
                Ok(CanOutcome::UnexpectedObject(object))
            }
        }
    }

    /// Foreground: send the switch state when it changes
    ///
    /// Returns the new state when a frame was queued.
    pub fn poll_switch<C: CanController>(&mut self, hw: &mut C) -> Result<Option<bool>, C::Error> {
        let pressed = self.switch.is_low();
        if pressed == self.pressed {
            return Ok(None);
        }
        let payload = if pressed { LED_ON } else { LED_OFF };
        hw.transmit(self.config.tx_object, &[payload])?;
        self.pressed = pressed;
        Ok(Some(pressed))
    }

    fn set_led(&mut self, on: bool) -> CanOutcome {
        self.led.set_state(on);
        self.shared.led.post(on);
        CanOutcome::LedSet(on)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct FakeLed(bool);

    impl OutputPin for FakeLed {
        fn set_high(&mut self) {
            self.0 = true;
        }
        fn set_low(&mut self) {
            self.0 = false;
        }
        fn is_set_high(&self) -> bool {
            self.0
        }
    }

    struct FakeSwitch<'a>(&'a Cell<bool>);

    impl InputPin for FakeSwitch<'_> {
        fn is_high(&self) -> bool {
            self.0.get()
        }
    }

    #[derive(Default)]
    struct FakeCan {
        iid: u16,
        status: u8,
        rx: u8,
        configured: heapless::Vec<(u8, MessageObjectConfig), 4>,
        sent: heapless::Vec<(u8, u8), 8>,
        cleared: heapless::Vec<u8, 8>,
        restarts: u32,
    }

    impl CanController for FakeCan {
        type Error = ();

        fn interrupt_source(&mut self) -> InterruptSource {
            InterruptSource::from_iid(self.iid)
        }
        fn status(&mut self) -> CanStatus {
            CanStatus(self.status)
        }
        fn configure_object(&mut self, object: u8, config: MessageObjectConfig) -> Result<(), ()> {
            self.configured.push((object, config)).map_err(|_| ())
        }
        fn transmit(&mut self, object: u8, data: &[u8]) -> Result<(), ()> {
            self.sent.push((object, data[0])).map_err(|_| ())
        }
        fn read_object(&mut self, _object: u8, buf: &mut [u8]) -> Result<usize, ()> {
            buf[0] = self.rx;
            Ok(1)
        }
        fn clear_pending(&mut self, object: u8) {
            let _ = self.cleared.push(object);
        }
        fn restart(&mut self) {
            self.restarts += 1;
        }
    }

    #[test]
    fn test_init_configures_both_objects() {
        let shared = CanShared::new();
        let level = Cell::new(true);
        let mut node = CanLedNode::new(
            CanNodeConfig::default(),
            FakeLed(false),
            FakeSwitch(&level),
            &shared,
        );
        let mut hw = FakeCan::default();
        node.init(&mut hw).unwrap();

        assert_eq!(hw.configured.len(), 2);
        assert_eq!(hw.configured[0].0, 1);
        assert_eq!(hw.configured[0].1.id, 0x01);
        assert_eq!(hw.configured[0].1.direction, ObjectDirection::Transmit);
        assert_eq!(hw.configured[1].0, 2);
        assert_eq!(hw.configured[1].1.id, 0x02);
        assert_eq!(hw.configured[1].1.direction, ObjectDirection::Receive);
    }

    #[test]
    fn test_rx_drives_led() {
        let shared = CanShared::new();
        let level = Cell::new(true);
        let mut node = CanLedNode::new(
            CanNodeConfig::default(),
            FakeLed(false),
            FakeSwitch(&level),
            &shared,
        );
        let mut hw = FakeCan {
            iid: 2,
            rx: LED_ON,
            ..FakeCan::default()
        };

        assert_eq!(node.on_interrupt(&mut hw), Ok(CanOutcome::LedSet(true)));
        assert!(node.led().is_set_high());
        assert_eq!(shared.led.take(), Some(true));
        assert_eq!(hw.cleared.as_slice(), &[2]);

        hw.rx = LED_OFF;
        assert_eq!(node.on_interrupt(&mut hw), Ok(CanOutcome::LedSet(false)));
        assert!(node.led().is_set_low());

        hw.rx = 0x42;
        assert_eq!(node.on_interrupt(&mut hw), Ok(CanOutcome::UnknownCommand(0x42)));
        assert!(node.led().is_set_low());
        assert_eq!(shared.error_count(), 1);
    }

    #[test]
    fn test_bus_off_restarts() {
        let shared = CanShared::new();
        let level = Cell::new(true);
        let mut node = CanLedNode::new(
            CanNodeConfig::default(),
            FakeLed(false),
            FakeSwitch(&level),
            &shared,
        );
        let mut hw = FakeCan {
            iid: 0x8000,
            status: 0x80,
            ..FakeCan::default()
        };

        assert_eq!(node.on_interrupt(&mut hw), Ok(CanOutcome::BusOffRestart));
        assert_eq!(hw.restarts, 1);
        assert_eq!(shared.bus_off_count(), 1);

        hw.status = 0x08;
        assert_eq!(
            node.on_interrupt(&mut hw),
            Ok(CanOutcome::Status(CanStatus(0x08)))
        );
        assert_eq!(hw.restarts, 1);
    }

    #[test]
    fn test_switch_edges_transmit() {
        let shared = CanShared::new();
        let level = Cell::new(true);
        let mut node = CanLedNode::new(
            CanNodeConfig::default(),
            FakeLed(false),
            FakeSwitch(&level),
            &shared,
        );
        let mut hw = FakeCan::default();

        assert_eq!(node.poll_switch(&mut hw), Ok(None));
        level.set(false);
        assert_eq!(node.poll_switch(&mut hw), Ok(Some(true)));
        assert_eq!(node.poll_switch(&mut hw), Ok(None));
        level.set(true);
        assert_eq!(node.poll_switch(&mut hw), Ok(Some(false)));
        assert_eq!(hw.sent.as_slice(), &[(1, LED_ON), (1, LED_OFF)]);
    }

    #[test]
    fn test_tx_and_unexpected_objects() {
        let shared = CanShared::new();
        let level = Cell::new(true);
        let mut node = CanLedNode::new(
            CanNodeConfig::default(),
            FakeLed(false),
            FakeSwitch(&level),
            &shared,
        );
        let mut hw = FakeCan {
            iid: 1,
            ..FakeCan::default()
        };
        assert_eq!(node.on_interrupt(&mut hw), Ok(CanOutcome::Transmitted));

        hw.iid = 7;
        assert_eq!(node.on_interrupt(&mut hw), Ok(CanOutcome::UnexpectedObject(7)));
        assert_eq!(hw.cleared.as_slice(), &[1, 7]);

        hw.iid = 0;
        assert_eq!(node.on_interrupt(&mut hw), Ok(CanOutcome::Spurious));
    }
}
