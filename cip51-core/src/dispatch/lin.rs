//! LIN slave frame dispatcher
//!
//! The slave answers two frame identifiers: one publishes the switch
//! state, the other carries an LED command from the master. Every other
//! identifier is dropped with `STOP` so the controller ignores the rest of
//! the frame.

use cip51_hal::gpio::{InputPin, OutputPin};
use cip51_hal::lin::{LinErrors, LinSlave, ResponseDirection};
use portable_atomic::{AtomicU32, Ordering};

use crate::config::LinSlaveConfig;
use crate::sync::{Mailbox, Shared};

/// Switch response when the (active-low) switch is pressed
pub const SWITCH_PRESSED: u8 = 0x01;
/// Switch response when released
pub const SWITCH_RELEASED: u8 = 0x00;

/// What one interrupt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinOutcome {
    /// Switch response released for the master
    Responding(u8),
    /// Armed to receive the LED command
    Receiving,
    /// Identifier not handled by this node
    Ignored(u8),
    /// LED command received and applied
    LedSet(bool),
    /// Our switch response went out
    ResponseSent,
    Error(LinErrors),
    Wakeup,
    Aborted,
    /// Status with none of the handled bits set; controller was reset
    Unknown(u8),
}

/// State shared between the LIN interrupt and the foreground loop
pub struct LinShared {
    /// LED level commanded by the master
    pub led: Mailbox<bool>,
    /// Most recent `LIN0ERR` snapshot
    pub last_error: Shared<LinErrors>,
    errors: AtomicU32,
}

impl LinShared {
    pub const fn new() -> Self {
        Self {
            led: Mailbox::new(),
            last_error: Shared::new(LinErrors(0)),
            errors: AtomicU32::new(0),
        }
    }

    pub fn error_count(&self) -> u32 {
        self.errors.load(Ordering::Relaxed)
    }
}

impl Default for LinShared {
    fn default() -> Self {
        Self::new()
    }
}

/// Interrupt-side dispatcher for the LIN slave node
pub struct LinSlaveDispatcher<'a, L, B> {
    config: LinSlaveConfig,
    /// Identifier of the frame whose response is in flight
    pending: Option<u8>,
    led: L,
    switch: B,
    shared: &'a LinShared,
}

impl<'a, L: OutputPin, B: InputPin> LinSlaveDispatcher<'a, L, B> {
    pub fn new(config: LinSlaveConfig, led: L, switch: B, shared: &'a LinShared) -> Self {
        Self {
            config,
            pending: None,
            led,
            switch,
            shared,
        }
    }

    pub fn led(&self) -> &L {
        &self.led
    }

    /// Interrupt body: handle `LIN0ST` and clear the interrupt and error latch
    pub fn on_interrupt<S: LinSlave>(&mut self, hw: &mut S) -> LinOutcome {
        let status = hw.read_status();
        let outcome = if status.error() {
            let errors = hw.read_errors();
            #[cfg(feature = "defmt")]
            defmt::warn!("lin: error {=u8:#x}", errors.0);
            self.shared.last_error.set(errors);
            self.shared.errors.fetch_add(1, Ordering::Relaxed);
            self.pending = None;
            LinOutcome::Error(errors)
        } else if status.data_request() {
            let id = hw.read_id();
            self.request(hw, id)
        } else if status.done() {
            self.complete(hw)
        } else if status.wakeup() {
            LinOutcome::Wakeup
        } else if status.aborted() || status.idle_timeout() {
            self.pending = None;
            LinOutcome::Aborted
        } else {
            #[cfg(feature = "defmt")]
            defmt::warn!("lin: unexpected status {=u8:#x}, resetting", status.0);
            hw.reset();
            self.shared.errors.fetch_add(1, Ordering::Relaxed);
            self.pending = None;
            LinOutcome::Unknown(status.0)
        };
        hw.clear_interrupt();
        outcome
    }

    fn request<S: LinSlave>(&mut self, hw: &mut S, id: u8) -> LinOutcome {
        if id == self.config.switch_id {
            let state = if self.switch.is_low() {
                SWITCH_PRESSED
            } else {
                SWITCH_RELEASED
            };
            hw.set_response(ResponseDirection::Transmit, 1, self.config.checksum);
            hw.write_data(0, state);
            hw.ack_data_request();
            self.pending = Some(id);
            LinOutcome::Responding(state)
        } else if id == self.config.led_id {
            hw.set_response(ResponseDirection::Receive, 1, self.config.checksum);
            hw.ack_data_request();
            self.pending = Some(id);
            LinOutcome::Receiving
        } else {
            hw.stop_rx();
            self.pending = None;
            LinOutcome::Ignored(id)
        }
    }

    fn complete<S: LinSlave>(&mut self, hw: &mut S) -> LinOutcome {
        match self.pending.take() {
            Some(id) if id == self.config.led_id => {
                let on = hw.read_data(0) != 0;
                self.led.set_state(on);
                self.shared.led.post(on);
                LinOutcome::LedSet(on)
            }
            _ => LinOutcome::ResponseSent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cip51_hal::lin::{error_bits, status_bits, ChecksumKind, LinStatus};

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

    struct FakeSwitch(bool);

    impl InputPin for FakeSwitch {
        fn is_high(&self) -> bool {
            self.0
        }
    }

    #[derive(Default)]
    struct FakeLin {
        status: u8,
        id: u8,
        errors: u8,
        data: [u8; 8],
        response: Option<(ResponseDirection, u8, ChecksumKind)>,
        acked: u32,
        stopped: u32,
        cleared: u32,
        resets: u32,
    }

    impl FakeLin {
        fn raise(&mut self, status: u8) {
            self.status = status;
            self.cleared = 0;
        }
    }

    impl LinSlave for FakeLin {
        fn read_status(&mut self) -> LinStatus {
            LinStatus(self.status)
        }
        fn read_id(&mut self) -> u8 {
            self.id
        }
        fn read_errors(&mut self) -> LinErrors {
            LinErrors(self.errors)
        }
        fn set_response(&mut self, direction: ResponseDirection, len: u8, checksum: ChecksumKind) {
            self.response = Some((direction, len, checksum));
        }
        fn write_data(&mut self, index: usize, byte: u8) {
            self.data[index] = byte;
        }
        fn read_data(&mut self, index: usize) -> u8 {
            self.data[index]
        }
        fn ack_data_request(&mut self) {
            self.acked += 1;
        }
        fn stop_rx(&mut self) {
            self.stopped += 1;
        }
        fn clear_interrupt(&mut self) {
            self.cleared += 1;
        }
        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    fn node(shared: &LinShared, switch_high: bool) -> LinSlaveDispatcher<'_, FakeLed, FakeSwitch> {
        LinSlaveDispatcher::new(
            LinSlaveConfig::default(),
            FakeLed(false),
            FakeSwitch(switch_high),
            shared,
        )
    }

    #[test]
    fn test_switch_query_pressed() {
        let shared = LinShared::new();
        let mut dispatcher = node(&shared, false);
        let mut hw = FakeLin {
            id: 0x10,
            ..FakeLin::default()
        };

        hw.raise(status_bits::DTREQ | status_bits::INTREQ);
        assert_eq!(dispatcher.on_interrupt(&mut hw), LinOutcome::Responding(SWITCH_PRESSED));
        assert_eq!(
            hw.response,
            Some((ResponseDirection::Transmit, 1, ChecksumKind::Enhanced))
        );
        assert_eq!(hw.data[0], SWITCH_PRESSED);
        assert_eq!(hw.acked, 1);
        assert_eq!(hw.cleared, 1);

        hw.raise(status_bits::DONE);
        assert_eq!(dispatcher.on_interrupt(&mut hw), LinOutcome::ResponseSent);
        assert_eq!(hw.cleared, 1);
    }

    #[test]
    fn test_led_command() {
        let shared = LinShared::new();
        let mut dispatcher = node(&shared, true);
        let mut hw = FakeLin {
            id: 0x11,
            ..FakeLin::default()
        };

        hw.raise(status_bits::DTREQ);
        assert_eq!(dispatcher.on_interrupt(&mut hw), LinOutcome::Receiving);
        assert_eq!(hw.response.map(|r| r.0), Some(ResponseDirection::Receive));

        hw.data[0] = 0x01;
        hw.raise(status_bits::DONE);
        assert_eq!(dispatcher.on_interrupt(&mut hw), LinOutcome::LedSet(true));
        assert!(dispatcher.led().is_set_high());
        assert_eq!(shared.led.take(), Some(true));
    }

    #[test]
    fn test_foreign_id_stopped() {
        let shared = LinShared::new();
        let mut dispatcher = node(&shared, true);
        let mut hw = FakeLin {
            id: 0x22,
            ..FakeLin::default()
        };

        hw.raise(status_bits::DTREQ);
        assert_eq!(dispatcher.on_interrupt(&mut hw), LinOutcome::Ignored(0x22));
        assert_eq!(hw.stopped, 1);
        assert_eq!(hw.acked, 0);
        assert_eq!(hw.response, None);
        assert_eq!(hw.cleared, 1);
    }

    #[test]
    fn test_error_recorded() {
        let shared = LinShared::new();
        let mut dispatcher = node(&shared, true);
        let mut hw = FakeLin {
            errors: error_bits::CHKERR,
            ..FakeLin::default()
        };

        hw.raise(status_bits::ERROR);
        let outcome = dispatcher.on_interrupt(&mut hw);
        assert_eq!(outcome, LinOutcome::Error(LinErrors(error_bits::CHKERR)));
        assert!(shared.last_error.get().checksum());
        assert_eq!(shared.error_count(), 1);
        assert_eq!(hw.cleared, 1);
    }

    #[test]
    fn test_done_after_error_does_not_drive_led() {
        let shared = LinShared::new();
        let mut dispatcher = node(&shared, true);
        let mut hw = FakeLin {
            id: 0x11,
            ..FakeLin::default()
        };

        hw.raise(status_bits::DTREQ);
        dispatcher.on_interrupt(&mut hw);
        hw.raise(status_bits::ERROR);
        dispatcher.on_interrupt(&mut hw);
        hw.data[0] = 1;
        hw.raise(status_bits::DONE);
        assert_eq!(dispatcher.on_interrupt(&mut hw), LinOutcome::ResponseSent);
        assert!(dispatcher.led().is_set_low());
    }

    #[test]
    fn test_unknown_status_counted() {
        let shared = LinShared::new();
        let mut dispatcher = node(&shared, true);
        let mut hw = FakeLin::default();

        hw.raise(status_bits::ACTIVE);
        assert_eq!(
            dispatcher.on_interrupt(&mut hw),
            LinOutcome::Unknown(status_bits::ACTIVE)
        );
        assert_eq!(shared.error_count(), 1);
        assert_eq!(hw.resets, 1);
        assert_eq!(hw.cleared, 1);
    }

    #[test]
    fn test_unknown_status_drops_pending_response() {
        let shared = LinShared::new();
        let mut dispatcher = node(&shared, true);
        let mut hw = FakeLin {
            id: 0x11,
            ..FakeLin::default()
        };

        hw.raise(status_bits::DTREQ);
        dispatcher.on_interrupt(&mut hw);
        hw.raise(status_bits::ACTIVE | status_bits::INTREQ);
        assert_eq!(
            dispatcher.on_interrupt(&mut hw),
            LinOutcome::Unknown(status_bits::ACTIVE | status_bits::INTREQ)
        );
        assert_eq!(hw.resets, 1);

        hw.data[0] = 1;
        hw.raise(status_bits::DONE);
        assert_eq!(dispatcher.on_interrupt(&mut hw), LinOutcome::ResponseSent);
        assert!(dispatcher.led().is_set_low());
    }

    #[test]
    fn test_wakeup_reported() {
        let shared = LinShared::new();
        let mut dispatcher = node(&shared, true);
        let mut hw = FakeLin::default();

        hw.raise(status_bits::WAKEUP | status_bits::INTREQ);
        assert_eq!(dispatcher.on_interrupt(&mut hw), LinOutcome::Wakeup);
        assert_eq!(shared.error_count(), 0);
        assert_eq!(hw.resets, 0);
        assert_eq!(hw.cleared, 1);
    }

    #[test]
    fn test_abort_and_idle_timeout_drop_frame() {
        let shared = LinShared::new();
        let mut dispatcher = node(&shared, true);

        for bits in [status_bits::ABORT, status_bits::IDLTOUT] {
            let mut hw = FakeLin {
                id: 0x11,
                ..FakeLin::default()
            };
            hw.raise(status_bits::DTREQ);
            assert_eq!(dispatcher.on_interrupt(&mut hw), LinOutcome::Receiving);

            hw.raise(bits | status_bits::INTREQ);
            assert_eq!(dispatcher.on_interrupt(&mut hw), LinOutcome::Aborted);
            assert_eq!(hw.cleared, 1);
            assert_eq!(hw.resets, 0);

            // A late DONE no longer belongs to the LED frame
            hw.data[0] = 1;
            hw.raise(status_bits::DONE);
            assert_eq!(dispatcher.on_interrupt(&mut hw), LinOutcome::ResponseSent);
            assert!(dispatcher.led().is_set_low());
        }
        assert_eq!(shared.error_count(), 0);
    }
}
