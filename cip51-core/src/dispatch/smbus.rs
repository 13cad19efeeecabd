//! SMBus slave dispatcher
//!
//! Implements the one-byte echo slave: a master write stores the byte in
//! the holder and posts it to the foreground; a master read returns the
//! holder. Both status layouts go through the same event match.

use cip51_hal::smbus::{Direction, SmbusEvent, SmbusSlave};
use portable_atomic::{AtomicU32, Ordering};

use crate::config::SmbusSlaveConfig;
use crate::sync::{Mailbox, Shared};

/// Slave protocol state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SmbusState {
    /// No transfer addressed to us
    Idle,
    /// Our address was acknowledged
    AddressMatched(Direction),
    /// At least one data byte has moved
    DataPhase(Direction),
    /// Last interrupt carried an undocumented status; the peripheral was reset
    Error,
}

/// What one interrupt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SmbusOutcome {
    AddressAccepted(Direction),
    /// Address byte for another slave, or a general call
    AddressRejected,
    ByteReceived(u8),
    /// Holder loaded into the data register for the master to read
    ByteLoaded(u8),
    /// Master NACKed the last byte it read
    TransmitDone,
    Stopped,
    ArbitrationLost,
    /// Undocumented status code; peripheral was reset
    ProtocolError(u8),
}

/// State shared between the SMBus interrupt and the foreground loop
pub struct SmbusShared {
    /// Last byte written by the master, returned on reads
    pub holder: Shared<u8>,
    /// Each received byte, for the foreground
    pub received: Mailbox<u8>,
    errors: AtomicU32,
}

impl SmbusShared {
    pub const fn new() -> Self {
        Self {
            holder: Shared::new(0),
            received: Mailbox::new(),
            errors: AtomicU32::new(0),
        }
    }

    /// Protocol errors seen since reset
    pub fn error_count(&self) -> u32 {
        self.errors.load(Ordering::Relaxed)
    }
}

impl Default for SmbusShared {
    fn default() -> Self {
        Self::new()
    }
}

/// Interrupt-side state machine for the SMBus slave
pub struct SmbusSlaveDispatcher<'a> {
    config: SmbusSlaveConfig,
    state: SmbusState,
    shared: &'a SmbusShared,
}

impl<'a> SmbusSlaveDispatcher<'a> {
    pub fn new(config: SmbusSlaveConfig, shared: &'a SmbusShared) -> Self {
        Self {
            config,
            state: SmbusState::Idle,
            shared,
        }
    }

    pub fn state(&self) -> SmbusState {
        self.state
    }

    /// Interrupt body: handle the pending status and clear `SI`
    pub fn on_interrupt<S: SmbusSlave>(&mut self, hw: &mut S) -> SmbusOutcome {
        let outcome = if hw.arbitration_lost() {
            hw.clear_start();
            hw.clear_stop();
            hw.ack(false);
            self.state = SmbusState::Idle;
            SmbusOutcome::ArbitrationLost
        } else {
            let status = hw.read_status();
            let ack = hw.ack_received();
            let event = hw.layout().decode(status, ack);
            self.handle(hw, event)
        };
        hw.clear_interrupt();
        outcome
    }

    fn handle<S: SmbusSlave>(&mut self, hw: &mut S, event: SmbusEvent) -> SmbusOutcome {
        match event {
            SmbusEvent::AddressByte => {
                hw.clear_start();
                let address = hw.read_data();
                if !self.config.matches(address) {
                    hw.ack(false);
                    self.state = SmbusState::Idle;
                    return SmbusOutcome::AddressRejected;
                }
                hw.ack(true);
                let direction = Direction::from_address_byte(address);
                self.accept(hw, direction)
            }
            SmbusEvent::OwnAddress(direction) => {
                hw.clear_start();
                hw.ack(true);
                self.accept(hw, direction)
            }
            SmbusEvent::GeneralCall => {
                hw.ack(false);
                self.state = SmbusState::Idle;
                SmbusOutcome::AddressRejected
            }
            SmbusEvent::DataReceived => {
                let byte = hw.read_data();
                self.shared.holder.set(byte);
                self.shared.received.post(byte);
                hw.ack(true);
                self.state = SmbusState::DataPhase(Direction::Write);
                SmbusOutcome::ByteReceived(byte)
            }
            SmbusEvent::DataTransmitted { acked: true } => {
                self.state = SmbusState::DataPhase(Direction::Read);
                self.load_holder(hw)
            }
            SmbusEvent::DataTransmitted { acked: false } => {
                self.state = SmbusState::DataPhase(Direction::Read);
                SmbusOutcome::TransmitDone
            }
            SmbusEvent::Stop => {
                hw.clear_stop();
                self.state = SmbusState::Idle;
                SmbusOutcome::Stopped
            }
            SmbusEvent::Unknown(code) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("smbus: undocumented status {=u8:#x}, resetting", code);
                hw.reset();
                hw.clear_start();
                hw.clear_stop();
                hw.ack(false);
                self.shared.errors.fetch_add(1, Ordering::Relaxed);
                self.state = SmbusState::Error;
                SmbusOutcome::ProtocolError(code)
            }
        }
    }

    fn accept<S: SmbusSlave>(&mut self, hw: &mut S, direction: Direction) -> SmbusOutcome {
        self.state = SmbusState::AddressMatched(direction);
        match direction {
            Direction::Read => self.load_holder(hw),
            Direction::Write => SmbusOutcome::AddressAccepted(direction),
        }
    }

    fn load_holder<S: SmbusSlave>(&mut self, hw: &mut S) -> SmbusOutcome {
        let byte = self.shared.holder.get();
        hw.write_data(byte);
        SmbusOutcome::ByteLoaded(byte)
    }
}
