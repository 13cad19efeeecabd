//! SPI slave command dispatcher
//!
//! The master sends a one-byte opcode, optionally followed by data bytes or
//! by dummy bytes that clock out the slave's reply. Bytes loaded into the
//! data register during one interrupt are shifted out on the next transfer.

use cip51_hal::gpio::OutputPin;
use cip51_hal::spi::SpiSlave;
use portable_atomic::{AtomicU32, Ordering};

use crate::config::SpiSlaveConfig;
use crate::sync::{Mailbox, Shared};

/// Command opcodes
pub mod command {
    pub const LED_ON: u8 = 0x01;
    pub const LED_OFF: u8 = 0x02;
    /// Followed by one data byte
    pub const WRITE: u8 = 0x04;
    /// Followed by one dummy byte that clocks out the data byte
    pub const READ: u8 = 0x08;
    /// Followed by `buffer_len` data bytes
    pub const WRITE_BUFFER: u8 = 0x10;
    /// Followed by `buffer_len` dummy bytes
    pub const READ_BUFFER: u8 = 0x20;
    /// Loaded for the master to read when the slave saw an error
    pub const ERROR_OCCURRED: u8 = 0x40;
}

/// Command processing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiState {
    AwaitCommand,
    /// `WRITE` received; next byte is the data
    AwaitData,
    /// Next received byte goes to this buffer index
    WritingBuffer(usize),
    /// Next interrupt loads this buffer index
    ReadingBuffer(usize),
    /// `READ` reply loaded; next byte is the dummy that clocks it out
    SendingByte,
}

/// What one interrupt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiOutcome {
    Led(bool),
    AwaitingData,
    DataStored(u8),
    /// Byte placed in the data register for the master
    Loaded(u8),
    BufferByte(usize),
    BufferComplete,
    /// Dummy byte consumed at the end of a read
    ReadComplete,
    /// Opcode outside the command set
    Ignored(u8),
    /// Write collision or receive overrun
    Error,
}

/// Foreground notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiUpdate {
    Led(bool),
    Data(u8),
    /// The whole buffer was rewritten
    Buffer,
}

/// State shared between the SPI interrupt and the foreground loop
pub struct SpiShared<const N: usize> {
    /// Single byte moved by `WRITE` / `READ`
    pub data: Shared<u8>,
    /// Buffer moved by `WRITE_BUFFER` / `READ_BUFFER`
    pub buffer: Shared<[u8; N]>,
    pub updates: Mailbox<SpiUpdate>,
    errors: AtomicU32,
}

impl<const N: usize> SpiShared<N> {
    pub const fn new() -> Self {
        Self {
            data: Shared::new(0),
            buffer: Shared::new([0; N]),
            updates: Mailbox::new(),
            errors: AtomicU32::new(0),
        }
    }

    pub fn error_count(&self) -> u32 {
        self.errors.load(Ordering::Relaxed)
    }
}

impl<const N: usize> Default for SpiShared<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Interrupt-side state machine for the SPI command slave
pub struct SpiSlaveDispatcher<'a, L, const N: usize> {
    state: SpiState,
    len: usize,
    led: L,
    shared: &'a SpiShared<N>,
}

impl<'a, L: OutputPin, const N: usize> SpiSlaveDispatcher<'a, L, N> {
    /// Buffer transfers move `min(config.buffer_len, N)` bytes
    pub fn new(config: SpiSlaveConfig, led: L, shared: &'a SpiShared<N>) -> Self {
        Self {
            state: SpiState::AwaitCommand,
            len: (config.buffer_len as usize).min(N),
            led,
            shared,
        }
    }

    pub fn state(&self) -> SpiState {
        self.state
    }

    pub fn led(&self) -> &L {
        &self.led
    }

    /// Interrupt body: handle one transferred byte and clear `SPIF`
    pub fn on_interrupt<S: SpiSlave>(&mut self, hw: &mut S) -> SpiOutcome {
        let outcome = if hw.status().has_error() {
            #[cfg(feature = "defmt")]
            defmt::warn!("spi: transfer error in state {}", self.state);
            hw.clear_errors();
            hw.write_data(command::ERROR_OCCURRED);
            self.shared.errors.fetch_add(1, Ordering::Relaxed);
            self.state = SpiState::AwaitCommand;
            SpiOutcome::Error
        } else {
            let byte = hw.read_data();
            self.handle(hw, byte)
        };
        hw.clear_interrupt();
        outcome
    }

    fn handle<S: SpiSlave>(&mut self, hw: &mut S, byte: u8) -> SpiOutcome {
        match self.state {
            SpiState::AwaitCommand => self.command(hw, byte),
            SpiState::AwaitData => {
                self.shared.data.set(byte);
                self.shared.updates.post(SpiUpdate::Data(byte));
                self.state = SpiState::AwaitCommand;
                SpiOutcome::DataStored(byte)
            }
            SpiState::WritingBuffer(index) => {
                self.shared.buffer.lock(|buffer| buffer[index] = byte);
                if index + 1 >= self.len {
                    self.shared.updates.post(SpiUpdate::Buffer);
                    self.state = SpiState::AwaitCommand;
                    SpiOutcome::BufferComplete
                } else {
                    self.state = SpiState::WritingBuffer(index + 1);
                    SpiOutcome::BufferByte(index)
                }
            }
            SpiState::ReadingBuffer(index) if index < self.len => {
                let next = self.shared.buffer.lock(|buffer| buffer[index]);
                hw.write_data(next);
                self.state = SpiState::ReadingBuffer(index + 1);
                SpiOutcome::Loaded(next)
            }
            SpiState::ReadingBuffer(_) | SpiState::SendingByte => {
                self.state = SpiState::AwaitCommand;
                SpiOutcome::ReadComplete
            }
        }
    }

    fn command<S: SpiSlave>(&mut self, hw: &mut S, opcode: u8) -> SpiOutcome {
        match opcode {
            command::LED_ON | command::LED_OFF => {
                let on = opcode == command::LED_ON;
                self.led.set_state(on);
                self.shared.updates.post(SpiUpdate::Led(on));
                SpiOutcome::Led(on)
            }
            command::WRITE => {
                self.state = SpiState::AwaitData;
                SpiOutcome::AwaitingData
            }
            command::READ => {
                let data = self.shared.data.get();
                hw.write_data(data);
                self.state = SpiState::SendingByte;
                SpiOutcome::Loaded(data)
            }
            command::WRITE_BUFFER if self.len > 0 => {
                self.state = SpiState::WritingBuffer(0);
                SpiOutcome::AwaitingData
            }
            command::READ_BUFFER if self.len > 0 => {
                let first = self.shared.buffer.lock(|buffer| buffer[0]);
                hw.write_data(first);
                self.state = SpiState::ReadingBuffer(1);
                SpiOutcome::Loaded(first)
            }
            other => SpiOutcome::Ignored(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cip51_hal::spi::SpiStatus;

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

    #[derive(Default)]
    struct FakeSpi {
        rx: u8,
        tx: Option<u8>,
        status: SpiStatus,
        errors_cleared: u32,
        spif_cleared: u32,
    }

    impl FakeSpi {
        fn clock(&mut self, byte: u8) {
            self.rx = byte;
            self.tx = None;
            self.spif_cleared = 0;
        }
    }

    impl SpiSlave for FakeSpi {
        fn status(&mut self) -> SpiStatus {
            self.status
        }
        fn read_data(&mut self) -> u8 {
            self.rx
        }
        fn write_data(&mut self, byte: u8) {
            self.tx = Some(byte);
        }
        fn clear_errors(&mut self) {
            self.status = SpiStatus::default();
            self.errors_cleared += 1;
        }
        fn clear_interrupt(&mut self) {
            self.spif_cleared += 1;
        }
    }

    fn send(
        dispatcher: &mut SpiSlaveDispatcher<'_, FakeLed, 4>,
        hw: &mut FakeSpi,
        byte: u8,
    ) -> SpiOutcome {
        hw.clock(byte);
        let outcome = dispatcher.on_interrupt(hw);
        assert_eq!(hw.spif_cleared, 1);
        outcome
    }

    #[test]
    fn test_led_commands() {
        let shared = SpiShared::<4>::new();
        let mut dispatcher =
            SpiSlaveDispatcher::new(SpiSlaveConfig { buffer_len: 4 }, FakeLed(false), &shared);
        let mut hw = FakeSpi::default();

        assert_eq!(send(&mut dispatcher, &mut hw, command::LED_ON), SpiOutcome::Led(true));
        assert!(dispatcher.led().is_set_high());
        assert_eq!(shared.updates.take(), Some(SpiUpdate::Led(true)));

        send(&mut dispatcher, &mut hw, command::LED_OFF);
        assert!(dispatcher.led().is_set_low());
        assert_eq!(dispatcher.state(), SpiState::AwaitCommand);
    }

    #[test]
    fn test_write_then_read_byte() {
        let shared = SpiShared::<4>::new();
        let mut dispatcher =
            SpiSlaveDispatcher::new(SpiSlaveConfig { buffer_len: 4 }, FakeLed(false), &shared);
        let mut hw = FakeSpi::default();

        assert_eq!(send(&mut dispatcher, &mut hw, command::WRITE), SpiOutcome::AwaitingData);
        assert_eq!(send(&mut dispatcher, &mut hw, 0x99), SpiOutcome::DataStored(0x99));
        assert_eq!(shared.data.get(), 0x99);

        assert_eq!(send(&mut dispatcher, &mut hw, command::READ), SpiOutcome::Loaded(0x99));
        assert_eq!(hw.tx, Some(0x99));
        assert_eq!(send(&mut dispatcher, &mut hw, 0xFF), SpiOutcome::ReadComplete);
        assert_eq!(hw.tx, None);
        assert_eq!(dispatcher.state(), SpiState::AwaitCommand);
    }

    #[test]
    fn test_buffer_round_trip() {
        let shared = SpiShared::<4>::new();
        let mut dispatcher =
            SpiSlaveDispatcher::new(SpiSlaveConfig { buffer_len: 4 }, FakeLed(false), &shared);
        let mut hw = FakeSpi::default();

        send(&mut dispatcher, &mut hw, command::WRITE_BUFFER);
        for (i, byte) in [1u8, 2, 3].into_iter().enumerate() {
            assert_eq!(send(&mut dispatcher, &mut hw, byte), SpiOutcome::BufferByte(i));
        }
        assert_eq!(send(&mut dispatcher, &mut hw, 4), SpiOutcome::BufferComplete);
        assert_eq!(shared.buffer.get(), [1, 2, 3, 4]);
        assert_eq!(shared.updates.take(), Some(SpiUpdate::Buffer));

        let mut shifted = heapless::Vec::<u8, 4>::new();
        send(&mut dispatcher, &mut hw, command::READ_BUFFER);
        shifted.push(hw.tx.unwrap()).unwrap();
        for _ in 0..3 {
            send(&mut dispatcher, &mut hw, 0xFF);
            shifted.push(hw.tx.unwrap()).unwrap();
        }
        assert_eq!(send(&mut dispatcher, &mut hw, 0xFF), SpiOutcome::ReadComplete);
        assert_eq!(shifted.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_short_configured_buffer() {
        let shared = SpiShared::<4>::new();
        let mut dispatcher =
            SpiSlaveDispatcher::new(SpiSlaveConfig { buffer_len: 2 }, FakeLed(false), &shared);
        let mut hw = FakeSpi::default();

        send(&mut dispatcher, &mut hw, command::WRITE_BUFFER);
        send(&mut dispatcher, &mut hw, 7);
        assert_eq!(send(&mut dispatcher, &mut hw, 8), SpiOutcome::BufferComplete);
        assert_eq!(shared.buffer.get(), [7, 8, 0, 0]);
    }

    #[test]
    fn test_unknown_opcode_ignored() {
        let shared = SpiShared::<4>::new();
        let mut dispatcher =
            SpiSlaveDispatcher::new(SpiSlaveConfig::default(), FakeLed(false), &shared);
        let mut hw = FakeSpi::default();

        assert_eq!(send(&mut dispatcher, &mut hw, 0x80), SpiOutcome::Ignored(0x80));
        assert_eq!(dispatcher.state(), SpiState::AwaitCommand);
        assert_eq!(hw.tx, None);
        assert!(!shared.updates.is_ready());
    }

    #[test]
    fn test_error_loads_error_code() {
        let shared = SpiShared::<4>::new();
        let mut dispatcher =
            SpiSlaveDispatcher::new(SpiSlaveConfig::default(), FakeLed(false), &shared);
        let mut hw = FakeSpi::default();

        send(&mut dispatcher, &mut hw, command::WRITE);
        hw.clock(0x55);
        hw.status.receive_overrun = true;
        assert_eq!(dispatcher.on_interrupt(&mut hw), SpiOutcome::Error);
        assert_eq!(hw.tx, Some(command::ERROR_OCCURRED));
        assert_eq!(hw.errors_cleared, 1);
        assert_eq!(hw.spif_cleared, 1);
        assert_eq!(dispatcher.state(), SpiState::AwaitCommand);
        assert_eq!(shared.error_count(), 1);
        assert_eq!(shared.data.get(), 0);
    }
}
