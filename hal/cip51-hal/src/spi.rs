//! SPI bus abstractions
//!
//! [`SpiBus`] is the master side; [`SpiSlave`] is the capability the
//! slave command dispatcher needs from `SPI0`.

/// SPI bus master
pub trait SpiBus {
    /// Error type for SPI operations
    type Error;

    /// Transfer data (simultaneous read/write)
    ///
    /// Writes data from `write` buffer while reading into `read` buffer.
    /// Both buffers must be the same length.
    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error>;

    /// Write data without reading
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Read data (clocks out 0xFF dummy bytes)
    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Transfer data in place
    fn transfer_in_place(&mut self, data: &mut [u8]) -> Result<(), Self::Error>;
}

/// Error flags sampled from `SPI0CN` at the top of the interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiStatus {
    /// `WCOL`: `SPI0DAT` written while a transfer was in progress
    pub write_collision: bool,
    /// `RXOVRN`: a byte arrived before the previous one was read
    pub receive_overrun: bool,
    /// `MODF`: NSS driven low while configured as master
    pub mode_fault: bool,
}

impl SpiStatus {
    /// Any error flag set
    pub fn has_error(&self) -> bool {
        self.write_collision || self.receive_overrun || self.mode_fault
    }
}

/// SPI slave peripheral
pub trait SpiSlave {
    /// Sample the error flags
    fn status(&mut self) -> SpiStatus;

    /// Read the byte just shifted in
    fn read_data(&mut self) -> u8;

    /// Load the byte shifted out on the next transfer
    fn write_data(&mut self, byte: u8);

    /// Clear `WCOL`, `RXOVRN` and `MODF`
    fn clear_errors(&mut self);

    /// Clear `SPIF`
    fn clear_interrupt(&mut self);
}

/// SPI configuration
#[derive(Debug, Clone, Copy)]
pub struct SpiConfig {
    /// Clock frequency in Hz (master only; the slave follows SCK)
    pub frequency: u32,
    /// Clock polarity
    pub polarity: Polarity,
    /// Clock phase
    pub phase: Phase,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            frequency: 1_000_000,
            polarity: Polarity::IdleLow,
            phase: Phase::CaptureOnFirstTransition,
        }
    }
}

/// SPI clock polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Clock idles low (CKPOL=0)
    IdleLow,
    /// Clock idles high (CKPOL=1)
    IdleHigh,
}

/// SPI clock phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Data captured on first clock transition (CKPHA=0)
    CaptureOnFirstTransition,
    /// Data captured on second clock transition (CKPHA=1)
    CaptureOnSecondTransition,
}

/// SPI mode (combined polarity and phase)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Mode 0: CPOL=0, CPHA=0
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

impl From<Mode> for (Polarity, Phase) {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Mode0 => (Polarity::IdleLow, Phase::CaptureOnFirstTransition),
            Mode::Mode1 => (Polarity::IdleLow, Phase::CaptureOnSecondTransition),
            Mode::Mode2 => (Polarity::IdleHigh, Phase::CaptureOnFirstTransition),
            Mode::Mode3 => (Polarity::IdleHigh, Phase::CaptureOnSecondTransition),
        }
    }
}

impl SpiConfig {
    /// `SPI0CFG` clock bits (`CKPHA` bit 5, `CKPOL` bit 4)
    pub fn spi0cfg_clock_bits(&self) -> u8 {
        let mut bits = 0;
        if self.phase == Phase::CaptureOnSecondTransition {
            bits |= 1 << 5;
        }
        if self.polarity == Polarity::IdleHigh {
            bits |= 1 << 4;
        }
        bits
    }
}
