//! UART serial communication abstractions
//!
//! The demo programs report measurements as plain ASCII lines over an
//! 8-N-1 UART clocked from Timer1 (or Timer2 on some parts).

use core::fmt;

/// UART transmitter
pub trait UartTx {
    /// Error type for transmit operations
    type Error;

    /// Write data to the UART
    ///
    /// Blocks until all data has been written or an error occurs.
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// UART receiver
pub trait UartRx {
    /// Error type for receive operations
    type Error;

    /// Read data from the UART
    ///
    /// Blocks until the buffer is filled or an error occurs.
    fn read_blocking(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Read a single byte from the UART
    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        let mut buf = [0u8; 1];
        self.read_blocking(&mut buf)?;
        Ok(buf[0])
    }
}

/// `core::fmt::Write` adapter so status lines can be produced with `write!`
///
/// Newlines are expanded to CR LF, which is what a serial terminal expects.
pub struct UartWriter<'a, T> {
    tx: &'a mut T,
}

impl<'a, T: UartTx> UartWriter<'a, T> {
    /// Borrow a transmitter for formatting
    pub fn new(tx: &'a mut T) -> Self {
        Self { tx }
    }
}

impl<T: UartTx> fmt::Write for UartWriter<'_, T> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for chunk in s.split_inclusive('\n') {
            match chunk.strip_suffix('\n') {
                Some(line) => {
                    self.tx.write_blocking(line.as_bytes()).map_err(|_| fmt::Error)?;
                    self.tx.write_blocking(b"\r\n").map_err(|_| fmt::Error)?;
                }
                None => self.tx.write_blocking(chunk.as_bytes()).map_err(|_| fmt::Error)?,
            }
        }
        Ok(())
    }
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baudrate: 115200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl UartConfig {
    /// Slowest rate used by the examples
    pub const MIN_BAUD: u32 = 1200;
    /// Fastest rate used by the examples
    pub const MAX_BAUD: u32 = 230_400;

    /// 8-N-1 at the given rate
    pub fn with_baud(baudrate: u32) -> Self {
        Self {
            baudrate,
            ..Self::default()
        }
    }
}

/// Number of data bits per frame
///
/// UART0 mode 1 is 8-bit; mode 3 adds a ninth (multiprocessor) bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Eight,
    Nine,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}
