//! UART status lines
//!
//! Lines are formatted into a fixed buffer first so an ISR-side value is
//! sampled once and a line never goes out half-written.

use core::fmt::{self, Write};

use cip51_hal::uart::UartTx;
use heapless::String;

/// Longest status line, excluding the CR LF terminator
pub const MAX_LINE_LEN: usize = 64;

/// One formatted status line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLine {
    text: String<MAX_LINE_LEN>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Format a line; fails if it does not fit in [`MAX_LINE_LEN`]
    pub fn format(args: fmt::Arguments<'_>) -> Result<Self, fmt::Error> {
        let mut line = Self::new();
        line.write_fmt(args)?;
        Ok(line)
    }

    /// `"AIN0 voltage: 1234 mV"`
    pub fn voltage(channel: &str, millivolts: u32) -> Result<Self, fmt::Error> {
        Self::format(format_args!("{} voltage: {} mV", channel, millivolts))
    }

    /// `"Temperature: 25.17 C"`
    pub fn temperature(c_x100: i32) -> Result<Self, fmt::Error> {
        let sign = if c_x100 < 0 { "-" } else { "" };
        let abs = c_x100.unsigned_abs();
        Self::format(format_args!(
            "Temperature: {}{}.{:02} C",
            sign,
            abs / 100,
            abs % 100
        ))
    }

    /// `"SMBus RX: 0x42"` and the like
    pub fn byte(label: &str, byte: u8) -> Result<Self, fmt::Error> {
        Self::format(format_args!("{}: 0x{:02X}", label, byte))
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    /// Transmit the line followed by CR LF
    pub fn send<T: UartTx>(&self, tx: &mut T) -> Result<(), T::Error> {
        tx.write_blocking(self.text.as_bytes())?;
        tx.write_blocking(b"\r\n")
    }
}

impl Write for StatusLine {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.text.push_str(s).map_err(|_| fmt::Error)
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
