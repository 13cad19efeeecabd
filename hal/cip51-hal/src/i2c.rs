//! I2C / SMBus bus master abstraction
//!
//! The demo programs exercise slave dispatchers; the master side is what
//! a test bench (or a second board) drives them with.

/// I2C bus master
pub trait I2cBus {
    /// Error type for I2C operations
    type Error;

    /// Write data to a device at the given address
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `data` - Bytes to write
    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Read data from a device at the given address
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `buf` - Buffer to read into
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write then read in a single transaction (repeated start)
    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error>;
}

/// Convert a 7-bit address to the 8-bit on-wire form used by the vendor
/// examples (`0xF0` is 7-bit `0x78`)
pub const fn wire_address(address7: u8, read: bool) -> u8 {
    (address7 << 1) | read as u8
}
