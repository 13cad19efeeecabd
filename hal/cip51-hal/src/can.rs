//! Message-object CAN controller capability
//!
//! The F50x/F58x CAN0 block (a Bosch C_CAN core) exposes 32 message objects
//! and an interrupt identifier register. `CAN0IID` reads `0x8000` for a
//! status interrupt or the number of the message object that raised the
//! interrupt.

/// `CAN0IID` value for a status-change interrupt
pub const CAN_STATUS_INTERRUPT: u16 = 0x8000;

/// Number of message objects in the controller
pub const MESSAGE_OBJECTS: u8 = 32;

/// Standard (11-bit) identifier mask
pub const STANDARD_ID_MASK: u16 = 0x07FF;

/// Maximum payload of a classic CAN frame
pub const MAX_DLC: usize = 8;

/// Decoded `CAN0IID`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptSource {
    /// Nothing pending
    None,
    /// `CAN0STAT` changed
    Status,
    /// Message object 1..=32
    Object(u8),
}

impl InterruptSource {
    /// Decode a raw `CAN0IID` value; out-of-range object numbers read as `None`
    pub fn from_iid(iid: u16) -> Self {
        match iid {
            CAN_STATUS_INTERRUPT => InterruptSource::Status,
            n @ 1..=32 => InterruptSource::Object(n as u8),
            _ => InterruptSource::None,
        }
    }
}

/// Snapshot of `CAN0STAT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanStatus(pub u8);

impl CanStatus {
    /// Last error code (0 = no error, 7 = unused / no change)
    pub fn last_error_code(&self) -> u8 {
        self.0 & 0x07
    }

    pub fn tx_ok(&self) -> bool {
        self.0 & (1 << 3) != 0
    }

    pub fn rx_ok(&self) -> bool {
        self.0 & (1 << 4) != 0
    }

    pub fn error_passive(&self) -> bool {
        self.0 & (1 << 5) != 0
    }

    pub fn error_warning(&self) -> bool {
        self.0 & (1 << 6) != 0
    }

    pub fn bus_off(&self) -> bool {
        self.0 & (1 << 7) != 0
    }
}

/// Message object direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ObjectDirection {
    Transmit,
    Receive,
}

/// Message object configuration (arbitration + control registers)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MessageObjectConfig {
    /// 11-bit identifier
    pub id: u16,
    /// Transmit or receive object
    pub direction: ObjectDirection,
    /// Data length code
    pub dlc: u8,
    /// Raise an interrupt on completion (TXIE / RXIE)
    pub interrupt: bool,
}

/// CAN controller
pub trait CanController {
    /// Error type for configuration and transmit requests
    type Error;

    /// Read and decode `CAN0IID`
    fn interrupt_source(&mut self) -> InterruptSource;

    /// Read `CAN0STAT` (reading clears the status interrupt)
    fn status(&mut self) -> CanStatus;

    /// Program a message object through the IF1 interface registers
    fn configure_object(&mut self, object: u8, config: MessageObjectConfig) -> Result<(), Self::Error>;

    /// Load data into a transmit object and request transmission
    fn transmit(&mut self, object: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Copy a received object's data into `buf`, returning the DLC
    fn read_object(&mut self, object: u8, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Clear `IntPnd` (and `NewDat`) of an object
    fn clear_pending(&mut self, object: u8);

    /// Clear `INIT` to leave bus-off and rejoin the bus
    fn restart(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_source_decode() {
        assert_eq!(InterruptSource::from_iid(0x0000), InterruptSource::None);
        assert_eq!(InterruptSource::from_iid(0x8000), InterruptSource::Status);
        assert_eq!(InterruptSource::from_iid(0x0002), InterruptSource::Object(2));
        assert_eq!(InterruptSource::from_iid(0x0021), InterruptSource::None);
    }

    #[test]
    fn test_status_bits() {
        let status = CanStatus(0x98);
        assert!(status.bus_off());
        assert!(status.rx_ok());
        assert!(status.tx_ok());
        assert!(!status.error_warning());
        assert_eq!(status.last_error_code(), 0);
    }
}
