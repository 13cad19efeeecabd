//! SMBus slave capability
//!
//! Two status-register layouts cover the whole family:
//!
//! - **Nibble** (`SMB0CN & 0xF0`): F3xx, F41x, F50x, F52x, F93x, F99x,
//!   Si101x. The upper nibble of the control register is
//!   `[MASTER, TXMODE, STA, STO]`; software compares the address byte.
//! - **Vector** (`SMB0STA`): F0xx, F12x. The peripheral matches its own
//!   address and reports one of a fixed set of status codes.
//!
//! [`StatusLayout::decode`] folds both into [`SmbusEvent`] so the dispatcher
//! only ever matches on events.

/// Transfer direction from the slave's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Master writes, slave receives
    Write,
    /// Master reads, slave transmits
    Read,
}

impl Direction {
    /// Direction from the R/W bit of an address byte
    pub fn from_address_byte(byte: u8) -> Self {
        if byte & 0x01 != 0 {
            Direction::Read
        } else {
            Direction::Write
        }
    }
}

/// Nibble layout status values (`SMB0CN & 0xF0`)
pub mod nibble {
    /// Slave receiver, START + address byte received
    pub const SRADD: u8 = 0x20;
    /// Slave receiver, data byte received
    pub const SRDB: u8 = 0x00;
    /// Slave receiver, STOP received
    pub const SRSTO: u8 = 0x10;
    /// Slave transmitter, data byte transmitted
    pub const STDB: u8 = 0x40;
    /// Slave transmitter, STOP received
    pub const STSTO: u8 = 0x50;
}

/// Vector layout status codes (`SMB0STA`)
pub mod vector {
    /// Own address + W received, ACK returned
    pub const SROADACK: u8 = 0x60;
    /// General call address received, ACK returned
    pub const SRGADACK: u8 = 0x70;
    /// Data byte received, ACK returned
    pub const SRODBACK: u8 = 0x80;
    /// Data byte received, NACK returned
    pub const SRODBNACK: u8 = 0x88;
    /// STOP or repeated START received
    pub const SRSTOP: u8 = 0xA0;
    /// Own address + R received, ACK returned
    pub const STOADACK: u8 = 0xA8;
    /// Data byte transmitted, ACK received
    pub const STDBACK: u8 = 0xB8;
    /// Data byte transmitted, NACK received
    pub const STDBNACK: u8 = 0xC0;
    /// Last data byte transmitted (AA = 0), ACK received
    pub const STDBLAST: u8 = 0xC8;
    /// Bus error (illegal START or STOP)
    pub const BUS_ERROR: u8 = 0x00;
}

/// Which status register layout a chip family uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusLayout {
    /// Upper nibble of `SMB0CN`
    Nibble,
    /// `SMB0STA` status codes
    Vector,
}

/// A slave-side protocol event decoded from a raw status value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SmbusEvent {
    /// START + address byte is in the data register; software must match
    /// the address and read the R/W bit itself
    AddressByte,
    /// The peripheral matched its own address
    OwnAddress(Direction),
    /// General call address received
    GeneralCall,
    /// A data byte is waiting in the data register
    DataReceived,
    /// A data byte was shifted out
    DataTransmitted {
        /// Whether the master acknowledged the byte
        acked: bool,
    },
    /// STOP (or repeated START) ended the transfer
    Stop,
    /// Anything outside the documented set
    Unknown(u8),
}

impl StatusLayout {
    /// Decode a raw status read
    ///
    /// For the nibble layout only the upper four bits are significant; the
    /// `ack` argument is the `ACK` bit of `SMB0CN` and is only consulted for
    /// transmitted bytes. The vector layout encodes ACK in the code itself.
    pub fn decode(self, status: u8, ack: bool) -> SmbusEvent {
        match self {
            StatusLayout::Nibble => match status & 0xF0 {
                nibble::SRADD => SmbusEvent::AddressByte,
                nibble::SRDB => SmbusEvent::DataReceived,
                nibble::SRSTO | nibble::STSTO => SmbusEvent::Stop,
                nibble::STDB => SmbusEvent::DataTransmitted { acked: ack },
                other => SmbusEvent::Unknown(other),
            },
            StatusLayout::Vector => match status {
                vector::SROADACK => SmbusEvent::OwnAddress(Direction::Write),
                vector::STOADACK => SmbusEvent::OwnAddress(Direction::Read),
                vector::SRGADACK => SmbusEvent::GeneralCall,
                vector::SRODBACK | vector::SRODBNACK => SmbusEvent::DataReceived,
                vector::SRSTOP => SmbusEvent::Stop,
                vector::STDBACK | vector::STDBLAST => SmbusEvent::DataTransmitted { acked: true },
                vector::STDBNACK => SmbusEvent::DataTransmitted { acked: false },
                other => SmbusEvent::Unknown(other),
            },
        }
    }
}

/// SMBus slave peripheral
///
/// Each method maps to one register access the vendor ISRs perform. The
/// dispatcher calls [`SmbusSlave::clear_interrupt`] exactly once at the
/// end of every interrupt.
pub trait SmbusSlave {
    /// Status layout of this chip family
    fn layout(&self) -> StatusLayout;

    /// Read the raw status register (`SMB0CN` or `SMB0STA`)
    fn read_status(&mut self) -> u8;

    /// `ARBLOST` flag (always false on vector-layout parts)
    fn arbitration_lost(&mut self) -> bool {
        false
    }

    /// `ACK` bit as last sampled from the bus
    fn ack_received(&mut self) -> bool;

    /// Read `SMB0DAT`
    fn read_data(&mut self) -> u8;

    /// Write `SMB0DAT`
    fn write_data(&mut self, byte: u8);

    /// Set or clear the `ACK` / `AA` bit
    fn ack(&mut self, ack: bool);

    /// Clear `STA`
    fn clear_start(&mut self);

    /// Clear `STO`
    fn clear_stop(&mut self);

    /// Clear `SI`
    fn clear_interrupt(&mut self);

    /// Disable then re-enable the peripheral (`ENSMB` 1 → 0 → 1)
    fn reset(&mut self);
}
