//! Simulation errors

use std::fmt;

/// Failures observed by a simulated bus master
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// Slave did not acknowledge an address or data byte
    Nack,
    /// Interrupt handler returned with the pending flag still set
    InterruptNotCleared,
    /// No slave released a response for a LIN header
    NoResponse,
    /// LIN response checksum did not verify
    Checksum,
    /// Message object number outside 1..=32
    InvalidObject(u8),
    /// Message object used before configuration or in the wrong direction
    NotConfigured(u8),
    /// Identifier wider than 11 bits
    InvalidId(u16),
    /// Payload longer than the frame allows
    TooLong,
    /// UART read with nothing left in the receive queue
    RxEmpty,
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Nack => write!(f, "slave did not acknowledge"),
            SimError::InterruptNotCleared => write!(f, "interrupt handler left the pending flag set"),
            SimError::NoResponse => write!(f, "no response to frame header"),
            SimError::Checksum => write!(f, "response checksum mismatch"),
            SimError::InvalidObject(n) => write!(f, "message object {} out of range", n),
            SimError::NotConfigured(n) => write!(f, "message object {} not configured for this use", n),
            SimError::InvalidId(id) => write!(f, "identifier {:#x} is not an 11-bit id", id),
            SimError::TooLong => write!(f, "payload exceeds frame length"),
            SimError::RxEmpty => write!(f, "uart receive queue is empty"),
        }
    }
}

impl std::error::Error for SimError {}
