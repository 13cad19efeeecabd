//! LIN slave capability and frame arithmetic
//!
//! Register views follow the `LIN0ST` / `LIN0ERR` layout of the
//! F50x/F52x/F54x LIN controller. The frame helpers (protected identifier
//! and checksum) are shared by the simulated master and by tests.

/// `LIN0ST` bit positions
pub mod status_bits {
    pub const DONE: u8 = 1 << 0;
    pub const WAKEUP: u8 = 1 << 1;
    pub const ERROR: u8 = 1 << 2;
    pub const INTREQ: u8 = 1 << 3;
    pub const DTREQ: u8 = 1 << 4;
    pub const ABORT: u8 = 1 << 5;
    pub const IDLTOUT: u8 = 1 << 6;
    pub const ACTIVE: u8 = 1 << 7;
}

/// `LIN0ERR` bit positions
pub mod error_bits {
    pub const BITERR: u8 = 1 << 0;
    pub const CHKERR: u8 = 1 << 1;
    pub const PRTYERR: u8 = 1 << 2;
    pub const TOUT: u8 = 1 << 3;
    pub const SYNCH: u8 = 1 << 4;
}

/// Highest unprotected frame identifier
pub const MAX_ID: u8 = 0x3F;

/// Largest response a LIN frame can carry
pub const MAX_DATA_LEN: usize = 8;

/// Snapshot of `LIN0ST`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinStatus(pub u8);

impl LinStatus {
    /// Transfer of the response completed
    pub fn done(&self) -> bool {
        self.0 & status_bits::DONE != 0
    }

    /// Wakeup signal seen on the bus
    pub fn wakeup(&self) -> bool {
        self.0 & status_bits::WAKEUP != 0
    }

    /// An error is latched in `LIN0ERR`
    pub fn error(&self) -> bool {
        self.0 & status_bits::ERROR != 0
    }

    /// Header received; software must decide how to answer the identifier
    pub fn data_request(&self) -> bool {
        self.0 & status_bits::DTREQ != 0
    }

    /// Frame aborted by a new break
    pub fn aborted(&self) -> bool {
        self.0 & status_bits::ABORT != 0
    }

    /// Bus idle for four seconds
    pub fn idle_timeout(&self) -> bool {
        self.0 & status_bits::IDLTOUT != 0
    }
}

/// Snapshot of `LIN0ERR`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinErrors(pub u8);

impl LinErrors {
    pub fn bit(&self) -> bool {
        self.0 & error_bits::BITERR != 0
    }

    pub fn checksum(&self) -> bool {
        self.0 & error_bits::CHKERR != 0
    }

    pub fn parity(&self) -> bool {
        self.0 & error_bits::PRTYERR != 0
    }

    pub fn timeout(&self) -> bool {
        self.0 & error_bits::TOUT != 0
    }

    pub fn synch(&self) -> bool {
        self.0 & error_bits::SYNCH != 0
    }

    pub fn any(&self) -> bool {
        self.0 & 0x1F != 0
    }
}

/// Which side sends the response field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseDirection {
    /// Slave publishes the response (`TXRX = 1`)
    Transmit,
    /// Slave subscribes to a master response (`TXRX = 0`)
    Receive,
}

/// Checksum model (`ENHCHK` bit of `LIN0SIZE`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ChecksumKind {
    /// LIN 1.x: data bytes only
    Classic,
    /// LIN 2.x: protected identifier and data bytes
    #[default]
    Enhanced,
}

/// Add parity bits P0 (bit 6) and P1 (bit 7) to a 6-bit identifier
pub fn protected_id(id: u8) -> u8 {
    let id = id & MAX_ID;
    let bit = |n: u8| (id >> n) & 1;
    let p0 = bit(0) ^ bit(1) ^ bit(2) ^ bit(4);
    let p1 = !(bit(1) ^ bit(3) ^ bit(4) ^ bit(5)) & 1;
    id | (p0 << 6) | (p1 << 7)
}

/// Strip and verify parity; `None` if the parity bits are wrong
pub fn unprotect_id(pid: u8) -> Option<u8> {
    let id = pid & MAX_ID;
    (protected_id(id) == pid).then_some(id)
}

/// Compute the frame checksum
///
/// Diagnostic frames (`0x3C`, `0x3D`) always use the classic checksum.
pub fn checksum(kind: ChecksumKind, pid: u8, data: &[u8]) -> u8 {
    let diagnostic = matches!(pid & MAX_ID, 0x3C | 0x3D);
    let mut sum: u16 = match kind {
        ChecksumKind::Enhanced if !diagnostic => pid as u16,
        _ => 0,
    };
    for &byte in data {
        sum += byte as u16;
        if sum > 0xFF {
            sum -= 0xFF;
        }
    }
    !(sum as u8)
}

/// LIN slave peripheral
pub trait LinSlave {
    /// Read `LIN0ST`
    fn read_status(&mut self) -> LinStatus;

    /// Read `LIN0ID` (parity already stripped by hardware)
    fn read_id(&mut self) -> u8;

    /// Read `LIN0ERR`
    fn read_errors(&mut self) -> LinErrors;

    /// Program `LIN0SIZE` and the `TXRX` bit for the pending response
    fn set_response(&mut self, direction: ResponseDirection, len: u8, checksum: ChecksumKind);

    /// Write response byte `index` (`LIN0DT1..LIN0DT8`)
    fn write_data(&mut self, index: usize, byte: u8);

    /// Read received byte `index`
    fn read_data(&mut self, index: usize) -> u8;

    /// Set `DTACK` to release the response
    fn ack_data_request(&mut self);

    /// Set `STOP` to ignore the rest of this frame
    fn stop_rx(&mut self);

    /// Set `RSTINT` and `RSTERR`
    fn clear_interrupt(&mut self);

    /// Disable and re-enable the controller (`LIN0CTRL2` toggle)
    fn reset(&mut self);
}
