//! Flash memory and supply monitor abstractions
//!
//! Flash on these parts is written one byte at a time through `MOVX` with
//! `PSWE` set and erased one page at a time with `PSEE`. Parts above 64KB
//! map the upper code banks into a 32KB window at `0x8000`, selected with
//! `PSBANK` (`COBANK` bits). The key-sequence unlock is the implementor's
//! concern; callers see only byte program and page erase.
//!
//! A write with VDD below the monitor threshold can corrupt flash, so every
//! program/erase path checks [`VddMonitor::is_supply_ok`] first.

/// Flash layout of a chip variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashGeometry {
    /// Total code flash in bytes
    pub size: u32,
    /// Erase page size in bytes
    pub page_size: u16,
    /// Size of a banked window (0 for unbanked parts)
    pub bank_size: u32,
    /// First byte of the reserved area (lock byte page); writes at or above
    /// this linear address are refused
    pub reserved_start: u32,
}

impl FlashGeometry {
    /// 64KB unbanked part with 512-byte pages (F34x, F50x)
    pub const F34X: Self = Self {
        size: 0x1_0000,
        page_size: 512,
        bank_size: 0,
        reserved_start: 0xFC00,
    };

    /// 128KB banked part with 1KB pages (F12x, F13x)
    pub const F12X: Self = Self {
        size: 0x2_0000,
        page_size: 1024,
        bank_size: 0x8000,
        reserved_start: 0x1_FC00,
    };

    /// 8KB part with 512-byte pages (F30x, F99x)
    pub const F99X: Self = Self {
        size: 0x2000,
        page_size: 512,
        bank_size: 0,
        reserved_start: 0x1E00,
    };

    /// Whether upper memory is reached through bank switching
    pub fn is_banked(&self) -> bool {
        self.bank_size != 0
    }

    /// Start of the page containing `addr`
    pub fn page_start(&self, addr: u32) -> u32 {
        addr - (addr % self.page_size as u32)
    }
}

/// Errors from flash operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// VDD below the monitor threshold; nothing was modified
    SupplyLow,
    /// Address beyond the end of flash
    OutOfRange,
    /// Address inside the reserved / lock byte area
    Reserved,
    /// Read-back after programming did not match
    VerifyFailed,
    /// Caller buffer too small for the request
    BufferTooSmall,
    /// Source and destination ranges of a copy overlap
    Overlap,
}

/// Raw flash access for one chip variant
///
/// Offsets are 16-bit `MOVX`/`MOVC` addresses as seen through the currently
/// selected bank.
pub trait FlashCore {
    /// Layout of this part
    fn geometry(&self) -> FlashGeometry;

    /// Map code bank `bank` into the `0x8000` window (`PSBANK`)
    fn select_bank(&mut self, bank: u8);

    /// Read one byte (`MOVC`)
    fn read_byte(&mut self, offset: u16) -> u8;

    /// Program one byte (`PSWE` + `MOVX`)
    fn program_byte(&mut self, offset: u16, byte: u8);

    /// Erase the page containing `offset` (`PSEE` + `PSWE` + `MOVX`)
    fn erase_page(&mut self, offset: u16);
}

/// VDD supply monitor
pub trait VddMonitor {
    /// Turn the monitor on (`VDM0CN.7`)
    fn enable(&mut self);

    /// Make the monitor a reset source (`RSTSRC.1`), required before any
    /// flash write
    fn enable_reset_source(&mut self);

    /// `VDDSTAT`: supply above threshold
    fn is_supply_ok(&mut self) -> bool;
}
