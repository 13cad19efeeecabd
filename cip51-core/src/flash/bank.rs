//! Linear to banked address translation

/// Start of the bank-switched window
pub const BANK_WINDOW: u16 = 0x8000;

/// A linear flash address as seen through the bank window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BankedAddress {
    /// Code bank to map into the window, `None` for the common area
    pub bank: Option<u8>,
    /// 16-bit `MOVX`/`MOVC` address
    pub offset: u16,
}

impl BankedAddress {
    /// Translate for a banked part
    ///
    /// `0x0000..=0x7FFF` is the common area, always visible. Above that,
    /// each 32KB bank appears at `0x8000..=0xFFFF`.
    pub fn from_linear(addr: u32) -> Self {
        if addr < BANK_WINDOW as u32 {
            Self {
                bank: None,
                offset: addr as u16,
            }
        } else {
            Self {
                bank: Some((addr >> 15) as u8),
                offset: BANK_WINDOW | (addr & 0x7FFF) as u16,
            }
        }
    }

    /// Translate for an unbanked part (addresses pass through)
    pub fn flat(addr: u32) -> Self {
        Self {
            bank: None,
            offset: addr as u16,
        }
    }
}
