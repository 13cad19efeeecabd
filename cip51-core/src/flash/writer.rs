//! Byte/page flash operations over a `FlashCore`

use cip51_hal::flash::{FlashCore, FlashError, FlashGeometry, VddMonitor};

use super::bank::BankedAddress;

/// Largest erase page the page buffer holds
pub const MAX_PAGE_SIZE: usize = 1024;

/// Source of the new bytes for a page rewrite
#[derive(Clone, Copy)]
enum Patch<'d> {
    Data(&'d [u8]),
    Fill(u8),
    CopyFrom(u32),
}

/// Flash writer for one chip
///
/// Every program or erase first enables the VDD monitor as a reset source
/// and checks the supply. A low supply fails with [`FlashError::SupplyLow`]
/// before flash is touched.
pub struct FlashWriter<F, V> {
    flash: F,
    vdd: V,
}

impl<F: FlashCore, V: VddMonitor> FlashWriter<F, V> {
    pub fn new(flash: F, vdd: V) -> Self {
        Self { flash, vdd }
    }

    pub fn geometry(&self) -> FlashGeometry {
        self.flash.geometry()
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn vdd_mut(&mut self) -> &mut V {
        &mut self.vdd
    }

    pub fn into_parts(self) -> (F, V) {
        (self.flash, self.vdd)
    }

    /// Read one byte
    pub fn read_byte(&mut self, addr: u32) -> Result<u8, FlashError> {
        self.check_bounds(addr, 1)?;
        let offset = self.map(addr);
        Ok(self.flash.read_byte(offset))
    }

    /// Read `buf.len()` bytes starting at `addr`
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        self.check_bounds(addr, buf.len() as u32)?;
        for (i, byte) in buf.iter_mut().enumerate() {
            let offset = self.map(addr + i as u32);
            *byte = self.flash.read_byte(offset);
        }
        Ok(())
    }

    /// Program one byte into an erased location
    ///
    /// The byte is read back; on mismatch it is programmed once more before
    /// giving up with [`FlashError::VerifyFailed`].
    pub fn write_byte(&mut self, addr: u32, byte: u8) -> Result<(), FlashError> {
        self.check_writable(addr, 1)?;
        self.supply_guard()?;
        self.program_verified(addr, byte)
    }

    /// Program a run of bytes into erased flash
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), FlashError> {
        self.check_writable(addr, data.len() as u32)?;
        for (i, &byte) in data.iter().enumerate() {
            self.supply_guard()?;
            self.program_verified(addr + i as u32, byte)?;
        }
        Ok(())
    }

    /// Erase the page containing `addr`
    pub fn erase_page(&mut self, addr: u32) -> Result<(), FlashError> {
        let geometry = self.geometry();
        let page = geometry.page_start(addr);
        self.check_writable(page, geometry.page_size as u32)?;
        self.supply_guard()?;
        let offset = self.map(page);
        self.flash.erase_page(offset);
        Ok(())
    }

    /// Overwrite `data.len()` bytes, preserving the rest of each page
    ///
    /// The supply is checked again before every byte programmed after the
    /// erase. A `SupplyLow` at that point leaves the page partly erased,
    /// including bytes outside the requested range.
    pub fn update(&mut self, addr: u32, data: &[u8]) -> Result<(), FlashError> {
        self.rewrite(addr, data.len() as u32, Patch::Data(data))
    }

    /// Set `len` bytes to the erased value (`0xFF`), preserving the rest of
    /// each page
    ///
    /// Same failure mode as [`Self::update`]: the page may be left erased.
    pub fn clear(&mut self, addr: u32, len: u32) -> Result<(), FlashError> {
        self.rewrite(addr, len, Patch::Fill(0xFF))
    }

    /// Copy `len` bytes from `src` to `dest`
    ///
    /// Same failure mode as [`Self::update`]: the destination page may be
    /// left erased.
    pub fn copy(&mut self, dest: u32, src: u32, len: u32) -> Result<(), FlashError> {
        self.check_bounds(src, len)?;
        self.check_bounds(dest, len)?;
        if len > 0 && src < dest + len && dest < src + len {
            return Err(FlashError::Overlap);
        }
        self.rewrite(dest, len, Patch::CopyFrom(src))
    }

    /// Read-modify-erase-write every page touched by `addr..addr + len`
    fn rewrite(&mut self, addr: u32, len: u32, patch: Patch<'_>) -> Result<(), FlashError> {
        let geometry = self.geometry();
        let page_size = geometry.page_size as u32;
        if page_size as usize > MAX_PAGE_SIZE {
            return Err(FlashError::BufferTooSmall);
        }
        self.check_writable(addr, len)?;
        if len == 0 {
            return Ok(());
        }
        self.supply_guard()?;

        let end = addr + len;
        let mut buf = [0u8; MAX_PAGE_SIZE];
        let mut page = geometry.page_start(addr);
        while page < end {
            let page_buf = &mut buf[..page_size as usize];
            self.read(page, page_buf)?;

            let from = addr.max(page);
            let to = end.min(page + page_size);
            for linear in from..to {
                let index = linear - addr;
                page_buf[(linear - page) as usize] = match patch {
                    Patch::Data(data) => data[index as usize],
                    Patch::Fill(value) => value,
                    Patch::CopyFrom(src) => self.read_byte(src + index)?,
                };
            }

            self.erase_page(page)?;
            for (i, &byte) in buf[..page_size as usize].iter().enumerate() {
                if byte != 0xFF {
                    self.supply_guard()?;
                    self.program_verified(page + i as u32, byte)?;
                }
            }
            page += page_size;
        }
        Ok(())
    }

    fn program_verified(&mut self, addr: u32, byte: u8) -> Result<(), FlashError> {
        let offset = self.map(addr);
        for _ in 0..2 {
            self.flash.program_byte(offset, byte);
            if self.flash.read_byte(offset) == byte {
                return Ok(());
            }
        }
        #[cfg(feature = "defmt")]
        defmt::warn!("flash: verify failed at {=u32:#x}", addr);
        Err(FlashError::VerifyFailed)
    }

    fn supply_guard(&mut self) -> Result<(), FlashError> {
        self.vdd.enable();
        self.vdd.enable_reset_source();
        if self.vdd.is_supply_ok() {
            Ok(())
        } else {
            #[cfg(feature = "defmt")]
            defmt::warn!("flash: VDD below threshold, write refused");
            Err(FlashError::SupplyLow)
        }
    }

    fn check_bounds(&self, addr: u32, len: u32) -> Result<(), FlashError> {
        match addr.checked_add(len) {
            Some(end) if end <= self.geometry().size => Ok(()),
            _ => Err(FlashError::OutOfRange),
        }
    }

    fn check_writable(&self, addr: u32, len: u32) -> Result<(), FlashError> {
        self.check_bounds(addr, len)?;
        if len > 0 && addr + len > self.geometry().reserved_start {
            return Err(FlashError::Reserved);
        }
        Ok(())
    }

    fn map(&mut self, addr: u32) -> u16 {
        let location = if self.geometry().is_banked() {
            BankedAddress::from_linear(addr)
        } else {
            BankedAddress::flat(addr)
        };
        if let Some(bank) = location.bank {
            self.flash.select_bank(bank);
        }
        location.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::vec;
    use std::vec::Vec;

    /// Flash model: erased bytes read 0xFF, programming only clears bits
    struct RamFlash {
        geometry: FlashGeometry,
        cells: Vec<u8>,
        bank: u8,
        /// Programs to ignore before programming works
        flaky: u32,
        programs: u32,
        erases: u32,
    }

    impl RamFlash {
        fn new(geometry: FlashGeometry) -> Self {
            Self {
                geometry,
                cells: vec![0xFF; geometry.size as usize],
                bank: 1,
                flaky: 0,
                programs: 0,
                erases: 0,
            }
        }

        fn linear(&self, offset: u16) -> usize {
            if self.geometry.is_banked() && offset >= 0x8000 {
                (self.bank as usize) << 15 | (offset as usize & 0x7FFF)
            } else {
                offset as usize
            }
        }
    }

    impl FlashCore for RamFlash {
        fn geometry(&self) -> FlashGeometry {
            self.geometry
        }
        fn select_bank(&mut self, bank: u8) {
            self.bank = bank;
        }
        fn read_byte(&mut self, offset: u16) -> u8 {
            self.cells[self.linear(offset)]
        }
        fn program_byte(&mut self, offset: u16, byte: u8) {
            self.programs += 1;
            if self.flaky > 0 {
                self.flaky -= 1;
                return;
            }
            let index = self.linear(offset);
            self.cells[index] &= byte;
        }
        fn erase_page(&mut self, offset: u16) {
            self.erases += 1;
            let start = self.linear(offset);
            let page = self.geometry.page_size as usize;
            let start = start - start % page;
            self.cells[start..start + page].fill(0xFF);
        }
    }

    struct Supply {
        ok: bool,
        /// Checks that still pass before the supply drops
        checks_left: Option<u32>,
        enabled: bool,
        reset_source: bool,
    }

    impl Supply {
        fn good() -> Self {
            Self {
                ok: true,
                checks_left: None,
                enabled: false,
                reset_source: false,
            }
        }
    }

    impl VddMonitor for Supply {
        fn enable(&mut self) {
            self.enabled = true;
        }
        fn enable_reset_source(&mut self) {
            self.reset_source = true;
        }
        fn is_supply_ok(&mut self) -> bool {
            match self.checks_left.as_mut() {
                Some(0) => false,
                Some(n) => {
                    *n -= 1;
                    self.ok
                }
                None => self.ok,
            }
        }
    }

    fn writer(geometry: FlashGeometry) -> FlashWriter<RamFlash, Supply> {
        FlashWriter::new(RamFlash::new(geometry), Supply::good())
    }

    #[test]
    fn test_write_then_read() {
        let mut w = writer(FlashGeometry::F99X);
        w.write_byte(0x1000, 0xA5).unwrap();
        assert_eq!(w.read_byte(0x1000), Ok(0xA5));

        let (_, supply) = w.into_parts();
        assert!(supply.enabled);
        assert!(supply.reset_source);
    }

    #[test]
    fn test_low_supply_touches_nothing() {
        let mut w = writer(FlashGeometry::F99X);
        w.write_byte(0x0200, 0x00).unwrap();
        w.vdd_mut().ok = false;

        assert_eq!(w.write_byte(0x0100, 0x12), Err(FlashError::SupplyLow));
        assert_eq!(w.erase_page(0x0200), Err(FlashError::SupplyLow));
        assert_eq!(w.update(0x0200, &[1, 2]), Err(FlashError::SupplyLow));

        assert_eq!(w.read_byte(0x0100), Ok(0xFF));
        assert_eq!(w.read_byte(0x0200), Ok(0x00));
        assert_eq!(w.flash_mut().erases, 0);
        assert_eq!(w.flash_mut().programs, 1);
    }

    #[test]
    fn test_range_checks() {
        let mut w = writer(FlashGeometry::F99X);
        assert_eq!(w.write_byte(0x2000, 0), Err(FlashError::OutOfRange));
        assert_eq!(w.write_byte(0x1E00, 0), Err(FlashError::Reserved));
        assert_eq!(w.write(0x1DFF, &[0, 0]), Err(FlashError::Reserved));
        assert_eq!(w.erase_page(0x1E10), Err(FlashError::Reserved));
        assert_eq!(w.read_byte(0x1E00), Ok(0xFF));
        assert_eq!(w.read_byte(u32::MAX), Err(FlashError::OutOfRange));
    }

    #[test]
    fn test_rewrite_once_on_mismatch() {
        let mut w = writer(FlashGeometry::F99X);
        w.flash_mut().flaky = 1;
        assert_eq!(w.write_byte(0x0010, 0x3C), Ok(()));
        assert_eq!(w.flash_mut().programs, 2);

        w.flash_mut().flaky = 2;
        assert_eq!(w.write_byte(0x0011, 0x3C), Err(FlashError::VerifyFailed));
    }

    #[test]
    fn test_programmed_cell_fails_verify() {
        let mut w = writer(FlashGeometry::F99X);
        w.write_byte(0x0020, 0x0F).unwrap();
        // Bits can only be cleared without an erase
        assert_eq!(w.write_byte(0x0020, 0xF0), Err(FlashError::VerifyFailed));
    }

    #[test]
    fn test_update_preserves_page() {
        let mut w = writer(FlashGeometry::F99X);
        w.write(0x0400, &[1, 2, 3, 4]).unwrap();
        w.update(0x0401, &[9, 8]).unwrap();

        let mut buf = [0u8; 4];
        w.read(0x0400, &mut buf).unwrap();
        assert_eq!(buf, [1, 9, 8, 4]);
    }

    #[test]
    fn test_supply_drop_mid_update_leaves_page_erased() {
        let mut w = writer(FlashGeometry::F99X);
        w.write(0x0400, &[1, 2, 3, 4]).unwrap();
        // The up-front check, the erase and one reprogrammed byte pass
        w.vdd_mut().checks_left = Some(3);

        assert_eq!(w.update(0x0401, &[9, 8]), Err(FlashError::SupplyLow));
        let mut buf = [0u8; 4];
        w.read(0x0400, &mut buf).unwrap();
        assert_eq!(buf, [1, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_update_across_pages() {
        let mut w = writer(FlashGeometry::F99X);
        w.update(0x01FE, &[1, 2, 3, 4]).unwrap();
        let mut buf = [0u8; 4];
        w.read(0x01FE, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
        assert_eq!(w.flash_mut().erases, 2);
    }

    #[test]
    fn test_clear_and_copy() {
        let mut w = writer(FlashGeometry::F99X);
        w.write(0x0000, &[0x11, 0x22, 0x33]).unwrap();
        w.copy(0x0800, 0x0000, 3).unwrap();
        let mut buf = [0u8; 3];
        w.read(0x0800, &mut buf).unwrap();
        assert_eq!(buf, [0x11, 0x22, 0x33]);

        w.clear(0x0001, 1).unwrap();
        w.read(0x0000, &mut buf).unwrap();
        assert_eq!(buf, [0x11, 0xFF, 0x33]);

        assert_eq!(w.copy(0x0001, 0x0000, 3), Err(FlashError::Overlap));
    }

    #[test]
    fn test_copy_within_one_page() {
        let mut w = writer(FlashGeometry::F99X);
        w.write(0x0000, &[5, 6]).unwrap();
        w.copy(0x0010, 0x0000, 2).unwrap();
        assert_eq!(w.read_byte(0x0010), Ok(5));
        assert_eq!(w.read_byte(0x0011), Ok(6));
        assert_eq!(w.read_byte(0x0000), Ok(5));
    }

    #[test]
    fn test_banked_access() {
        let mut w = writer(FlashGeometry::F12X);
        w.write_byte(0x1_0005, 0x42).unwrap();
        w.write_byte(0x0_8005, 0x24).unwrap();
        assert_eq!(w.flash_mut().cells[0x1_0005], 0x42);
        assert_eq!(w.flash_mut().cells[0x0_8005], 0x24);
        assert_eq!(w.read_byte(0x1_0005), Ok(0x42));
        assert_eq!(w.read_byte(0x0_8005), Ok(0x24));
    }

    proptest! {
        #[test]
        fn prop_write_read(addr in 0u32..0x1D00, data in prop::collection::vec(any::<u8>(), 1..64)) {
            let mut w = writer(FlashGeometry::F99X);
            w.write(addr, &data).unwrap();
            let mut back = vec![0u8; data.len()];
            w.read(addr, &mut back).unwrap();
            prop_assert_eq!(back, data);
        }

        #[test]
        fn prop_update_overwrites_anything(
            addr in 0u32..0x1D00,
            first in prop::collection::vec(any::<u8>(), 1..64),
            second in prop::collection::vec(any::<u8>(), 1..64),
        ) {
            let mut w = writer(FlashGeometry::F99X);
            w.update(addr, &first).unwrap();
            w.update(addr, &second).unwrap();
            let mut back = vec![0u8; second.len()];
            w.read(addr, &mut back).unwrap();
            prop_assert_eq!(back, second);
        }
    }
}
