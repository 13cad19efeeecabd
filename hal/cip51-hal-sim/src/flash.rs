//! Flash array and VDD monitor models
//!
//! Erased cells read `0xFF` and programming can only clear bits, so a
//! byte written over non-erased flash comes back as the AND of both. On
//! banked parts `PSBANK` selects which 32KB bank appears at `0x8000`.

use cip51_hal::flash::{FlashCore, FlashGeometry, VddMonitor};

/// Flash array of one part
#[derive(Debug)]
pub struct SimFlash {
    geometry: FlashGeometry,
    cells: Vec<u8>,
    bank: u8,
    fail_programs: u32,
    programs: u64,
    erases: u64,
}

impl SimFlash {
    pub fn new(geometry: FlashGeometry) -> Self {
        Self {
            geometry,
            cells: vec![0xFF; geometry.size as usize],
            bank: 1,
            fail_programs: 0,
            programs: 0,
            erases: 0,
        }
    }

    /// Raw array contents by linear address
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Make the next `count` program operations leave the cell untouched
    pub fn fail_next_programs(&mut self, count: u32) {
        self.fail_programs = count;
    }

    pub fn programs(&self) -> u64 {
        self.programs
    }

    pub fn erases(&self) -> u64 {
        self.erases
    }

    pub fn bank(&self) -> u8 {
        self.bank
    }

    fn linear(&self, offset: u16) -> usize {
        if self.geometry.is_banked() && offset >= 0x8000 {
            (self.bank as usize) << 15 | (offset as usize & 0x7FFF)
        } else {
            offset as usize
        }
    }
}

impl FlashCore for SimFlash {
    fn geometry(&self) -> FlashGeometry {
        self.geometry
    }

    fn select_bank(&mut self, bank: u8) {
        self.bank = bank;
    }

    fn read_byte(&mut self, offset: u16) -> u8 {
        let index = self.linear(offset);
        self.cells.get(index).copied().unwrap_or(0xFF)
    }

    fn program_byte(&mut self, offset: u16, byte: u8) {
        self.programs += 1;
        if self.fail_programs > 0 {
            self.fail_programs -= 1;
            log::debug!("flash: dropped program at {:#06x}", offset);
            return;
        }
        let index = self.linear(offset);
        if let Some(cell) = self.cells.get_mut(index) {
            *cell &= byte;
        }
    }

    fn erase_page(&mut self, offset: u16) {
        self.erases += 1;
        let page = self.geometry.page_size as usize;
        let start = self.linear(offset);
        let start = start - start % page;
        let end = (start + page).min(self.cells.len());
        if let Some(cells) = self.cells.get_mut(start..end) {
            cells.fill(0xFF);
        }
        log::trace!("flash: erased page {:#07x}", start);
    }
}

/// VDD supply monitor (`VDM0CN`, `RSTSRC.PORSF`)
#[derive(Debug)]
pub struct SimVdd {
    ok: bool,
    enabled: bool,
    reset_source: bool,
}

impl Default for SimVdd {
    fn default() -> Self {
        Self::new()
    }
}

impl SimVdd {
    /// Supply above threshold, monitor off
    pub fn new() -> Self {
        Self {
            ok: true,
            enabled: false,
            reset_source: false,
        }
    }

    /// Drop or restore the supply
    pub fn set_supply_ok(&mut self, ok: bool) {
        self.ok = ok;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn reset_source(&self) -> bool {
        self.reset_source
    }
}

impl VddMonitor for SimVdd {
    fn enable(&mut self) {
        self.enabled = true;
    }

    fn enable_reset_source(&mut self) {
        self.reset_source = true;
    }

    fn is_supply_ok(&mut self) -> bool {
        // Only meaningful once the monitor is running
        self.enabled && self.ok
    }
}
