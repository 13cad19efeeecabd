//! SPI0 slave model and bus master
//!
//! Each exchange shifts one byte each way. The slave shifts out whatever
//! its ISR loaded into `SPI0DAT` during the previous interrupt; if nothing
//! was loaded, the shift register still holds the last byte received.

use cip51_hal::spi::{SpiBus, SpiSlave, SpiStatus};

use crate::error::SimError;

/// SPI0 peripheral in slave mode
#[derive(Debug, Default)]
pub struct SimSpi {
    rx: u8,
    tx: Option<u8>,
    spif: bool,
    wcol: bool,
    rxovrn: bool,
    modf: bool,
    transfers: u64,
}

impl SimSpi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Master clocks one byte; returns the byte the slave shifted out
    pub fn bus_exchange(&mut self, mosi: u8) -> u8 {
        let miso = self.tx.take().unwrap_or(self.rx);
        if self.spif {
            // Previous byte never read
            self.rxovrn = true;
        }
        self.rx = mosi;
        self.spif = true;
        self.transfers += 1;
        log::trace!("spi mosi={:#04x} miso={:#04x}", mosi, miso);
        miso
    }

    /// Set `WCOL` as if `SPI0DAT` had been written mid-transfer
    pub fn inject_write_collision(&mut self) {
        self.wcol = true;
    }

    pub fn interrupt_pending(&self) -> bool {
        self.spif
    }

    /// Byte waiting to be shifted out on the next exchange
    pub fn loaded(&self) -> Option<u8> {
        self.tx
    }

    pub fn transfers(&self) -> u64 {
        self.transfers
    }
}

impl SpiSlave for SimSpi {
    fn status(&mut self) -> SpiStatus {
        SpiStatus {
            write_collision: self.wcol,
            receive_overrun: self.rxovrn,
            mode_fault: self.modf,
        }
    }

    fn read_data(&mut self) -> u8 {
        self.rx
    }

    fn write_data(&mut self, byte: u8) {
        self.tx = Some(byte);
    }

    fn clear_errors(&mut self) {
        self.wcol = false;
        self.rxovrn = false;
        self.modf = false;
    }

    fn clear_interrupt(&mut self) {
        self.spif = false;
    }
}

/// SPI master wired to a [`SimSpi`] slave and its interrupt handler
pub struct SpiMaster<F> {
    slave: SimSpi,
    isr: F,
}

impl<F: FnMut(&mut SimSpi)> SpiMaster<F> {
    pub fn new(slave: SimSpi, isr: F) -> Self {
        Self { slave, isr }
    }

    pub fn slave(&self) -> &SimSpi {
        &self.slave
    }

    pub fn slave_mut(&mut self) -> &mut SimSpi {
        &mut self.slave
    }

    /// Exchange one byte and let the slave ISR run
    pub fn exchange(&mut self, mosi: u8) -> Result<u8, SimError> {
        let miso = self.slave.bus_exchange(mosi);
        (self.isr)(&mut self.slave);
        if self.slave.interrupt_pending() {
            return Err(SimError::InterruptNotCleared);
        }
        Ok(miso)
    }

    /// Exchange one byte without servicing the slave (provokes overrun)
    pub fn exchange_unserviced(&mut self, mosi: u8) -> u8 {
        self.slave.bus_exchange(mosi)
    }
}

impl<F: FnMut(&mut SimSpi)> SpiBus for SpiMaster<F> {
    type Error = SimError;

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), SimError> {
        let len = read.len().max(write.len());
        for i in 0..len {
            let miso = self.exchange(write.get(i).copied().unwrap_or(0xFF))?;
            if let Some(slot) = read.get_mut(i) {
                *slot = miso;
            }
        }
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), SimError> {
        for &byte in data {
            self.exchange(byte)?;
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), SimError> {
        for slot in buf.iter_mut() {
            *slot = self.exchange(0xFF)?;
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, data: &mut [u8]) -> Result<(), SimError> {
        for slot in data.iter_mut() {
            *slot = self.exchange(*slot)?;
        }
        Ok(())
    }
}
