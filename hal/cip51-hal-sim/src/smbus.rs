//! SMBus0 slave model and bus master
//!
//! [`SimSmbus`] keeps the flags the slave ISR reads and writes. In the
//! nibble layout the status is `SMB0CN` itself; in the vector layout the
//! peripheral matches its own address (`SMB0ADR`) and publishes a code in
//! `SMB0STA`. [`SmbusMaster`] drives bus conditions into the model and
//! runs the ISR closure whenever `SI` is raised.

use cip51_hal::i2c::{wire_address, I2cBus};
use cip51_hal::smbus::{nibble, vector, SmbusSlave, StatusLayout};

use crate::error::SimError;

/// `SMB0CN` bit positions (nibble layout)
pub mod smb0cn {
    pub const MASTER: u8 = 1 << 7;
    pub const TXMODE: u8 = 1 << 6;
    pub const STA: u8 = 1 << 5;
    pub const STO: u8 = 1 << 4;
    pub const ACKRQ: u8 = 1 << 3;
    pub const ARBLOST: u8 = 1 << 2;
    pub const ACK: u8 = 1 << 1;
    pub const SI: u8 = 1 << 0;
}

/// SMBus0 peripheral in slave mode
#[derive(Debug)]
pub struct SimSmbus {
    layout: StatusLayout,
    /// Own address for vector-layout parts (`SMB0ADR`, 8-bit form)
    own_address: u8,
    /// Raw status code for the vector layout
    code: u8,
    master: bool,
    txmode: bool,
    sta: bool,
    sto: bool,
    ackrq: bool,
    arblost: bool,
    ack: bool,
    si: bool,
    enabled: bool,
    data: u8,
    resets: u32,
    interrupts: u32,
}

impl SimSmbus {
    /// Slave with software address matching (F3xx, F50x, F99x...)
    pub fn nibble() -> Self {
        Self::new(StatusLayout::Nibble, 0)
    }

    /// Slave with hardware address matching at `own_address` (F0xx, F12x)
    pub fn vector(own_address: u8) -> Self {
        Self::new(StatusLayout::Vector, own_address)
    }

    fn new(layout: StatusLayout, own_address: u8) -> Self {
        Self {
            layout,
            own_address,
            code: vector::SRSTOP,
            master: false,
            txmode: false,
            sta: false,
            sto: false,
            ackrq: false,
            arblost: false,
            ack: false,
            si: false,
            enabled: true,
            data: 0,
            resets: 0,
            interrupts: 0,
        }
    }

    /// Composite `SMB0CN` value
    pub fn smb0cn(&self) -> u8 {
        let mut value = 0;
        for (set, bit) in [
            (self.master, smb0cn::MASTER),
            (self.txmode, smb0cn::TXMODE),
            (self.sta, smb0cn::STA),
            (self.sto, smb0cn::STO),
            (self.ackrq, smb0cn::ACKRQ),
            (self.arblost, smb0cn::ARBLOST),
            (self.ack, smb0cn::ACK),
            (self.si, smb0cn::SI),
        ] {
            if set {
                value |= bit;
            }
        }
        value
    }

    /// `SMB0DAT`
    pub fn data(&self) -> u8 {
        self.data
    }

    pub fn interrupt_pending(&self) -> bool {
        self.si
    }

    /// Slave `ACK` bit, as it would be driven on the bus
    pub fn acking(&self) -> bool {
        self.ack
    }

    pub fn start_pending(&self) -> bool {
        self.sta
    }

    pub fn stop_pending(&self) -> bool {
        self.sto
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Number of disable/enable cycles performed by the ISR
    pub fn resets(&self) -> u32 {
        self.resets
    }

    /// Number of interrupts raised
    pub fn interrupts(&self) -> u32 {
        self.interrupts
    }

    /// START followed by an address byte; returns whether `SI` was raised
    pub fn bus_address(&mut self, address_byte: u8) -> bool {
        self.data = address_byte;
        self.txmode = false;
        self.sto = false;
        match self.layout {
            StatusLayout::Nibble => {
                self.sta = true;
                self.ackrq = true;
                self.raise();
                true
            }
            StatusLayout::Vector => {
                let matched = address_byte & 0xFE == self.own_address & 0xFE;
                self.code = match (address_byte, matched) {
                    (0x00, _) => vector::SRGADACK,
                    (_, true) if address_byte & 0x01 != 0 => vector::STOADACK,
                    (_, true) => vector::SROADACK,
                    _ => return false,
                };
                // Hardware ACKs its own address before the ISR runs
                self.ack = true;
                self.raise();
                true
            }
        }
    }

    /// Master writes a data byte
    pub fn bus_write(&mut self, byte: u8) {
        self.data = byte;
        self.sta = false;
        self.txmode = false;
        self.ackrq = true;
        self.code = vector::SRODBACK;
        self.raise();
    }

    /// Master clocks out the byte in `SMB0DAT` and answers ACK or NACK
    pub fn bus_read(&mut self, master_ack: bool) -> u8 {
        let byte = self.data;
        self.sta = false;
        self.txmode = true;
        self.ackrq = false;
        self.ack = master_ack;
        self.code = if master_ack {
            vector::STDBACK
        } else {
            vector::STDBNACK
        };
        self.raise();
        byte
    }

    /// STOP (or repeated START, which the vector layout reports the same way)
    pub fn bus_stop(&mut self) {
        self.sta = false;
        self.sto = true;
        self.ackrq = false;
        self.code = vector::SRSTOP;
        self.raise();
    }

    /// Raise `SI` with an arbitrary status, for undocumented-code handling
    pub fn inject_status(&mut self, status: u8) {
        match self.layout {
            StatusLayout::Nibble => {
                self.master = status & smb0cn::MASTER != 0;
                self.txmode = status & smb0cn::TXMODE != 0;
                self.sta = status & smb0cn::STA != 0;
                self.sto = status & smb0cn::STO != 0;
            }
            StatusLayout::Vector => self.code = status,
        }
        self.raise();
    }

    /// Raise `SI` with `ARBLOST` set
    pub fn inject_arbitration_lost(&mut self) {
        self.arblost = true;
        self.raise();
    }

    fn raise(&mut self) {
        self.si = true;
        self.interrupts += 1;
        log::trace!("smbus SI: cn={:#04x} code={:#04x} dat={:#04x}", self.smb0cn(), self.code, self.data);
    }
}

impl SmbusSlave for SimSmbus {
    fn layout(&self) -> StatusLayout {
        self.layout
    }

    fn read_status(&mut self) -> u8 {
        match self.layout {
            StatusLayout::Nibble => self.smb0cn(),
            StatusLayout::Vector => self.code,
        }
    }

    fn arbitration_lost(&mut self) -> bool {
        self.layout == StatusLayout::Nibble && self.arblost
    }

    fn ack_received(&mut self) -> bool {
        self.ack
    }

    fn read_data(&mut self) -> u8 {
        self.data
    }

    fn write_data(&mut self, byte: u8) {
        self.data = byte;
    }

    fn ack(&mut self, ack: bool) {
        self.ack = ack;
        self.ackrq = false;
    }

    fn clear_start(&mut self) {
        self.sta = false;
    }

    fn clear_stop(&mut self) {
        self.sto = false;
    }

    fn clear_interrupt(&mut self) {
        self.si = false;
        self.arblost = false;
    }

    fn reset(&mut self) {
        // Disabling SMB0 drops every bus-state flag; SI stays for the ISR
        self.enabled = false;
        self.master = false;
        self.txmode = false;
        self.sta = false;
        self.sto = false;
        self.ackrq = false;
        self.arblost = false;
        self.ack = false;
        self.code = vector::SRSTOP;
        self.enabled = true;
        self.resets += 1;
        log::debug!("smbus reset #{}", self.resets);
    }
}

/// Bus master driving a [`SimSmbus`] and its interrupt handler
pub struct SmbusMaster<F> {
    slave: SimSmbus,
    isr: F,
}

impl<F: FnMut(&mut SimSmbus)> SmbusMaster<F> {
    pub fn new(slave: SimSmbus, isr: F) -> Self {
        Self { slave, isr }
    }

    pub fn slave(&self) -> &SimSmbus {
        &self.slave
    }

    pub fn slave_mut(&mut self) -> &mut SimSmbus {
        &mut self.slave
    }

    pub fn into_slave(self) -> SimSmbus {
        self.slave
    }

    /// Run the ISR if `SI` is set and check it was cleared
    pub fn service(&mut self) -> Result<(), SimError> {
        if self.slave.interrupt_pending() {
            (self.isr)(&mut self.slave);
            if self.slave.interrupt_pending() {
                return Err(SimError::InterruptNotCleared);
            }
        }
        Ok(())
    }

    fn address(&mut self, address: u8, read: bool) -> Result<(), SimError> {
        let raised = self.slave.bus_address(wire_address(address, read));
        if !raised {
            return Err(SimError::Nack);
        }
        self.service()?;
        if self.slave.acking() {
            Ok(())
        } else {
            Err(SimError::Nack)
        }
    }

    fn stop(&mut self) -> Result<(), SimError> {
        self.slave.bus_stop();
        self.service()
    }

    fn write_phase(&mut self, address: u8, data: &[u8]) -> Result<(), SimError> {
        self.address(address, false)?;
        for &byte in data {
            self.slave.bus_write(byte);
            self.service()?;
            if !self.slave.acking() {
                return Err(SimError::Nack);
            }
        }
        Ok(())
    }

    fn read_phase(&mut self, address: u8, buf: &mut [u8]) -> Result<(), SimError> {
        self.address(address, true)?;
        let last = buf.len().saturating_sub(1);
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.slave.bus_read(i != last);
            self.service()?;
        }
        Ok(())
    }

    /// Finish a transfer with STOP whether or not it succeeded
    fn finish(&mut self, result: Result<(), SimError>) -> Result<(), SimError> {
        let stop = self.stop();
        result.and(stop)
    }
}

impl<F: FnMut(&mut SimSmbus)> I2cBus for SmbusMaster<F> {
    type Error = SimError;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), SimError> {
        log::trace!("smbus master write {:#04x} {:02x?}", address, data);
        let result = self.write_phase(address, data);
        self.finish(result)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), SimError> {
        let result = self.read_phase(address, buf);
        log::trace!("smbus master read {:#04x} {:02x?}", address, buf);
        self.finish(result)
    }

    fn write_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<(), SimError> {
        let result = self.write_phase(address, write);
        if let Err(err) = result {
            return self.finish(Err(err));
        }
        // Repeated START: the slave sees the end of the write transfer
        self.stop()?;
        let result = self.read_phase(address, read);
        self.finish(result)
    }
}
