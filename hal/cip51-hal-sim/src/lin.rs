//! LIN0 slave model and bus master
//!
//! A frame is a header (break, sync, protected identifier) from the master
//! followed by a response from whichever node publishes that identifier.
//! The model raises `DTREQ` after the header and `DONE` (or `ERROR`) after
//! the response, running the ISR closure each time.

use cip51_hal::lin::{
    checksum, error_bits, protected_id, status_bits, unprotect_id, ChecksumKind, LinErrors,
    LinSlave, LinStatus, ResponseDirection, MAX_DATA_LEN,
};

use crate::error::SimError;

/// Response setup written by the ISR after `DTREQ`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseSetup {
    pub direction: ResponseDirection,
    pub len: u8,
    pub checksum: ChecksumKind,
}

/// LIN0 controller in slave mode
#[derive(Debug, Default)]
pub struct SimLin {
    status: u8,
    errors: u8,
    id: u8,
    data: [u8; MAX_DATA_LEN],
    response: Option<ResponseSetup>,
    dtack: bool,
    stopped: bool,
    frames: u32,
    resets: u32,
}

impl SimLin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt_pending(&self) -> bool {
        self.status & status_bits::INTREQ != 0
    }

    /// Data registers `LIN0DT1..LIN0DT8`
    pub fn data(&self) -> &[u8; MAX_DATA_LEN] {
        &self.data
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Number of disable/enable cycles performed by the ISR
    pub fn resets(&self) -> u32 {
        self.resets
    }

    /// Header received; `pid` carries the parity bits
    fn bus_header(&mut self, pid: u8) {
        self.response = None;
        self.dtack = false;
        self.stopped = false;
        self.frames += 1;
        match unprotect_id(pid) {
            Some(id) => {
                self.id = id;
                self.raise(status_bits::DTREQ);
            }
            None => self.raise_error(error_bits::PRTYERR),
        }
    }

    /// Response field finished without error
    fn bus_done(&mut self) {
        self.raise(status_bits::DONE);
    }

    /// Raise `ERROR` with the given `LIN0ERR` bits
    pub fn raise_error(&mut self, errors: u8) {
        self.errors |= errors;
        self.raise(status_bits::ERROR);
    }

    /// Raise `WAKEUP`
    pub fn raise_wakeup(&mut self) {
        self.raise(status_bits::WAKEUP);
    }

    /// Raise an interrupt with arbitrary `LIN0ST` bits
    pub fn inject_status(&mut self, bits: u8) {
        self.raise(bits);
    }

    fn raise(&mut self, bits: u8) {
        self.status = bits | status_bits::INTREQ;
        log::trace!("lin status={:#04x} id={:#04x}", self.status, self.id);
    }
}

impl LinSlave for SimLin {
    fn read_status(&mut self) -> LinStatus {
        LinStatus(self.status)
    }

    fn read_id(&mut self) -> u8 {
        self.id
    }

    fn read_errors(&mut self) -> LinErrors {
        LinErrors(self.errors)
    }

    fn set_response(&mut self, direction: ResponseDirection, len: u8, checksum: ChecksumKind) {
        self.response = Some(ResponseSetup {
            direction,
            len: len.min(MAX_DATA_LEN as u8),
            checksum,
        });
    }

    fn write_data(&mut self, index: usize, byte: u8) {
        if let Some(slot) = self.data.get_mut(index) {
            *slot = byte;
        }
    }

    fn read_data(&mut self, index: usize) -> u8 {
        self.data.get(index).copied().unwrap_or(0)
    }

    fn ack_data_request(&mut self) {
        self.dtack = true;
    }

    fn stop_rx(&mut self) {
        self.stopped = true;
    }

    fn clear_interrupt(&mut self) {
        self.status = 0;
        self.errors = 0;
    }

    fn reset(&mut self) {
        self.response = None;
        self.dtack = false;
        self.stopped = false;
        self.errors = 0;
        self.resets += 1;
        log::debug!("lin reset #{}", self.resets);
    }
}

/// LIN master node wired to one [`SimLin`] slave
pub struct LinMaster<F> {
    slave: SimLin,
    isr: F,
    checksum: ChecksumKind,
}

impl<F: FnMut(&mut SimLin)> LinMaster<F> {
    pub fn new(slave: SimLin, checksum: ChecksumKind, isr: F) -> Self {
        Self {
            slave,
            isr,
            checksum,
        }
    }

    pub fn slave(&self) -> &SimLin {
        &self.slave
    }

    pub fn slave_mut(&mut self) -> &mut SimLin {
        &mut self.slave
    }

    /// Run the ISR if an interrupt is pending and check it was cleared
    pub fn service(&mut self) -> Result<(), SimError> {
        if self.slave.interrupt_pending() {
            (self.isr)(&mut self.slave);
            if self.slave.interrupt_pending() {
                return Err(SimError::InterruptNotCleared);
            }
        }
        Ok(())
    }

    /// Master publishes `data` on `id` (e.g. an LED command)
    ///
    /// Returns whether the slave subscribed to the frame.
    pub fn send_frame(&mut self, id: u8, data: &[u8]) -> Result<bool, SimError> {
        if data.len() > MAX_DATA_LEN {
            return Err(SimError::TooLong);
        }
        let pid = protected_id(id);
        self.slave.bus_header(pid);
        self.service()?;

        let setup = match self.slave.response {
            Some(setup)
                if self.slave.dtack
                    && !self.slave.stopped
                    && setup.direction == ResponseDirection::Receive =>
            {
                setup
            }
            _ => return Ok(false),
        };

        let sent = checksum(self.checksum, pid, data);
        let len = data.len().min(setup.len as usize);
        self.slave.data[..len].copy_from_slice(&data[..len]);
        let expected = checksum(setup.checksum, pid, &data[..len]);
        if len == data.len() && sent == expected {
            self.slave.bus_done();
        } else {
            self.slave.raise_error(error_bits::CHKERR);
        }
        self.service()?;
        log::trace!("lin frame {:#04x} -> {:02x?}", id, data);
        Ok(true)
    }

    /// Master sends a header and collects the slave's response (e.g. a
    /// switch query)
    pub fn request_frame(&mut self, id: u8) -> Result<Vec<u8>, SimError> {
        let pid = protected_id(id);
        self.slave.bus_header(pid);
        self.service()?;

        let setup = match self.slave.response {
            Some(setup)
                if self.slave.dtack
                    && !self.slave.stopped
                    && setup.direction == ResponseDirection::Transmit =>
            {
                setup
            }
            _ => return Err(SimError::NoResponse),
        };

        let response = self.slave.data[..setup.len as usize].to_vec();
        let sent = checksum(setup.checksum, pid, &response);
        self.slave.bus_done();
        self.service()?;

        if sent != checksum(self.checksum, pid, &response) {
            return Err(SimError::Checksum);
        }
        log::trace!("lin frame {:#04x} <- {:02x?}", id, response);
        Ok(response)
    }

    /// Send a header whose parity bits are wrong
    pub fn send_corrupt_header(&mut self, id: u8) -> Result<(), SimError> {
        self.slave.bus_header(protected_id(id) ^ 0x40);
        self.service()
    }
}
