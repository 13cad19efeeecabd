//! CAN0 message-object model and a two-node bus
//!
//! Transmit requests queue frames in the sending node; [`CanBus::exchange`]
//! delivers them to every receive object whose identifier matches,
//! setting `TXOK` / `RXOK` and latching object interrupts the way the
//! C_CAN core does. `CAN0IID` reports the status interrupt first, then the
//! lowest-numbered pending object.

use std::collections::BTreeSet;

use cip51_hal::can::{
    CanController, CanStatus, InterruptSource, MessageObjectConfig, ObjectDirection,
    CAN_STATUS_INTERRUPT, MAX_DLC, MESSAGE_OBJECTS, STANDARD_ID_MASK,
};

use crate::error::SimError;

const TXOK: u8 = 1 << 3;
const RXOK: u8 = 1 << 4;
const BOFF: u8 = 1 << 7;

/// A frame on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    pub id: u16,
    pub dlc: u8,
    pub data: [u8; MAX_DLC],
}

impl CanFrame {
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.dlc as usize]
    }
}

#[derive(Debug, Clone, Copy)]
struct MessageObject {
    config: MessageObjectConfig,
    data: [u8; MAX_DLC],
    dlc: u8,
}

/// CAN0 controller
#[derive(Debug)]
pub struct SimCan {
    objects: [Option<MessageObject>; MESSAGE_OBJECTS as usize],
    status: u8,
    status_pending: bool,
    pending: BTreeSet<u8>,
    outbox: Vec<(u8, CanFrame)>,
    restarts: u32,
}

impl Default for SimCan {
    fn default() -> Self {
        Self::new()
    }
}

impl SimCan {
    pub fn new() -> Self {
        Self {
            objects: [None; MESSAGE_OBJECTS as usize],
            status: 0,
            status_pending: false,
            pending: BTreeSet::new(),
            outbox: Vec::new(),
            restarts: 0,
        }
    }

    /// Any interrupt source pending
    pub fn interrupt_pending(&self) -> bool {
        self.status_pending || !self.pending.is_empty()
    }

    /// Frames queued but not yet on the bus
    pub fn queued(&self) -> usize {
        self.outbox.len()
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    pub fn is_bus_off(&self) -> bool {
        self.status & BOFF != 0
    }

    /// Enter bus-off as if the error counters had overflowed
    pub fn force_bus_off(&mut self) {
        self.status |= BOFF;
        self.status_pending = true;
        log::debug!("can: bus-off");
    }

    fn slot(&self, object: u8) -> Result<usize, SimError> {
        if (1..=MESSAGE_OBJECTS).contains(&object) {
            Ok(object as usize - 1)
        } else {
            Err(SimError::InvalidObject(object))
        }
    }

    /// Offer a frame to every matching receive object
    fn accept(&mut self, frame: &CanFrame) -> bool {
        let mut accepted = false;
        for (i, slot) in self.objects.iter_mut().enumerate() {
            let Some(object) = slot else { continue };
            if object.config.direction != ObjectDirection::Receive || object.config.id != frame.id {
                continue;
            }
            object.data = frame.data;
            object.dlc = frame.dlc;
            if object.config.interrupt {
                self.pending.insert(i as u8 + 1);
            }
            accepted = true;
        }
        if accepted {
            self.status |= RXOK;
        }
        accepted
    }

    /// Mark a queued transmission as sent
    fn complete(&mut self, object: u8) {
        self.status |= TXOK;
        let interrupt = self
            .slot(object)
            .ok()
            .and_then(|i| self.objects[i])
            .map(|o| o.config.interrupt)
            .unwrap_or(false);
        if interrupt {
            self.pending.insert(object);
        }
    }
}

impl CanController for SimCan {
    type Error = SimError;

    fn interrupt_source(&mut self) -> InterruptSource {
        if self.status_pending {
            return InterruptSource::from_iid(CAN_STATUS_INTERRUPT);
        }
        match self.pending.first() {
            Some(&object) => InterruptSource::from_iid(object as u16),
            None => InterruptSource::None,
        }
    }

    fn status(&mut self) -> CanStatus {
        self.status_pending = false;
        let status = CanStatus(self.status);
        // TXOK and RXOK clear on read
        self.status &= !(TXOK | RXOK);
        status
    }

    fn configure_object(&mut self, object: u8, config: MessageObjectConfig) -> Result<(), SimError> {
        let slot = self.slot(object)?;
        if config.id & !STANDARD_ID_MASK != 0 {
            return Err(SimError::InvalidId(config.id));
        }
        if config.dlc as usize > MAX_DLC {
            return Err(SimError::TooLong);
        }
        self.objects[slot] = Some(MessageObject {
            config,
            data: [0; MAX_DLC],
            dlc: 0,
        });
        Ok(())
    }

    fn transmit(&mut self, object: u8, data: &[u8]) -> Result<(), SimError> {
        let slot = self.slot(object)?;
        let config = match self.objects[slot] {
            Some(o) if o.config.direction == ObjectDirection::Transmit => o.config,
            _ => return Err(SimError::NotConfigured(object)),
        };
        if data.len() > MAX_DLC {
            return Err(SimError::TooLong);
        }
        let mut frame = CanFrame {
            id: config.id,
            dlc: data.len() as u8,
            data: [0; MAX_DLC],
        };
        frame.data[..data.len()].copy_from_slice(data);
        self.outbox.push((object, frame));
        Ok(())
    }

    fn read_object(&mut self, object: u8, buf: &mut [u8]) -> Result<usize, SimError> {
        let slot = self.slot(object)?;
        let stored = match self.objects[slot].as_mut() {
            Some(o) if o.config.direction == ObjectDirection::Receive => o,
            _ => return Err(SimError::NotConfigured(object)),
        };
        let len = (stored.dlc as usize).min(buf.len());
        buf[..len].copy_from_slice(&stored.data[..len]);
        Ok(stored.dlc as usize)
    }

    fn clear_pending(&mut self, object: u8) {
        self.pending.remove(&object);
    }

    fn restart(&mut self) {
        self.status &= !BOFF;
        self.outbox.clear();
        self.restarts += 1;
    }
}

/// The wire between simulated nodes
#[derive(Debug, Default)]
pub struct CanBus {
    delivered: u64,
}

impl CanBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames that reached at least one receiver
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Put every queued frame of both nodes on the bus
    ///
    /// A bus-off node transmits nothing and keeps its queue. Frames that
    /// nobody accepts are still acknowledged and count as sent.
    pub fn exchange(&mut self, a: &mut SimCan, b: &mut SimCan) -> usize {
        self.send_all(a, b) + self.send_all(b, a)
    }

    fn send_all(&mut self, from: &mut SimCan, to: &mut SimCan) -> usize {
        if from.is_bus_off() {
            return 0;
        }
        let mut count = 0;
        for (object, frame) in std::mem::take(&mut from.outbox) {
            log::trace!("can id={:#05x} data={:02x?}", frame.id, frame.payload());
            if to.accept(&frame) {
                self.delivered += 1;
                count += 1;
            }
            from.complete(object);
        }
        count
    }
}
