//! Captured UART transmitter and scripted receiver

use std::collections::VecDeque;
use std::convert::Infallible;

use cip51_hal::uart::{UartRx, UartTx};

use crate::error::SimError;

/// UART0 whose transmitted bytes are kept for inspection
///
/// Received bytes come from a queue filled with [`SimUart::push_rx`].
#[derive(Debug, Default)]
pub struct SimUart {
    tx: Vec<u8>,
    rx: VecDeque<u8>,
}

impl SimUart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything transmitted so far
    pub fn bytes(&self) -> &[u8] {
        &self.tx
    }

    /// Transmitted text, with invalid UTF-8 replaced
    pub fn transcript(&self) -> String {
        String::from_utf8_lossy(&self.tx).into_owned()
    }

    /// Transmitted text split on CR LF
    pub fn lines(&self) -> Vec<String> {
        self.transcript()
            .split("\r\n")
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect()
    }

    pub fn clear(&mut self) {
        self.tx.clear();
    }

    /// Queue bytes as if a terminal had typed them
    pub fn push_rx(&mut self, data: &[u8]) {
        self.rx.extend(data);
    }

    /// Bytes received but not yet read
    pub fn rx_pending(&self) -> usize {
        self.rx.len()
    }
}

impl UartTx for SimUart {
    type Error = Infallible;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Infallible> {
        log::trace!("uart tx {:?}", String::from_utf8_lossy(data));
        self.tx.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

impl UartRx for SimUart {
    type Error = SimError;

    /// Fills `buf` from the queue; running dry stands in for blocking forever
    fn read_blocking(&mut self, buf: &mut [u8]) -> Result<usize, SimError> {
        if self.rx.len() < buf.len() {
            return Err(SimError::RxEmpty);
        }
        let n = buf.len();
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(buf.len())
    }
}
