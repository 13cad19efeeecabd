//! SPI command slave
//!
//! The master drives the slave's LED, writes and reads back a single data
//! byte, then writes and reads back the whole buffer, once per cycle.

use cip51_core::dispatch::spi::command;
use cip51_core::dispatch::{SpiShared, SpiSlaveDispatcher, SpiUpdate};
use cip51_core::report::StatusLine;
use cip51_hal::spi::SpiBus;
use cip51_hal_sim::{SimPin, SimSpi, SimUart, SpiMaster};

use crate::{emit, expect_byte, Demo, DemoConfig, DemoError, DemoReport};

/// Slave buffer capacity; `spi.buffer_len` beyond this is clamped
pub const BUFFER_CAPACITY: usize = 32;

pub fn run(config: &DemoConfig, cycles: u32) -> Result<DemoReport, DemoError> {
    config.spi.validate()?;
    let len = (config.spi.buffer_len as usize).min(BUFFER_CAPACITY);
    let mut uart = SimUart::new();

    let led = SimPin::new(false);
    let shared: SpiShared<BUFFER_CAPACITY> = SpiShared::new();
    let mut dispatcher = SpiSlaveDispatcher::new(config.spi, led.clone(), &shared);
    let mut master = SpiMaster::new(SimSpi::new(), |hw: &mut SimSpi| {
        let outcome = dispatcher.on_interrupt(hw);
        log::trace!("spi isr: {:?}", outcome);
    });
    let budget = config.poll_budget;

    for cycle in 0..cycles {
        for (opcode, on) in [(command::LED_ON, true), (command::LED_OFF, false)] {
            master.exchange(opcode)?;
            if shared.updates.poll_take(budget, || {})? != SpiUpdate::Led(on) || led.level() != on {
                return Err(DemoError::Unexpected("LED did not follow the command"));
            }
        }
        emit(&mut uart, StatusLine::format(format_args!("SPI LED: toggled")))?;

        let value = 0xA0 ^ cycle as u8;
        master.write(&[command::WRITE, value])?;
        match shared.updates.poll_take(budget, || {})? {
            SpiUpdate::Data(byte) => expect_byte(value, byte)?,
            _ => return Err(DemoError::Unexpected("no data update after WRITE")),
        }
        // The byte loaded for READ shifts out on the following dummy
        master.exchange(command::READ)?;
        let echo = master.exchange(0xFF)?;
        expect_byte(value, echo)?;
        emit(&mut uart, StatusLine::byte("SPI data", echo))?;

        let mut frame = [0u8; BUFFER_CAPACITY + 1];
        frame[0] = command::WRITE_BUFFER;
        for (i, byte) in frame[1..=len].iter_mut().enumerate() {
            *byte = (cycle as u8).wrapping_mul(0x10).wrapping_add(i as u8);
        }
        master.write(&frame[..=len])?;
        if shared.updates.poll_take(budget, || {})? != SpiUpdate::Buffer {
            return Err(DemoError::Unexpected("no buffer update after WRITE_BUFFER"));
        }

        master.exchange(command::READ_BUFFER)?;
        let mut readback = [0u8; BUFFER_CAPACITY];
        master.read(&mut readback[..len])?;
        for (&expected, &actual) in frame[1..=len].iter().zip(&readback[..len]) {
            expect_byte(expected, actual)?;
        }
        emit(
            &mut uart,
            StatusLine::format(format_args!("SPI buffer: {} bytes ok", len)),
        )?;
    }

    let interrupts = master.slave().transfers();
    Ok(DemoReport::new(
        Demo::SpiCommand,
        &uart,
        interrupts,
        shared.error_count(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_sequence() {
        let report = run(&DemoConfig::default(), 2).unwrap();
        assert_eq!(
            report.lines,
            [
                "SPI LED: toggled",
                "SPI data: 0xA0",
                "SPI buffer: 8 bytes ok",
                "SPI LED: toggled",
                "SPI data: 0xA1",
                "SPI buffer: 8 bytes ok",
            ]
        );
        assert_eq!(report.errors, 0);
    }

    #[test]
    fn test_buffer_clamped_to_capacity() {
        let mut config = DemoConfig::default();
        config.spi.buffer_len = 200;
        let report = run(&config, 1).unwrap();
        assert_eq!(report.lines[2], "SPI buffer: 32 bytes ok");
    }

    #[test]
    fn test_single_byte_buffer() {
        let mut config = DemoConfig::default();
        config.spi.buffer_len = 1;
        let report = run(&config, 1).unwrap();
        assert_eq!(report.lines[2], "SPI buffer: 1 bytes ok");
    }
}
