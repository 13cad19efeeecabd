//! SMBus slave echo
//!
//! The master writes one byte; the slave keeps it in its holder and hands
//! it back on the next read. Runs once on each status layout.

use cip51_core::dispatch::{SmbusShared, SmbusSlaveDispatcher};
use cip51_core::report::StatusLine;
use cip51_hal::i2c::I2cBus;
use cip51_hal_sim::{SimSmbus, SimUart, SmbusMaster};

use crate::{emit, expect_byte, Demo, DemoConfig, DemoError, DemoReport};

/// First byte the master writes; later cycles count up from here
const FIRST_BYTE: u8 = 0x42;

pub fn run(config: &DemoConfig, cycles: u32) -> Result<DemoReport, DemoError> {
    config.smbus.validate()?;
    let address = config.smbus.address >> 1;
    let mut uart = SimUart::new();
    let mut interrupts = 0;
    let mut errors = 0;

    let parts = [
        ("nibble", SimSmbus::nibble()),
        ("vector", SimSmbus::vector(config.smbus.address)),
    ];
    for (layout, hw) in parts {
        log::info!("smbus: {} status layout", layout);
        let shared = SmbusShared::new();
        let mut dispatcher = SmbusSlaveDispatcher::new(config.smbus, &shared);
        let mut master = SmbusMaster::new(hw, |hw: &mut SimSmbus| {
            let outcome = dispatcher.on_interrupt(hw);
            log::trace!("smbus isr: {:?}", outcome);
        });

        for cycle in 0..cycles {
            let sent = FIRST_BYTE.wrapping_add(cycle as u8);
            master.write(address, &[sent])?;
            let received = shared.received.poll_take(config.poll_budget, || {})?;
            expect_byte(sent, received)?;
            emit(&mut uart, StatusLine::byte("SMBus RX", received))?;

            let mut echo = [0u8; 1];
            master.read(address, &mut echo)?;
            expect_byte(sent, echo[0])?;
            emit(&mut uart, StatusLine::byte("SMBus TX", echo[0]))?;
        }

        interrupts += master.slave().interrupts() as u64;
        errors += shared.error_count();
    }

    Ok(DemoReport::new(Demo::SmbusEcho, &uart, interrupts, errors))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_on_both_layouts() {
        let report = run(&DemoConfig::default(), 2).unwrap();
        assert_eq!(
            report.lines,
            [
                "SMBus RX: 0x42",
                "SMBus TX: 0x42",
                "SMBus RX: 0x43",
                "SMBus TX: 0x43",
                "SMBus RX: 0x42",
                "SMBus TX: 0x42",
                "SMBus RX: 0x43",
                "SMBus TX: 0x43",
            ]
        );
        assert_eq!(report.errors, 0);
        assert!(report.interrupts > 0);
    }

    #[test]
    fn test_other_address() {
        let mut config = DemoConfig::default();
        config.smbus.address = 0x84;
        let report = run(&config, 1).unwrap();
        assert_eq!(report.lines.len(), 4);
    }

    #[test]
    fn test_undocumented_status_resets_model() {
        use cip51_core::dispatch::{SmbusOutcome, SmbusState};
        use cip51_hal::smbus::vector;

        let config = DemoConfig::default();
        for (hw, code) in [
            (SimSmbus::nibble(), 0xC0),
            (SimSmbus::vector(config.smbus.address), vector::BUS_ERROR),
        ] {
            let shared = SmbusShared::new();
            let mut dispatcher = SmbusSlaveDispatcher::new(config.smbus, &shared);
            let mut last = None;
            let mut master = SmbusMaster::new(hw, |hw: &mut SimSmbus| {
                last = Some(dispatcher.on_interrupt(hw));
            });

            master.slave_mut().inject_status(code);
            master.service().unwrap();
            let slave = master.slave();
            assert_eq!(slave.resets(), 1);
            assert!(slave.enabled());
            assert!(!slave.start_pending());
            assert!(!slave.stop_pending());
            assert!(!slave.acking());
            assert!(!slave.interrupt_pending());

            // The next transfer goes through as normal
            master.write(config.smbus.address >> 1, &[0x5A]).unwrap();
            drop(master);
            assert_eq!(last, Some(SmbusOutcome::Stopped));
            assert_eq!(dispatcher.state(), SmbusState::Idle);
            assert_eq!(shared.holder.get(), 0x5A);
            assert_eq!(shared.error_count(), 1);
        }
    }

    #[test]
    fn test_arbitration_lost_on_model() {
        use cip51_core::dispatch::SmbusOutcome;

        let config = DemoConfig::default();
        let shared = SmbusShared::new();
        let mut dispatcher = SmbusSlaveDispatcher::new(config.smbus, &shared);
        let mut last = None;
        let mut master = SmbusMaster::new(SimSmbus::nibble(), |hw: &mut SimSmbus| {
            last = Some(dispatcher.on_interrupt(hw));
        });

        master.slave_mut().inject_arbitration_lost();
        master.service().unwrap();
        assert!(!master.slave().acking());
        assert!(!master.slave().interrupt_pending());
        assert_eq!(master.slave().resets(), 0);
        drop(master);
        assert_eq!(last, Some(SmbusOutcome::ArbitrationLost));
    }
}
