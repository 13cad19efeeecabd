//! LIN switch/LED slave
//!
//! Each cycle the master polls the slave's switch frame and mirrors the
//! state back onto the LED frame. The switch alternates between pressed
//! and released from one cycle to the next.

use cip51_core::dispatch::lin::SWITCH_PRESSED;
use cip51_core::dispatch::{LinShared, LinSlaveDispatcher};
use cip51_core::report::StatusLine;
use cip51_hal_sim::{LinMaster, SimLin, SimPin, SimUart};

use crate::{emit, Demo, DemoConfig, DemoError, DemoReport};

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

pub fn run(config: &DemoConfig, cycles: u32) -> Result<DemoReport, DemoError> {
    config.lin.validate()?;
    let mut uart = SimUart::new();

    let led = SimPin::new(false);
    // Active low, released
    let switch = SimPin::new(true);
    let shared = LinShared::new();
    let mut interrupts = 0u64;
    let mut dispatcher = LinSlaveDispatcher::new(config.lin, led.clone(), switch.clone(), &shared);
    let mut master = LinMaster::new(SimLin::new(), config.lin.checksum, |hw: &mut SimLin| {
        interrupts += 1;
        let outcome = dispatcher.on_interrupt(hw);
        log::trace!("lin isr: {:?}", outcome);
    });

    for cycle in 0..cycles {
        let pressed = cycle % 2 == 0;
        switch.drive(!pressed);

        let response = master.request_frame(config.lin.switch_id)?;
        let state = response.first().copied().unwrap_or(0);
        emit(
            &mut uart,
            StatusLine::format(format_args!(
                "LIN switch: {}",
                if state == SWITCH_PRESSED { "pressed" } else { "released" }
            )),
        )?;

        if !master.send_frame(config.lin.led_id, &[state])? {
            return Err(DemoError::Unexpected("slave ignored the LED frame"));
        }
        let on = shared.led.poll_take(config.poll_budget, || {})?;
        if on != pressed || led.level() != on {
            return Err(DemoError::Unexpected("LED does not match the switch"));
        }
        emit(
            &mut uart,
            StatusLine::format(format_args!("LIN LED: {}", on_off(on))),
        )?;
    }

    // A frame for nobody: the slave must stay out of it
    let other = (config.lin.switch_id.max(config.lin.led_id) + 1) & 0x3F;
    if other != config.lin.switch_id && other != config.lin.led_id && master.send_frame(other, &[0])? {
        return Err(DemoError::Unexpected("slave answered a foreign frame"));
    }

    drop(master);
    Ok(DemoReport::new(
        Demo::LinNode,
        &uart,
        interrupts,
        shared.error_count(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cip51_hal::lin::ChecksumKind;

    #[test]
    fn test_switch_drives_led() {
        let report = run(&DemoConfig::default(), 3).unwrap();
        assert_eq!(
            report.lines,
            [
                "LIN switch: pressed",
                "LIN LED: on",
                "LIN switch: released",
                "LIN LED: off",
                "LIN switch: pressed",
                "LIN LED: on",
            ]
        );
        assert_eq!(report.errors, 0);
        // Header and response per frame, plus the foreign header
        assert_eq!(report.interrupts, 3 * 4 + 1);
    }

    #[test]
    fn test_classic_checksum() {
        let mut config = DemoConfig::default();
        config.lin.checksum = ChecksumKind::Classic;
        let report = run(&config, 1).unwrap();
        assert_eq!(report.lines.len(), 2);
    }

    #[test]
    fn test_wakeup_and_unexpected_status_on_model() {
        use cip51_core::dispatch::LinOutcome;
        use cip51_hal::lin::status_bits;

        let config = DemoConfig::default();
        let led = SimPin::new(false);
        let shared = LinShared::new();
        let mut outcomes = Vec::new();
        let mut dispatcher =
            LinSlaveDispatcher::new(config.lin, led.clone(), SimPin::new(true), &shared);
        let mut master = LinMaster::new(SimLin::new(), config.lin.checksum, |hw: &mut SimLin| {
            outcomes.push(dispatcher.on_interrupt(hw));
        });

        master.slave_mut().raise_wakeup();
        master.service().unwrap();
        master.slave_mut().inject_status(status_bits::ACTIVE);
        master.service().unwrap();
        assert_eq!(master.slave().resets(), 1);
        assert!(!master.slave().interrupt_pending());

        // Still answers frames after the reset
        assert_eq!(master.request_frame(config.lin.switch_id).unwrap(), vec![0x00]);
        drop(master);

        assert_eq!(
            &outcomes[..2],
            [
                LinOutcome::Wakeup,
                LinOutcome::Unknown(status_bits::ACTIVE | status_bits::INTREQ),
            ]
        );
        assert_eq!(shared.error_count(), 1);
    }
}
