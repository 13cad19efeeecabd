//! DAC sine wave
//!
//! The Timer3 overflow interrupt writes the next table sample to the DAC.
//! One cycle here is one period of the output; the foreground reports
//! the code range it saw.

use cip51_core::report::StatusLine;
use cip51_core::timer::timer_reload_16;
use cip51_core::waveform::{PhaseAccumulator, SineGenerator};
use cip51_hal_sim::SimUart;

use crate::{emit, Demo, DemoConfig, DemoError, DemoReport};

pub fn run(config: &DemoConfig, cycles: u32) -> Result<DemoReport, DemoError> {
    let sine = config.sine;
    let mut generator = SineGenerator::new(sine)?;
    let mut uart = SimUart::new();

    let reload = timer_reload_16(config.board.sysclk_hz, 1, sine.sample_rate_hz)?;
    let step = PhaseAccumulator::new(sine.frequency_hz, sine.sample_rate_hz).phase_add();
    emit(
        &mut uart,
        StatusLine::format(format_args!(
            "Timer3 reload: 0x{:04X}, phase step {}",
            reload, step
        )),
    )?;

    let per_period = sine.sample_rate_hz / sine.frequency_hz;
    let mut updates = 0u64;
    for period in 0..cycles {
        let (mut low, mut high) = (u16::MAX, u16::MIN);
        for _ in 0..per_period {
            let code = generator.next_sample();
            low = low.min(code);
            high = high.max(code);
            updates += 1;
        }
        emit(
            &mut uart,
            StatusLine::format(format_args!(
                "DAC period {}: min {} max {}",
                period, low, high
            )),
        )?;
    }

    Ok(DemoReport::new(Demo::SineWave, &uart, updates, 0))
}
