//! Timer-triggered ADC with decimation
//!
//! Timer2 overflows at the sample rate and starts a conversion; the
//! end-of-conversion interrupt accumulates samples and posts the mean of
//! every batch. The foreground converts the mean to millivolts.

use core::num::NonZeroU16;

use cip51_core::adc::{to_millivolts, AdcChannel, AdcShared};
use cip51_core::config::ConfigError;
use cip51_core::report::StatusLine;
use cip51_core::timer::timer_reload_16;
use cip51_hal_sim::{SimAdc, SimUart};

use crate::{emit, Demo, DemoConfig, DemoError, DemoReport};

/// Input for conversion `index` of a batch: a small sawtooth riding on
/// a level that rises each cycle
fn input(cycle: u32, index: u32, max_code: u16) -> u16 {
    let level = 256 + 64 * cycle + index % 8;
    level.min(max_code as u32) as u16
}

pub fn run(config: &DemoConfig, cycles: u32) -> Result<DemoReport, DemoError> {
    config.adc.validate()?;
    let samples = NonZeroU16::new(config.adc.samples).ok_or(ConfigError::ZeroDecimation)?;
    let adc_config = config.adc.adc();
    let mut uart = SimUart::new();

    // Timer2 clocked from SYSCLK
    let reload = timer_reload_16(config.board.sysclk_hz, 1, config.adc.sample_rate_hz)?;
    emit(
        &mut uart,
        StatusLine::format(format_args!("Timer2 reload: 0x{:04X}", reload)),
    )?;

    let shared = AdcShared::new(samples);
    let mut channel = AdcChannel::new(SimAdc::new(), &shared);

    for cycle in 0..cycles {
        channel
            .sampler_mut()
            .feed((0..samples.get() as u32).map(|i| input(cycle, i, adc_config.max_code())));
        // Each poll is one timer overflow
        let mean = shared.results.poll_take(config.poll_budget, || {
            channel.sampler_mut().convert();
            channel.on_interrupt();
        })?;
        let millivolts = to_millivolts(mean, adc_config);
        log::debug!("adc: mean code {} over {} samples", mean, samples);
        emit(&mut uart, StatusLine::voltage("AIN0", millivolts))?;
    }

    // Partial batch: the foreground can peek at it, then throw it away
    for _ in 0..3 {
        channel.sampler_mut().convert();
        channel.on_interrupt();
    }
    let (sum, taken) = shared.accumulated();
    emit(
        &mut uart,
        StatusLine::format(format_args!("ADC partial: {} samples, sum {}", taken, sum)),
    )?;
    shared.restart();

    let interrupts = channel.sampler_mut().conversions();
    Ok(DemoReport::new(Demo::AdcDecimate, &uart, interrupts, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimated_voltages() {
        let report = run(&DemoConfig::default(), 2).unwrap();
        // Means 259 and 323 on a 10-bit, 2430 mV scale; the partial batch
        // repeats the last sample (327)
        assert_eq!(
            report.lines,
            [
                "Timer2 reload: 0xF66E",
                "AIN0 voltage: 614 mV",
                "AIN0 voltage: 766 mV",
                "ADC partial: 3 samples, sum 981",
            ]
        );
        assert_eq!(report.interrupts, 2 * 2048 + 3);
    }

    #[test]
    fn test_budget_smaller_than_batch_times_out() {
        let mut config = DemoConfig::default();
        config.poll_budget = 100;
        assert!(matches!(
            run(&config, 1),
            Err(DemoError::Timeout(timeout)) if timeout.polls == 100
        ));
    }

    #[test]
    fn test_clamped_to_full_scale() {
        let mut config = DemoConfig::default();
        config.adc.resolution_bits = 8;
        config.adc.samples = 16;
        let report = run(&config, 1).unwrap();
        // Every sample clamps to 255 of 256 codes
        assert_eq!(report.lines[1], "AIN0 voltage: 2420 mV");
    }
}
