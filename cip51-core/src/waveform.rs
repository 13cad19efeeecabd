//! Table-driven sine generation for the DAC
//!
//! A 16-bit phase accumulator advances once per DAC update; its upper
//! byte indexes a 256-entry full-period table.

use crate::config::{ConfigError, SineConfig};

/// One period of `32767 * sin(2πi/256)`
#[rustfmt::skip]
pub static SINE_TABLE: [i16; 256] = [
    0, 804, 1608, 2410, 3212, 4011, 4808, 5602,
    6393, 7179, 7962, 8739, 9512, 10278, 11039, 11793,
    12539, 13279, 14010, 14732, 15446, 16151, 16846, 17530,
    18204, 18868, 19519, 20159, 20787, 21403, 22005, 22594,
    23170, 23731, 24279, 24811, 25329, 25832, 26319, 26790,
    27245, 27683, 28105, 28510, 28898, 29268, 29621, 29956,
    30273, 30571, 30852, 31113, 31356, 31580, 31785, 31971,
    32137, 32285, 32412, 32521, 32609, 32678, 32728, 32757,
    32767, 32757, 32728, 32678, 32609, 32521, 32412, 32285,
    32137, 31971, 31785, 31580, 31356, 31113, 30852, 30571,
    30273, 29956, 29621, 29268, 28898, 28510, 28105, 27683,
    27245, 26790, 26319, 25832, 25329, 24811, 24279, 23731,
    23170, 22594, 22005, 21403, 20787, 20159, 19519, 18868,
    18204, 17530, 16846, 16151, 15446, 14732, 14010, 13279,
    12539, 11793, 11039, 10278, 9512, 8739, 7962, 7179,
    6393, 5602, 4808, 4011, 3212, 2410, 1608, 804,
    0, -804, -1608, -2410, -3212, -4011, -4808, -5602,
    -6393, -7179, -7962, -8739, -9512, -10278, -11039, -11793,
    -12539, -13279, -14010, -14732, -15446, -16151, -16846, -17530,
    -18204, -18868, -19519, -20159, -20787, -21403, -22005, -22594,
    -23170, -23731, -24279, -24811, -25329, -25832, -26319, -26790,
    -27245, -27683, -28105, -28510, -28898, -29268, -29621, -29956,
    -30273, -30571, -30852, -31113, -31356, -31580, -31785, -31971,
    -32137, -32285, -32412, -32521, -32609, -32678, -32728, -32757,
    -32767, -32757, -32728, -32678, -32609, -32521, -32412, -32285,
    -32137, -31971, -31785, -31580, -31356, -31113, -30852, -30571,
    -30273, -29956, -29621, -29268, -28898, -28510, -28105, -27683,
    -27245, -26790, -26319, -25832, -25329, -24811, -24279, -23731,
    -23170, -22594, -22005, -21403, -20787, -20159, -19519, -18868,
    -18204, -17530, -16846, -16151, -15446, -14732, -14010, -13279,
    -12539, -11793, -11039, -10278, -9512, -8739, -7962, -7179,
    -6393, -5602, -4808, -4011, -3212, -2410, -1608, -804,
];

/// 16-bit phase accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhaseAccumulator {
    phase: u16,
    phase_add: u16,
}

impl PhaseAccumulator {
    /// Step size for `frequency` Hz at `sample_rate` updates per second
    ///
    /// `sample_rate` must be non-zero; [`SineConfig::validate`] checks it.
    pub fn new(frequency: u32, sample_rate: u32) -> Self {
        let phase_add = frequency as u64 * 65536 / sample_rate.max(1) as u64;
        Self {
            phase: 0,
            phase_add: phase_add as u16,
        }
    }

    pub fn phase_add(&self) -> u16 {
        self.phase_add
    }

    /// Table index for this update, then advance
    pub fn next_index(&mut self) -> u8 {
        let index = (self.phase >> 8) as u8;
        self.phase = self.phase.wrapping_add(self.phase_add);
        index
    }
}

/// Sine source producing 12-bit unsigned DAC codes centered on mid-scale
#[derive(Debug, Clone, Copy)]
pub struct SineGenerator {
    phase: PhaseAccumulator,
    amplitude: u16,
}

impl SineGenerator {
    pub fn new(config: SineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            phase: PhaseAccumulator::new(config.frequency_hz, config.sample_rate_hz),
            amplitude: config.amplitude,
        })
    }

    /// Next DAC code (`0..=4095`)
    pub fn next_sample(&mut self) -> u16 {
        let raw = SINE_TABLE[self.phase.next_index() as usize] as i32;
        let scaled = (raw * self.amplitude as i32) >> 16;
        ((scaled + 32768) >> 4) as u16
    }
}
