//! ADC conversion abstractions
//!
//! ADC0 is started by a timer overflow in every decimation example; the
//! end-of-conversion interrupt (`AD0INT`) reads one result per invocation.

/// ADC end-of-conversion source
pub trait AdcSampler {
    /// Read `ADC0H:ADC0L` (right-justified)
    fn read_sample(&mut self) -> u16;

    /// Clear `AD0INT`
    fn clear_conversion_complete(&mut self);
}

/// ADC configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcConfig {
    /// Conversion resolution in bits (10 or 12 on these parts)
    pub resolution_bits: u8,
    /// Reference voltage in millivolts
    pub vref_mv: u16,
}

impl Default for AdcConfig {
    fn default() -> Self {
        // 10-bit ADC against the 2.43 V internal reference
        Self {
            resolution_bits: 10,
            vref_mv: 2430,
        }
    }
}

impl AdcConfig {
    /// Widest converter on any CIP-51 part
    pub const MAX_BITS: u8 = 16;

    /// Full-scale code count (`2^bits`), with the width clamped to
    /// [`Self::MAX_BITS`]
    pub fn full_scale(&self) -> u32 {
        1u32 << self.resolution_bits.min(Self::MAX_BITS)
    }

    /// Largest code the converter can produce
    pub fn max_code(&self) -> u16 {
        (self.full_scale() - 1) as u16
    }
}
