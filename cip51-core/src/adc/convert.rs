//! Code-to-unit conversion

use cip51_hal::adc::AdcConfig;

/// Convert an ADC code to millivolts against `config.vref_mv`
pub fn to_millivolts(code: u16, config: AdcConfig) -> u32 {
    code as u32 * config.vref_mv as u32 / config.full_scale()
}

/// Internal temperature sensor transfer function, `V = offset + slope * T`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TempSensorCalibration {
    /// Sensor output at 0 °C in millivolts
    pub offset_mv: u32,
    /// Sensor slope in microvolts per °C
    pub slope_uv_per_c: u32,
}

impl Default for TempSensorCalibration {
    fn default() -> Self {
        // Typical values from the F34x electrical characteristics
        Self {
            offset_mv: 776,
            slope_uv_per_c: 2860,
        }
    }
}

/// Temperature in hundredths of a degree Celsius
pub fn temperature_c_x100(millivolts: u32, calibration: TempSensorCalibration) -> i32 {
    let delta_uv = (millivolts as i64 - calibration.offset_mv as i64) * 1000;
    (delta_uv * 100 / calibration.slope_uv_per_c.max(1) as i64) as i32
}
