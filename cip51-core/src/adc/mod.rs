//! ADC decimation and unit conversion
//!
//! The conversion-complete interrupt feeds a [`Decimator`]; every N samples
//! the mean is posted to the foreground, which converts it to millivolts
//! (or degrees for the internal temperature sensor) and prints it.

pub mod channel;
pub mod convert;
pub mod decimator;

pub use channel::{AdcChannel, AdcShared};
pub use convert::{temperature_c_x100, to_millivolts, TempSensorCalibration};
pub use decimator::Decimator;
