//! Configuration type definitions
//!
//! Each struct validates itself; the application edge parses them from
//! TOML when the `serde` feature is enabled.

use cip51_hal::can::{MESSAGE_OBJECTS, STANDARD_ID_MASK};
use cip51_hal::lin::{ChecksumKind, MAX_ID};
use cip51_hal::uart::UartConfig;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::timer::{actual_baud, baud_error_ppm, baud_reload, MAX_BAUD_ERROR_PPM};

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// SMBus slave address is zero or has the R/W bit set
    InvalidSmbusAddress(u8),
    /// SPI buffer length outside 1..=255
    InvalidBufferSize,
    /// LIN identifier above 0x3F
    InvalidLinId(u8),
    /// Both LIN commands share one identifier
    DuplicateLinId,
    /// CAN identifier wider than 11 bits
    InvalidCanId(u16),
    /// CAN message object outside 1..=32
    InvalidMessageObject(u8),
    /// Transmit and receive share a message object or identifier
    DuplicateCanObject,
    /// Decimation count of zero
    ZeroDecimation,
    /// ADC resolution other than 8, 10 or 12 bits
    InvalidResolution(u8),
    /// Reference voltage of zero
    InvalidVref,
    /// Baud rate cannot be produced from SYSCLK
    BaudUnreachable(u32),
    /// Output frequency zero or above Nyquist
    InvalidFrequency(u32),
    /// Sample rate of zero
    InvalidSampleRate,
}

/// Board-wide settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BoardConfig {
    /// System clock in Hz
    pub sysclk_hz: u32,
    /// UART0 baud rate (8-N-1)
    pub baud: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        // Internal oscillator, undivided, on the F3xx/F50x parts
        Self {
            sysclk_hz: 24_500_000,
            baud: 115_200,
        }
    }
}

impl BoardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(UartConfig::MIN_BAUD..=UartConfig::MAX_BAUD).contains(&self.baud) {
            return Err(ConfigError::BaudUnreachable(self.baud));
        }
        let reload = baud_reload(self.sysclk_hz, self.baud)
            .map_err(|_| ConfigError::BaudUnreachable(self.baud))?;
        let actual = actual_baud(self.sysclk_hz, reload);
        if baud_error_ppm(self.baud, actual) > MAX_BAUD_ERROR_PPM {
            return Err(ConfigError::BaudUnreachable(self.baud));
        }
        Ok(())
    }

    /// UART settings derived from this board
    pub fn uart(&self) -> UartConfig {
        UartConfig::with_baud(self.baud)
    }
}

/// SMBus slave settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SmbusSlaveConfig {
    /// Slave address in 8-bit (left-shifted) form; bit 0 must be clear
    pub address: u8,
}

impl Default for SmbusSlaveConfig {
    fn default() -> Self {
        Self { address: 0xF0 }
    }
}

impl SmbusSlaveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address == 0 || self.address & 0x01 != 0 {
            return Err(ConfigError::InvalidSmbusAddress(self.address));
        }
        Ok(())
    }

    /// Whether an address byte (with R/W bit) selects this slave
    pub fn matches(&self, address_byte: u8) -> bool {
        address_byte & 0xFE == self.address & 0xFE
    }
}

/// SPI slave settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpiSlaveConfig {
    /// Length of the buffer moved by `WRITE_BUFFER` / `READ_BUFFER`
    pub buffer_len: u8,
}

impl Default for SpiSlaveConfig {
    fn default() -> Self {
        Self { buffer_len: 8 }
    }
}

impl SpiSlaveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_len == 0 {
            return Err(ConfigError::InvalidBufferSize);
        }
        Ok(())
    }
}

/// LIN slave settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LinSlaveConfig {
    /// Frame the slave answers with its switch state
    pub switch_id: u8,
    /// Frame whose first data byte sets the LED
    pub led_id: u8,
    /// Checksum model expected on the bus
    pub checksum: ChecksumKind,
}

impl Default for LinSlaveConfig {
    fn default() -> Self {
        Self {
            switch_id: 0x10,
            led_id: 0x11,
            checksum: ChecksumKind::Enhanced,
        }
    }
}

impl LinSlaveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for id in [self.switch_id, self.led_id] {
            if id > MAX_ID {
                return Err(ConfigError::InvalidLinId(id));
            }
        }
        if self.switch_id == self.led_id {
            return Err(ConfigError::DuplicateLinId);
        }
        Ok(())
    }
}

/// CAN LED-toggle node settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CanNodeConfig {
    /// Identifier this node transmits its switch state on
    pub tx_id: u16,
    /// Identifier this node listens to for LED commands
    pub rx_id: u16,
    /// Transmit message object number
    pub tx_object: u8,
    /// Receive message object number
    pub rx_object: u8,
}

impl Default for CanNodeConfig {
    fn default() -> Self {
        Self {
            tx_id: 0x01,
            rx_id: 0x02,
            tx_object: 1,
            rx_object: 2,
        }
    }
}

impl CanNodeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for id in [self.tx_id, self.rx_id] {
            if id & !STANDARD_ID_MASK != 0 {
                return Err(ConfigError::InvalidCanId(id));
            }
        }
        for object in [self.tx_object, self.rx_object] {
            if object == 0 || object > MESSAGE_OBJECTS {
                return Err(ConfigError::InvalidMessageObject(object));
            }
        }
        if self.tx_object == self.rx_object || self.tx_id == self.rx_id {
            return Err(ConfigError::DuplicateCanObject);
        }
        Ok(())
    }

    /// Settings for the node at the other end of the bus
    pub fn peer(&self) -> Self {
        Self {
            tx_id: self.rx_id,
            rx_id: self.tx_id,
            ..*self
        }
    }
}

/// ADC decimation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AdcDecimationConfig {
    /// Samples averaged per reported result
    pub samples: u16,
    /// Converter resolution in bits
    pub resolution_bits: u8,
    /// Reference voltage in millivolts
    pub vref_mv: u16,
    /// Conversion start rate in Hz
    pub sample_rate_hz: u32,
}

impl Default for AdcDecimationConfig {
    fn default() -> Self {
        Self {
            samples: 2048,
            resolution_bits: 10,
            vref_mv: 2430,
            sample_rate_hz: 10_000,
        }
    }
}

impl AdcDecimationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.samples == 0 {
            return Err(ConfigError::ZeroDecimation);
        }
        if !matches!(self.resolution_bits, 8 | 10 | 12) {
            return Err(ConfigError::InvalidResolution(self.resolution_bits));
        }
        if self.vref_mv == 0 {
            return Err(ConfigError::InvalidVref);
        }
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::InvalidSampleRate);
        }
        Ok(())
    }

    /// Converter settings for unit conversion
    pub fn adc(&self) -> cip51_hal::adc::AdcConfig {
        cip51_hal::adc::AdcConfig {
            resolution_bits: self.resolution_bits,
            vref_mv: self.vref_mv,
        }
    }
}

/// Sine waveform settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SineConfig {
    /// Output frequency in Hz
    pub frequency_hz: u32,
    /// DAC update rate in Hz
    pub sample_rate_hz: u32,
    /// Peak amplitude as a fraction of full scale (65535 = full)
    pub amplitude: u16,
}

impl Default for SineConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 1000,
            sample_rate_hz: 100_000,
            amplitude: 65535,
        }
    }
}

impl SineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::InvalidSampleRate);
        }
        if self.frequency_hz == 0 || self.frequency_hz >= self.sample_rate_hz / 2 {
            return Err(ConfigError::InvalidFrequency(self.frequency_hz));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert_eq!(BoardConfig::default().validate(), Ok(()));
        assert_eq!(SmbusSlaveConfig::default().validate(), Ok(()));
        assert_eq!(SpiSlaveConfig::default().validate(), Ok(()));
        assert_eq!(LinSlaveConfig::default().validate(), Ok(()));
        assert_eq!(CanNodeConfig::default().validate(), Ok(()));
        assert_eq!(AdcDecimationConfig::default().validate(), Ok(()));
        assert_eq!(SineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_smbus_address_rules() {
        assert_eq!(
            SmbusSlaveConfig { address: 0xF1 }.validate(),
            Err(ConfigError::InvalidSmbusAddress(0xF1))
        );
        assert_eq!(
            SmbusSlaveConfig { address: 0 }.validate(),
            Err(ConfigError::InvalidSmbusAddress(0))
        );

        let config = SmbusSlaveConfig::default();
        assert!(config.matches(0xF0));
        assert!(config.matches(0xF1));
        assert!(!config.matches(0xE0));
    }

    #[test]
    fn test_lin_ids() {
        let config = LinSlaveConfig {
            led_id: 0x40,
            ..LinSlaveConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidLinId(0x40)));

        let config = LinSlaveConfig {
            led_id: 0x10,
            ..LinSlaveConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::DuplicateLinId));
    }

    #[test]
    fn test_can_rules() {
        let config = CanNodeConfig {
            tx_id: 0x800,
            ..CanNodeConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidCanId(0x800)));

        let config = CanNodeConfig {
            rx_object: 33,
            ..CanNodeConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidMessageObject(33)));

        let peer = CanNodeConfig::default().peer();
        assert_eq!(peer.tx_id, 0x02);
        assert_eq!(peer.rx_id, 0x01);
        assert_eq!(peer.validate(), Ok(()));
    }

    #[test]
    fn test_adc_rules() {
        let config = AdcDecimationConfig {
            samples: 0,
            ..AdcDecimationConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroDecimation));

        let config = AdcDecimationConfig {
            resolution_bits: 16,
            ..AdcDecimationConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidResolution(16)));
    }

    #[test]
    fn test_board_baud_range() {
        let config = BoardConfig {
            baud: 460_800,
            ..BoardConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::BaudUnreachable(460_800)));

        // 32.768 kHz RTC clock cannot make 9600 baud
        let config = BoardConfig {
            sysclk_hz: 32_768,
            baud: 9600,
        };
        assert_eq!(config.validate(), Err(ConfigError::BaudUnreachable(9600)));
    }

    #[test]
    fn test_sine_nyquist() {
        let config = SineConfig {
            frequency_hz: 50_000,
            ..SineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidFrequency(50_000)));
    }
}
