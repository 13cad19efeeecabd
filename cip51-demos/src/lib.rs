//! CIP-51 peripheral demos on simulated hardware
//!
//! Each module is one of the vendor example programs rebuilt on the
//! core dispatchers: an interrupt handler wired into a simulated
//! peripheral, and a foreground loop that waits on a mailbox with a poll
//! budget and prints status lines to the UART.
//!
//! ```text
//! demos.toml ──► DemoConfig ──► Demo::run ──► DemoReport (UART lines)
//!                                   │
//!                  cip51-core dispatchers + cip51-hal-sim models
//! ```

use core::fmt;
use std::convert::Infallible;

use cip51_core::config::{
    AdcDecimationConfig, BoardConfig, CanNodeConfig, ConfigError, LinSlaveConfig, SineConfig,
    SmbusSlaveConfig, SpiSlaveConfig,
};
use cip51_core::report::StatusLine;
use cip51_core::sync::WaitTimeout;
use cip51_core::timer::TimerError;
use cip51_hal::flash::{FlashError, FlashGeometry};
use cip51_hal_sim::{SimError, SimUart};
use serde::Deserialize;

pub mod adc_decimate;
pub mod can_led;
pub mod flash_scratch;
pub mod lin_node;
pub mod sine_wave;
pub mod smbus_echo;
pub mod spi_command;

/// Settings compiled into the runner
pub const DEFAULT_CONFIG: &str = include_str!("../demos.toml");

/// Part whose flash layout the scratchpad demo uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashPart {
    F34x,
    /// 128KB, bank-switched
    #[default]
    F12x,
    F99x,
}

impl FlashPart {
    pub fn geometry(self) -> FlashGeometry {
        match self {
            FlashPart::F34x => FlashGeometry::F34X,
            FlashPart::F12x => FlashGeometry::F12X,
            FlashPart::F99x => FlashGeometry::F99X,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FlashDemoConfig {
    pub part: FlashPart,
    /// First scratch byte (linear address)
    pub address: u32,
}

impl Default for FlashDemoConfig {
    fn default() -> Self {
        Self {
            part: FlashPart::F12x,
            address: 0x1_0000,
        }
    }
}

/// Everything the demos read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Polls the foreground spends waiting for one result
    pub poll_budget: u32,
    pub board: BoardConfig,
    pub smbus: SmbusSlaveConfig,
    pub spi: SpiSlaveConfig,
    pub lin: LinSlaveConfig,
    pub can: CanNodeConfig,
    pub adc: AdcDecimationConfig,
    pub sine: SineConfig,
    pub flash: FlashDemoConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            poll_budget: 10_000,
            board: BoardConfig::default(),
            smbus: SmbusSlaveConfig::default(),
            spi: SpiSlaveConfig::default(),
            lin: LinSlaveConfig::default(),
            can: CanNodeConfig::default(),
            adc: AdcDecimationConfig::default(),
            sine: SineConfig::default(),
            flash: FlashDemoConfig::default(),
        }
    }
}

impl DemoConfig {
    /// Parse and validate TOML text
    pub fn from_toml(text: &str) -> Result<Self, DemoError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// The compiled-in [`DEFAULT_CONFIG`]
    pub fn embedded() -> Result<Self, DemoError> {
        Self::from_toml(DEFAULT_CONFIG)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.board.validate()?;
        self.smbus.validate()?;
        self.spi.validate()?;
        self.lin.validate()?;
        self.can.validate()?;
        self.adc.validate()?;
        self.sine.validate()
    }
}

/// Demo failures
#[derive(Debug)]
pub enum DemoError {
    Config(ConfigError),
    /// TOML text did not parse
    Parse(toml::de::Error),
    Sim(SimError),
    Flash(FlashError),
    Timer(TimerError),
    /// Foreground gave up waiting on the interrupt handler
    Timeout(WaitTimeout),
    /// Status line longer than the line buffer
    LineTooLong,
    /// Read back something other than what was written
    Mismatch { expected: u8, actual: u8 },
    /// A step that should have failed succeeded
    Unexpected(&'static str),
}

impl fmt::Display for DemoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemoError::Config(err) => write!(f, "invalid configuration: {:?}", err),
            DemoError::Parse(err) => write!(f, "config parse error: {}", err),
            DemoError::Sim(err) => write!(f, "bus error: {}", err),
            DemoError::Flash(err) => write!(f, "flash error: {:?}", err),
            DemoError::Timer(err) => write!(f, "timer error: {:?}", err),
            DemoError::Timeout(timeout) => {
                write!(f, "no result after {} polls", timeout.polls)
            }
            DemoError::LineTooLong => write!(f, "status line too long"),
            DemoError::Mismatch { expected, actual } => {
                write!(f, "expected 0x{:02X}, read 0x{:02X}", expected, actual)
            }
            DemoError::Unexpected(what) => write!(f, "unexpected: {}", what),
        }
    }
}

impl std::error::Error for DemoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DemoError::Parse(err) => Some(err),
            DemoError::Sim(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for DemoError {
    fn from(e: ConfigError) -> Self {
        DemoError::Config(e)
    }
}

impl From<toml::de::Error> for DemoError {
    fn from(e: toml::de::Error) -> Self {
        DemoError::Parse(e)
    }
}

impl From<SimError> for DemoError {
    fn from(e: SimError) -> Self {
        DemoError::Sim(e)
    }
}

impl From<FlashError> for DemoError {
    fn from(e: FlashError) -> Self {
        DemoError::Flash(e)
    }
}

impl From<TimerError> for DemoError {
    fn from(e: TimerError) -> Self {
        DemoError::Timer(e)
    }
}

impl From<WaitTimeout> for DemoError {
    fn from(e: WaitTimeout) -> Self {
        DemoError::Timeout(e)
    }
}

impl From<fmt::Error> for DemoError {
    fn from(_: fmt::Error) -> Self {
        DemoError::LineTooLong
    }
}

impl From<Infallible> for DemoError {
    fn from(e: Infallible) -> Self {
        match e {}
    }
}

/// The example programs
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Demo {
    /// SMBus slave echoing the last byte written
    SmbusEcho,
    /// SPI slave driven by command opcodes
    SpiCommand,
    /// LIN slave with a switch and an LED
    LinNode,
    /// Two CAN nodes toggling each other's LED
    CanLed,
    /// Timer-triggered ADC with decimation
    AdcDecimate,
    /// Flash scratchpad write/update/clear
    FlashScratch,
    /// Phase-accumulator sine for the DAC
    SineWave,
}

impl Demo {
    pub const ALL: [Demo; 7] = [
        Demo::SmbusEcho,
        Demo::SpiCommand,
        Demo::LinNode,
        Demo::CanLed,
        Demo::AdcDecimate,
        Demo::FlashScratch,
        Demo::SineWave,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Demo::SmbusEcho => "smbus-echo",
            Demo::SpiCommand => "spi-command",
            Demo::LinNode => "lin-node",
            Demo::CanLed => "can-led",
            Demo::AdcDecimate => "adc-decimate",
            Demo::FlashScratch => "flash-scratch",
            Demo::SineWave => "sine-wave",
        }
    }

    /// Run the demo for `cycles` foreground iterations
    pub fn run(self, config: &DemoConfig, cycles: u32) -> Result<DemoReport, DemoError> {
        log::info!("running {} for {} cycles", self.name(), cycles);
        match self {
            Demo::SmbusEcho => smbus_echo::run(config, cycles),
            Demo::SpiCommand => spi_command::run(config, cycles),
            Demo::LinNode => lin_node::run(config, cycles),
            Demo::CanLed => can_led::run(config, cycles),
            Demo::AdcDecimate => adc_decimate::run(config, cycles),
            Demo::FlashScratch => flash_scratch::run(config, cycles),
            Demo::SineWave => sine_wave::run(config, cycles),
        }
    }
}

/// What a demo printed and how busy its interrupt handlers were
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoReport {
    pub demo: Demo,
    /// UART transcript, one entry per status line
    pub lines: Vec<String>,
    pub interrupts: u64,
    /// Protocol errors counted by the dispatchers
    pub errors: u32,
}

impl DemoReport {
    pub(crate) fn new(demo: Demo, uart: &SimUart, interrupts: u64, errors: u32) -> Self {
        Self {
            demo,
            lines: uart.lines(),
            interrupts,
            errors,
        }
    }
}

/// Format-then-send one status line
pub(crate) fn emit(
    uart: &mut SimUart,
    line: Result<StatusLine, fmt::Error>,
) -> Result<(), DemoError> {
    let line = line?;
    log::debug!("uart: {}", line);
    line.send(uart)?;
    Ok(())
}

/// Check a read-back byte
pub(crate) fn expect_byte(expected: u8, actual: u8) -> Result<(), DemoError> {
    if expected == actual {
        Ok(())
    } else {
        Err(DemoError::Mismatch { expected, actual })
    }
}
