//! CIP-51 Hardware Abstraction Layer
//!
//! This crate defines the capability traits that each 8051-family chip
//! variant implements for its peripherals. The status-vector dispatchers in
//! `cip51-core` are generic over these traits, so one state machine serves
//! every register layout.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Demo programs (cip51-demos)            │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  cip51-core (dispatchers, mailbox, ...) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  cip51-hal (this crate - traits)        │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ cip51-hal-sim │       │ chip register │
//! │ (host models) │       │    blocks     │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`], [`gpio::InputPin`] - LEDs and switches
//! - [`uart::UartTx`], [`uart::UartRx`] - Serial status output
//! - [`i2c::I2cBus`], [`spi::SpiBus`] - Bus masters
//! - [`smbus::SmbusSlave`], [`spi::SpiSlave`], [`lin::LinSlave`] - Slave peripherals
//! - [`can::CanController`] - Message-object CAN controller
//! - [`flash::FlashCore`], [`flash::VddMonitor`] - Flash and supply monitor
//! - [`adc::AdcSampler`] - ADC conversion result

#![no_std]
#![deny(unsafe_code)]

pub mod adc;
pub mod can;
pub mod flash;
pub mod gpio;
pub mod i2c;
pub mod lin;
pub mod smbus;
pub mod spi;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use adc::AdcSampler;
pub use can::CanController;
pub use flash::{FlashCore, FlashError, VddMonitor};
pub use gpio::{InputPin, OutputPin};
pub use i2c::I2cBus;
pub use lin::LinSlave;
pub use smbus::SmbusSlave;
pub use spi::{SpiBus, SpiSlave};
pub use uart::{UartRx, UartTx};
