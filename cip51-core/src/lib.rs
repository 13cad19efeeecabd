//! Board-agnostic core logic for CIP-51 peripheral examples
//!
//! This crate contains everything that does not depend on a particular
//! chip's register map:
//!
//! - Status-vector dispatchers for SMBus, SPI, LIN and CAN interrupts
//! - ISR/foreground plumbing (single-slot mailbox, critical-section cell)
//! - ADC decimation and unit conversion
//! - Flash writer with supply guard and bank mapping
//! - Timer reload arithmetic, sine waveform generation
//! - Configuration type definitions and validation

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod adc;
pub mod config;
pub mod dispatch;
pub mod flash;
pub mod report;
pub mod sync;
pub mod timer;
pub mod waveform;
