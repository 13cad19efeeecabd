//! Simulated CIP-51 peripherals
//!
//! Register-level host models of the peripherals the dispatchers drive.
//! Each slave model pairs with a bus master that plays the other end of
//! the wire and invokes an interrupt-handler closure whenever the model
//! raises its interrupt flag, the way the CPU would vector to the ISR.
//!
//! ```text
//!   master (test / demo)          model                 dispatcher
//!   ────────────────────   ──────────────────   ─────────────────────
//!   SmbusMaster::write  →  SimSmbus: SI = 1   →  isr(&mut SimSmbus)
//!                        ←  SI == 0 ?          ←  clear_interrupt()
//! ```
//!
//! Linking this crate also installs the `std` critical-section
//! implementation the core crate's `Shared` and `Mailbox` rely on.

pub mod adc;
pub mod can;
pub mod error;
pub mod flash;
pub mod gpio;
pub mod lin;
pub mod smbus;
pub mod spi;
pub mod uart;

pub use adc::SimAdc;
pub use can::{CanBus, CanFrame, SimCan};
pub use error::SimError;
pub use flash::{SimFlash, SimVdd};
pub use gpio::SimPin;
pub use lin::{LinMaster, SimLin};
pub use smbus::{SimSmbus, SmbusMaster};
pub use spi::{SimSpi, SpiMaster};
pub use uart::SimUart;

// Keep the std critical-section implementation linked
use critical_section as _;
