//! Flash programming with supply guard and bank mapping
//!
//! [`FlashWriter`] wraps a chip's [`FlashCore`](cip51_hal::flash::FlashCore)
//! and [`VddMonitor`](cip51_hal::flash::VddMonitor). Callers address flash
//! linearly; the writer selects the code bank on parts above 64KB.

pub mod bank;
pub mod writer;

pub use bank::BankedAddress;
pub use writer::{FlashWriter, MAX_PAGE_SIZE};
