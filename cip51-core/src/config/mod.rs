//! Configuration types
//!
//! Per-peripheral settings the demo programs hard-code as `#define`s,
//! gathered into structs with defaults matching those constants.

pub mod types;

pub use types::*;
