//! Core abstractions for board drivers.
//!
//! - [`driver`]: Capability traits to implement for new hardware
//! - [`types`]: Channels, switches, colors and pulse-width limits

pub mod driver;
pub mod types;
