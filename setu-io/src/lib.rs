//! SetuIO - Hardware abstraction library for the corridor servo car
//!
//! This library provides the capability traits a controller drives the car
//! through, the board's data types, and a hardware-free mock board.
//!
//! ## Features
//!
//! - `mock`: Enable scripted fakes and the corridor simulation (default)

pub mod core;
pub mod devices;
pub mod error;

// Re-export commonly used types
pub use crate::core::driver::{ActuatorOutput, AnalogInputSource, ButtonSource, IndicatorArray};
pub use crate::core::types::{
    AnalogChannel, ButtonAction, ButtonEvent, INDICATOR_CELLS, PULSE_CENTER_US, PULSE_MAX_US,
    PULSE_MIN_US, Position, Rgb, SensorReading, SensorWiring, ServoChannel, Side, Switch,
};
pub use error::{Error, Result};
