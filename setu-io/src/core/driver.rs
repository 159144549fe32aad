//! Board capability traits
//!
//! Each physical capability of the car's sensor board is its own trait so a
//! controller can be handed exactly the drivers it needs, and tests can swap
//! any of them for a fake.

use crate::core::types::{AnalogChannel, ButtonEvent, Rgb, ServoChannel};
use crate::error::Result;
use crossbeam_channel::Sender;

/// Analog voltage input (IR rangefinders)
pub trait AnalogInputSource: Send {
    /// Read the current voltage on a channel
    ///
    /// May fail with an I/O error; callers decide how to degrade.
    fn read_voltage(&mut self, channel: AnalogChannel) -> Result<f64>;
}

/// Servo pulse-width output (steering and throttle)
pub trait ActuatorOutput: Send {
    /// Command a pulse width in microseconds
    ///
    /// Implementations pass the value through as-is. Callers must clamp to
    /// the safe mechanical range (see [`crate::core::types::PULSE_MIN_US`]).
    fn set_pulse_width(&mut self, channel: ServoChannel, pulse_us: u16) -> Result<()>;
}

/// Addressable array of tri-color LEDs
pub trait IndicatorArray: Send {
    /// Number of cells
    fn len(&self) -> usize;

    /// True when the array has no cells
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set a cell's color (does not change its on/off state)
    fn set_color(&mut self, index: usize, color: Rgb) -> Result<()>;

    /// Turn a cell on with its current color
    fn set_on(&mut self, index: usize) -> Result<()>;

    /// Turn a cell off
    fn set_off(&mut self, index: usize) -> Result<()>;
}

/// Source of switch press/release notifications
pub trait ButtonSource: Send {
    /// Start delivering events to `events`
    ///
    /// Delivery happens on the source's own thread, independent of any
    /// consumer's cadence. A closed receiver must not crash the source.
    fn subscribe(&mut self, events: Sender<ButtonEvent>) -> Result<()>;
}
