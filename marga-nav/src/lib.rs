//! MargaNav - Corridor wall-following controller for the servo car
//!
//! Keeps a two-servo car roughly centered in a hallway using four IR
//! rangefinders, and shows each wall's angle and reliability on the board's
//! LED array.
//!
//! ## Pipeline
//!
//! ```text
//! AnalogInputSource ─▶ perception ─▶ steering ─▶ ActuatorOutput
//!                           └──────▶ indicator ─▶ IndicatorArray
//! ButtonSource ─▶ inbox ─▶ ControlLoop (speed / stop)
//! ```
//!
//! Hardware is reached only through the `setu_io` capability traits, so the
//! same loop drives the real board, the corridor simulation, or test fakes.

pub mod config;
pub mod control;
pub mod error;
pub mod indicator;
pub mod perception;
pub mod shared;
pub mod steering;
pub mod telemetry;

pub use config::NavConfig;
pub use control::{ControlLoop, Drivers, LoopStats, TickOutcome};
pub use error::{NavError, Result};
pub use shared::{ShutdownSignal, inbox};
