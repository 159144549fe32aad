//! Mock board for hardware-free testing
//!
//! Two flavours of stand-in for the car's sensor board:
//!
//! | Kind | Types | Used by |
//! |------|-------|---------|
//! | Scripted fakes | [`MockAnalogInput`], [`MockServos`], [`MockIndicators`], [`MockButtons`] | Unit and integration tests |
//! | Corridor simulation | [`CorridorSimulator`] | Demo binary, end-to-end tests |
//!
//! The simulation models a straight hallway of configurable width. Car
//! kinematics run on their own thread; rangefinder voltages come from the
//! inverse calibration curve plus Gaussian noise.
//!
//! # Configuration
//!
//! Enable the `mock` feature (on by default):
//!
//! ```toml
//! [simulation]
//! rate_hz = 100.0
//! random_seed = 42      # 0 = random each run
//!
//! [simulation.corridor]
//! width_cm = 60.0
//! start_offset_cm = 8.0
//! start_heading_deg = -5.0
//!
//! [simulation.rangefinder]
//! noise_stddev_v = 0.01
//! failure_rate = 0.0
//!
//! [simulation.buttons]
//! initial_speed_presses = 2
//! stop_after_secs = 20.0
//! ```

pub mod config;
mod corridor_sim;
mod fakes;
mod noise;
mod physics;

pub use config::{
    ButtonScriptConfig, CarConfig, CorridorConfig, RangefinderConfig, SimulationConfig,
};
pub use corridor_sim::{CorridorSimulator, SimAnalogInput, SimServos};
pub use fakes::{MockAnalogInput, MockButtons, MockIndicators, MockServos};
pub use noise::NoiseGenerator;
pub use physics::{CarPhysics, CarPose};
