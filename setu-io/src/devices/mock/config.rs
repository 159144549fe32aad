//! Corridor simulation configuration
//!
//! Every parameter has a default matching the demo car and the hallway it was
//! tuned in, so an empty `[simulation]` table gives a working setup.
//!
//! # Configuration Hierarchy
//!
//! ```text
//! SimulationConfig
//! ├── rate_hz, random_seed           # Simulation control
//! ├── CorridorConfig                 # Hallway geometry and start pose
//! ├── CarConfig                      # Sensor mounting and speed limits
//! ├── RangefinderConfig              # IR curve, range limits, noise
//! └── ButtonScriptConfig             # Scripted switch presses
//! ```
//!
//! # Default Values
//!
//! | Parameter | Default | Source |
//! |-----------|---------|--------|
//! | corridor width | 60 cm | Measured hallway mockup |
//! | sensor_spacing | 10 cm | Matches controller baseline |
//! | calibration | 18.67 / (v + 0.167) | Empirical fit |
//! | range | 8-80 cm | Sharp GP2D12 datasheet |

use crate::error::{Error, Result};
use serde::Deserialize;

/// Top-level simulation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Physics update rate
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f64,

    /// Noise seed (0 = random each run)
    #[serde(default)]
    pub random_seed: u64,

    #[serde(default)]
    pub corridor: CorridorConfig,

    #[serde(default)]
    pub car: CarConfig,

    #[serde(default)]
    pub rangefinder: RangefinderConfig,

    #[serde(default)]
    pub buttons: ButtonScriptConfig,
}

fn default_rate_hz() -> f64 {
    100.0
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rate_hz: default_rate_hz(),
            random_seed: 0,
            corridor: CorridorConfig::default(),
            car: CarConfig::default(),
            rangefinder: RangefinderConfig::default(),
            buttons: ButtonScriptConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Reject parameters the physics cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.rate_hz <= 0.0 {
            return Err(Error::Config(format!(
                "simulation.rate_hz must be positive, got {}",
                self.rate_hz
            )));
        }
        if self.corridor.width_cm <= 2.0 * self.car.half_width_cm {
            return Err(Error::Config(format!(
                "corridor ({} cm) is narrower than the car ({} cm)",
                self.corridor.width_cm,
                2.0 * self.car.half_width_cm
            )));
        }
        if self.rangefinder.min_range_cm <= 0.0
            || self.rangefinder.max_range_cm <= self.rangefinder.min_range_cm
        {
            return Err(Error::Config(format!(
                "invalid rangefinder range {}..{} cm",
                self.rangefinder.min_range_cm, self.rangefinder.max_range_cm
            )));
        }
        if !(0.0..=1.0).contains(&self.rangefinder.failure_rate) {
            return Err(Error::Config(format!(
                "rangefinder.failure_rate must be in [0, 1], got {}",
                self.rangefinder.failure_rate
            )));
        }
        Ok(())
    }
}

/// Straight hallway the car drives along
#[derive(Debug, Clone, Deserialize)]
pub struct CorridorConfig {
    /// Wall-to-wall width
    #[serde(default = "default_width_cm")]
    pub width_cm: f64,

    /// Start offset from the centerline (positive = toward the left wall)
    #[serde(default)]
    pub start_offset_cm: f64,

    /// Start heading relative to the corridor axis (positive = nose left)
    #[serde(default)]
    pub start_heading_deg: f64,
}

fn default_width_cm() -> f64 {
    60.0
}

impl Default for CorridorConfig {
    fn default() -> Self {
        Self {
            width_cm: default_width_cm(),
            start_offset_cm: 0.0,
            start_heading_deg: 0.0,
        }
    }
}

/// Car body and drive limits
#[derive(Debug, Clone, Deserialize)]
pub struct CarConfig {
    /// Distance between front and rear rangefinders
    #[serde(default = "default_sensor_spacing_cm")]
    pub sensor_spacing_cm: f64,

    /// Rangefinder lateral offset from the car's centerline
    #[serde(default = "default_half_width_cm")]
    pub half_width_cm: f64,

    /// Forward speed at full throttle (1000 µs)
    #[serde(default = "default_max_speed_cm_s")]
    pub max_speed_cm_s: f64,

    /// Yaw rate at full steering lock and full speed
    #[serde(default = "default_max_yaw_rate_deg_s")]
    pub max_yaw_rate_deg_s: f64,
}

fn default_sensor_spacing_cm() -> f64 {
    10.0
}
fn default_half_width_cm() -> f64 {
    5.0
}
fn default_max_speed_cm_s() -> f64 {
    60.0
}
fn default_max_yaw_rate_deg_s() -> f64 {
    90.0
}

impl Default for CarConfig {
    fn default() -> Self {
        Self {
            sensor_spacing_cm: default_sensor_spacing_cm(),
            half_width_cm: default_half_width_cm(),
            max_speed_cm_s: default_max_speed_cm_s(),
            max_yaw_rate_deg_s: default_max_yaw_rate_deg_s(),
        }
    }
}

/// IR rangefinder model
#[derive(Debug, Clone, Deserialize)]
pub struct RangefinderConfig {
    /// Numerator of the distance curve `d = k / (v + offset)`
    #[serde(default = "default_calibration_k")]
    pub calibration_k: f64,

    /// Voltage offset of the distance curve
    #[serde(default = "default_calibration_offset")]
    pub calibration_offset: f64,

    /// Closest distance the sensor resolves
    #[serde(default = "default_min_range_cm")]
    pub min_range_cm: f64,

    /// Farthest distance the sensor resolves
    #[serde(default = "default_max_range_cm")]
    pub max_range_cm: f64,

    /// Voltage noise standard deviation
    #[serde(default = "default_noise_stddev_v")]
    pub noise_stddev_v: f64,

    /// Probability that a read fails with an I/O error (0.0-1.0)
    #[serde(default)]
    pub failure_rate: f64,
}

fn default_calibration_k() -> f64 {
    18.67
}
fn default_calibration_offset() -> f64 {
    0.167
}
fn default_min_range_cm() -> f64 {
    8.0
}
fn default_max_range_cm() -> f64 {
    80.0
}
fn default_noise_stddev_v() -> f64 {
    0.01
}

impl Default for RangefinderConfig {
    fn default() -> Self {
        Self {
            calibration_k: default_calibration_k(),
            calibration_offset: default_calibration_offset(),
            min_range_cm: default_min_range_cm(),
            max_range_cm: default_max_range_cm(),
            noise_stddev_v: default_noise_stddev_v(),
            failure_rate: 0.0,
        }
    }
}

impl RangefinderConfig {
    /// Noise-free voltage the sensor reports for a true distance
    ///
    /// Inverse of the calibration curve, with the distance held inside the
    /// sensor's resolvable range.
    pub fn voltage_at(&self, distance_cm: f64) -> f64 {
        let d = if distance_cm.is_finite() {
            distance_cm.clamp(self.min_range_cm, self.max_range_cm)
        } else {
            self.max_range_cm
        };
        (self.calibration_k / d - self.calibration_offset).max(0.0)
    }
}

/// Scripted switch presses, standing in for a person at the car
#[derive(Debug, Clone, Deserialize)]
pub struct ButtonScriptConfig {
    /// SW1 presses sent once a listener subscribes (each lowers speed 100 µs)
    #[serde(default = "default_initial_speed_presses")]
    pub initial_speed_presses: u32,

    /// Press SW2 after this many seconds (0 = never)
    #[serde(default)]
    pub stop_after_secs: f64,
}

fn default_initial_speed_presses() -> u32 {
    2
}

impl Default for ButtonScriptConfig {
    fn default() -> Self {
        Self {
            initial_speed_presses: default_initial_speed_presses(),
            stop_after_secs: 0.0,
        }
    }
}
