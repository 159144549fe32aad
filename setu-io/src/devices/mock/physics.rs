//! Kinematics for the simulated car in a straight corridor
//!
//! Servo pulses map linearly to speed and yaw rate around the 1500 µs center.
//! The corridor runs along +x; lateral offset is measured from the centerline,
//! positive toward the left wall.

use super::config::{CarConfig, CorridorConfig};
use crate::core::types::{PULSE_CENTER_US, Position, Side};
use std::f64::consts::FRAC_PI_2;

/// Half the servo travel (µs from center to either end)
const PULSE_HALF_SPAN_US: f64 = 500.0;

/// Heading limit; the car cannot turn to face a wall head-on
const MAX_HEADING_RAD: f64 = FRAC_PI_2 - 0.1;

/// Pose of the simulated car
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarPose {
    /// Distance travelled along the corridor
    pub travelled_cm: f64,
    /// Offset from the centerline (positive = left)
    pub lateral_cm: f64,
    /// Heading relative to the corridor axis (positive = nose left)
    pub heading_rad: f64,
}

/// Physics state for the simulated car
pub struct CarPhysics {
    pose: CarPose,
}

impl CarPhysics {
    /// Create physics state at the configured start pose
    pub fn new(corridor: &CorridorConfig) -> Self {
        Self {
            pose: CarPose {
                travelled_cm: 0.0,
                lateral_cm: corridor.start_offset_cm,
                heading_rad: corridor
                    .start_heading_deg
                    .to_radians()
                    .clamp(-MAX_HEADING_RAD, MAX_HEADING_RAD),
            },
        }
    }

    #[inline]
    pub fn pose(&self) -> CarPose {
        self.pose
    }

    /// Advance by `dt` seconds under the given servo pulses
    ///
    /// Returns true if the car body touched a wall during the step.
    pub fn update(
        &mut self,
        dt: f64,
        steering_us: u16,
        throttle_us: u16,
        car: &CarConfig,
        corridor: &CorridorConfig,
    ) -> bool {
        // Below center drives forward, above center turns left
        let throttle = pulse_fraction(PULSE_CENTER_US, throttle_us);
        let steer = pulse_fraction(steering_us, PULSE_CENTER_US);

        let speed = throttle * car.max_speed_cm_s;
        // Steering only yaws the car while it rolls
        let yaw_rate = steer * car.max_yaw_rate_deg_s.to_radians() * throttle;

        let pose = &mut self.pose;
        pose.heading_rad =
            (pose.heading_rad + yaw_rate * dt).clamp(-MAX_HEADING_RAD, MAX_HEADING_RAD);
        let (sin_h, cos_h) = pose.heading_rad.sin_cos();
        pose.travelled_cm += speed * cos_h * dt;
        pose.lateral_cm += speed * sin_h * dt;

        let limit = corridor.width_cm / 2.0 - car.half_width_cm;
        if pose.lateral_cm.abs() > limit {
            pose.lateral_cm = pose.lateral_cm.clamp(-limit, limit);
            return true;
        }
        false
    }

    /// True distance along a rangefinder's beam to its wall
    ///
    /// Beams are perpendicular to the car body. Returns infinity when the
    /// beam runs parallel to the walls.
    pub fn beam_distance(
        &self,
        side: Side,
        position: Position,
        car: &CarConfig,
        corridor: &CorridorConfig,
    ) -> f64 {
        let along = match position {
            Position::Front => car.sensor_spacing_cm / 2.0,
            Position::Rear => -car.sensor_spacing_cm / 2.0,
        };
        let (sin_h, cos_h) = self.pose.heading_rad.sin_cos();
        if cos_h <= 1e-6 {
            return f64::INFINITY;
        }
        let half_width = corridor.width_cm / 2.0;

        match side {
            Side::Left => {
                let y = self.pose.lateral_cm + along * sin_h + car.half_width_cm * cos_h;
                ((half_width - y) / cos_h).max(0.0)
            }
            Side::Right => {
                let y = self.pose.lateral_cm + along * sin_h - car.half_width_cm * cos_h;
                ((y + half_width) / cos_h).max(0.0)
            }
        }
    }
}

/// `(a - b)` as a fraction of the servo half-span, clamped to [-1, 1]
#[inline]
fn pulse_fraction(a: u16, b: u16) -> f64 {
    ((a as f64 - b as f64) / PULSE_HALF_SPAN_US).clamp(-1.0, 1.0)
}
