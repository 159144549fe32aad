//! Per-side wall geometry from a front/rear rangefinder pair.
//!
//! With front distance `f`, rear distance `r` and sensor baseline `L`:
//!
//! ```text
//! angle         = atan2(r - f, L)       (positive: wall converges toward the front)
//! perpendicular = (f + r) · cos(angle) / 2
//! ```

use super::confidence::ConfidenceModel;
use super::distance::DistanceSample;
use crate::config::GeometryConfig;
use setu_io::{Position, Side};

/// Front and rear distances on one side, in cm
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideReadings {
    pub front_cm: f64,
    pub rear_cm: f64,
}

impl SideReadings {
    pub fn new(front_cm: f64, rear_cm: f64) -> Self {
        Self { front_cm, rear_cm }
    }

    /// Mean of front and rear
    #[inline]
    pub fn average(&self) -> f64 {
        (self.front_cm + self.rear_cm) / 2.0
    }

    /// Front minus rear (positive: nose farther from the wall than the tail)
    #[inline]
    pub fn difference(&self) -> f64 {
        self.front_cm - self.rear_cm
    }
}

/// All four distances of one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorridorReadings {
    pub left: SideReadings,
    pub right: SideReadings,
}

impl CorridorReadings {
    /// Assemble from samples; a side/position not present keeps `fallback_cm`
    pub fn from_samples(samples: &[DistanceSample], fallback_cm: f64) -> Self {
        let mut readings = Self {
            left: SideReadings::new(fallback_cm, fallback_cm),
            right: SideReadings::new(fallback_cm, fallback_cm),
        };
        for sample in samples {
            let side = readings.side_mut(sample.side);
            match sample.position {
                Position::Front => side.front_cm = sample.distance_cm,
                Position::Rear => side.rear_cm = sample.distance_cm,
            }
        }
        readings
    }

    pub fn side(&self, side: Side) -> SideReadings {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut SideReadings {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

/// Estimated wall on one side of the car
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallEstimate {
    pub side: Side,
    /// Wall angle in radians
    pub angle_rad: f64,
    /// Mean perpendicular distance to the wall
    pub perpendicular_cm: f64,
    pub front_confidence: f64,
    pub rear_confidence: f64,
}

impl WallEstimate {
    /// Combined confidence of the pair
    #[inline]
    pub fn confidence(&self) -> f64 {
        self.front_confidence * self.rear_confidence
    }

    #[inline]
    pub fn angle_deg(&self) -> f64 {
        self.angle_rad.to_degrees()
    }
}

#[derive(Debug, Clone)]
pub struct WallEstimator {
    baseline_cm: f64,
    confidence: ConfidenceModel,
}

impl WallEstimator {
    pub fn new(geometry: &GeometryConfig, confidence: ConfidenceModel) -> Self {
        Self {
            baseline_cm: geometry.sensor_baseline_cm,
            confidence,
        }
    }

    /// Wall angle for a front/rear pair
    #[inline]
    pub fn angle(&self, readings: SideReadings) -> f64 {
        (readings.rear_cm - readings.front_cm).atan2(self.baseline_cm)
    }

    /// Estimate the wall on one side
    pub fn estimate(&self, side: Side, readings: SideReadings) -> WallEstimate {
        let angle_rad = self.angle(readings);
        let cos = angle_rad.cos();
        WallEstimate {
            side,
            angle_rad,
            perpendicular_cm: (readings.front_cm * cos + readings.rear_cm * cos) / 2.0,
            front_confidence: self.confidence.confidence(readings.front_cm),
            rear_confidence: self.confidence.confidence(readings.rear_cm),
        }
    }

    /// Estimate both walls
    pub fn estimate_both(&self, readings: &CorridorReadings) -> (WallEstimate, WallEstimate) {
        (
            self.estimate(Side::Left, readings.left),
            self.estimate(Side::Right, readings.right),
        )
    }
}

impl Default for WallEstimator {
    fn default() -> Self {
        Self::new(&GeometryConfig::default(), ConfidenceModel::default())
    }
}
