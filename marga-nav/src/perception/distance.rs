//! IR rangefinder voltage-to-distance conversion.

use crate::config::CalibrationConfig;
use setu_io::{Position, SensorReading, Side};

/// Distance derived from one rangefinder reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceSample {
    pub side: Side,
    pub position: Position,
    pub distance_cm: f64,
}

/// Empirical curve `d = k / (v + offset)`
///
/// Voltages are floored at `min_voltage` first, so the denominator never
/// drops below `offset + min_voltage`.
#[derive(Debug, Clone)]
pub struct DistanceModel {
    k: f64,
    offset: f64,
    min_voltage: f64,
}

impl DistanceModel {
    pub fn new(config: &CalibrationConfig) -> Self {
        Self {
            k: config.k,
            offset: config.offset,
            min_voltage: config.min_voltage,
        }
    }

    /// Distance in cm for a sensor voltage
    #[inline]
    pub fn distance(&self, voltage: f64) -> f64 {
        let v = if voltage.is_finite() {
            voltage.max(self.min_voltage)
        } else {
            self.min_voltage
        };
        self.k / (v + self.offset)
    }

    /// Convert a raw reading
    pub fn sample(&self, reading: &SensorReading) -> DistanceSample {
        DistanceSample {
            side: reading.side,
            position: reading.position,
            distance_cm: self.distance(reading.voltage),
        }
    }
}

impl Default for DistanceModel {
    fn default() -> Self {
        Self::new(&CalibrationConfig::default())
    }
}
