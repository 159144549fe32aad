//! Distance-based reliability heuristic.
//!
//! IR rangefinders are most trustworthy close up, so confidence grows as the
//! distance shrinks: `c = scale / d`, capped at `ceiling`.

use crate::config::ConfidenceConfig;

#[derive(Debug, Clone)]
pub struct ConfidenceModel {
    scale: f64,
    ceiling: f64,
}

impl ConfidenceModel {
    pub fn new(config: &ConfidenceConfig) -> Self {
        Self {
            scale: config.scale,
            ceiling: config.ceiling,
        }
    }

    /// Uncapped `scale / d`; infinite for `d <= 0`
    #[inline]
    pub fn raw(&self, distance_cm: f64) -> f64 {
        if distance_cm > 0.0 {
            self.scale / distance_cm
        } else {
            f64::INFINITY
        }
    }

    /// Confidence in `[0, ceiling]`
    ///
    /// Zero, negative and NaN distances report the ceiling.
    #[inline]
    pub fn confidence(&self, distance_cm: f64) -> f64 {
        if distance_cm.is_nan() || distance_cm <= 0.0 {
            return self.ceiling;
        }
        self.raw(distance_cm).min(self.ceiling)
    }
}

impl Default for ConfidenceModel {
    fn default() -> Self {
        Self::new(&ConfidenceConfig::default())
    }
}
