//! Perception: raw rangefinder voltages to wall estimates
//!
//! ```text
//! voltage ──DistanceModel──▶ distance_cm ──WallEstimator──▶ WallEstimate
//!                                  └──ConfidenceModel──▶ front/rear confidence
//! ```

pub mod confidence;
pub mod distance;
pub mod wall;

pub use confidence::ConfidenceModel;
pub use distance::{DistanceModel, DistanceSample};
pub use wall::{CorridorReadings, SideReadings, WallEstimate, WallEstimator};
