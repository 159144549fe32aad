//! Reactive wall-following decisions.
//!
//! Only the nearer wall is considered. Its front/rear difference relative to
//! its mean distance says whether the car is angled toward or away from it:
//!
//! ```text
//!                 near wall
//!   ──────────────────────────────────────
//!      rear ▲          front ▲
//!           │                │
//!           └──── car ──────▶│
//!
//!   front > rear: nose swinging away  -> steer back toward the wall
//!   front < rear: nose closing in     -> steer away from the wall
//!   parallel and too close            -> offset maneuver away from the wall
//! ```

use crate::config::{ServoConfig, SteeringConfig};
use crate::perception::{CorridorReadings, SideReadings};
use serde::Deserialize;
use setu_io::Side;
use std::fmt;

/// Steering step size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepMode {
    Coarse,
    #[default]
    Fine,
}

/// Direction the front wheels turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    pub fn opposite(self) -> Self {
        match self {
            TurnDirection::Left => TurnDirection::Right,
            TurnDirection::Right => TurnDirection::Left,
        }
    }

    /// Turning toward a side's wall
    pub fn toward(side: Side) -> Self {
        match side {
            Side::Left => TurnDirection::Left,
            Side::Right => TurnDirection::Right,
        }
    }
}

impl fmt::Display for TurnDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnDirection::Left => write!(f, "left"),
            TurnDirection::Right => write!(f, "right"),
        }
    }
}

/// What one tick does with the steering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteeringDecision {
    HoldStraight,
    NudgeLeft,
    NudgeRight,
    /// Burst that shifts the car left
    OffsetLeft,
    /// Burst that shifts the car right
    OffsetRight,
}

impl SteeringDecision {
    fn nudge(direction: TurnDirection) -> Self {
        match direction {
            TurnDirection::Left => SteeringDecision::NudgeLeft,
            TurnDirection::Right => SteeringDecision::NudgeRight,
        }
    }

    fn offset(direction: TurnDirection) -> Self {
        match direction {
            TurnDirection::Left => SteeringDecision::OffsetLeft,
            TurnDirection::Right => SteeringDecision::OffsetRight,
        }
    }

    /// Direction of the offset burst, if this is one
    pub fn offset_direction(self) -> Option<TurnDirection> {
        match self {
            SteeringDecision::OffsetLeft => Some(TurnDirection::Left),
            SteeringDecision::OffsetRight => Some(TurnDirection::Right),
            _ => None,
        }
    }
}

/// Open-loop turn then counter-turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetManeuver {
    pub direction: TurnDirection,
    /// Sub-ticks turning toward `direction`
    pub turn_ticks: u32,
    /// Sub-ticks turning back
    pub counter_ticks: u32,
}

impl OffsetManeuver {
    /// Steering direction of each sub-tick, in order
    pub fn steps(&self) -> impl Iterator<Item = TurnDirection> {
        let (direction, turn, counter) = (self.direction, self.turn_ticks, self.counter_ticks);
        std::iter::repeat_n(direction, turn as usize)
            .chain(std::iter::repeat_n(direction.opposite(), counter as usize))
    }

    pub fn total_ticks(&self) -> u32 {
        self.turn_ticks + self.counter_ticks
    }
}

#[derive(Debug, Clone)]
pub struct SteeringDecisionEngine {
    config: SteeringConfig,
    servo: ServoConfig,
}

impl SteeringDecisionEngine {
    pub fn new(config: SteeringConfig, servo: ServoConfig) -> Self {
        Self { config, servo }
    }

    /// Decide from the four distances of one tick
    pub fn decide(&self, readings: &CorridorReadings) -> SteeringDecision {
        let left = readings.left.average();
        let right = readings.right.average();

        if left < right {
            self.evaluate_side(Side::Left, readings.left)
        } else if right < left {
            self.evaluate_side(Side::Right, readings.right)
        } else {
            SteeringDecision::HoldStraight
        }
    }

    /// Decide from the nearer wall's readings
    pub fn evaluate_side(&self, side: Side, readings: SideReadings) -> SteeringDecision {
        let average = readings.average();
        // Nearer wall is more than half a hallway away (alcove on the other side)
        if average > self.config.far_wall_cm {
            return SteeringDecision::HoldStraight;
        }

        let difference = readings.difference();
        let importance = difference.abs() / average;
        let too_close = average < self.config.close_wall_cm;

        if importance > self.config.importance_threshold {
            if difference > 0.0 {
                if too_close {
                    SteeringDecision::HoldStraight
                } else {
                    SteeringDecision::nudge(TurnDirection::toward(side))
                }
            } else if difference < 0.0 {
                SteeringDecision::nudge(TurnDirection::toward(side).opposite())
            } else {
                SteeringDecision::HoldStraight
            }
        } else if too_close {
            SteeringDecision::offset(TurnDirection::toward(side).opposite())
        } else {
            SteeringDecision::HoldStraight
        }
    }

    /// Steering step for a mode
    pub fn step_us(&self, mode: StepMode) -> u16 {
        match mode {
            StepMode::Coarse => self.config.coarse_step_us,
            StepMode::Fine => self.config.fine_step_us,
        }
    }

    /// Steering pulse after one nudge, saturating at the servo limits
    pub fn nudge(&self, current_us: u16, direction: TurnDirection, mode: StepMode) -> u16 {
        let step = self.step_us(mode) as i32;
        let target = match direction {
            TurnDirection::Left => current_us as i32 + step,
            TurnDirection::Right => current_us as i32 - step,
        };
        self.servo.clamp(target)
    }

    /// Sub-ticks of the first maneuver phase; shorter at higher speed
    pub fn turn_length(&self, requested_speed_us: u16) -> u32 {
        let base = self.config.offset_base_ticks;
        let span = (self.servo.center_us - self.servo.min_us) as f64;
        let importance =
            ((self.servo.center_us as f64 - requested_speed_us as f64) / span).clamp(0.0, 1.0);
        let adjust = (importance * base as f64 / 2.0).floor() as u32;
        base - adjust
    }

    /// Plan an offset burst at the current requested speed
    pub fn plan_offset(&self, direction: TurnDirection, requested_speed_us: u16) -> OffsetManeuver {
        let turn_ticks = self.turn_length(requested_speed_us);
        OffsetManeuver {
            direction,
            turn_ticks,
            counter_ticks: turn_ticks / 2,
        }
    }

    pub fn center_us(&self) -> u16 {
        self.servo.center_us
    }
}

impl Default for SteeringDecisionEngine {
    fn default() -> Self {
        Self::new(SteeringConfig::default(), ServoConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor(lf: f64, lr: f64, rf: f64, rr: f64) -> CorridorReadings {
        CorridorReadings {
            left: SideReadings::new(lf, lr),
            right: SideReadings::new(rf, rr),
        }
    }

    #[test]
    fn test_equal_sides_hold() {
        let engine = SteeringDecisionEngine::default();
        assert_eq!(
            engine.decide(&corridor(50.0, 50.0, 50.0, 50.0)),
            SteeringDecision::HoldStraight
        );
        assert_eq!(
            engine.decide(&corridor(10.0, 14.0, 14.0, 10.0)),
            SteeringDecision::HoldStraight
        );
        // Both averages 50 while each side is angled
        assert_eq!(
            engine.decide(&corridor(40.0, 60.0, 60.0, 40.0)),
            SteeringDecision::HoldStraight
        );
    }

    #[test]
    fn test_far_near_wall_holds() {
        let engine = SteeringDecisionEngine::default();
        assert_eq!(
            engine.decide(&corridor(31.0, 40.0, 60.0, 60.0)),
            SteeringDecision::HoldStraight
        );
    }

    #[test]
    fn test_close_parallel_left_offsets_right() {
        let engine = SteeringDecisionEngine::default();
        assert_eq!(
            engine.decide(&corridor(12.0, 12.0, 40.0, 40.0)),
            SteeringDecision::OffsetRight
        );
    }

    #[test]
    fn test_close_parallel_right_offsets_left() {
        let engine = SteeringDecisionEngine::default();
        assert_eq!(
            engine.decide(&corridor(40.0, 40.0, 12.0, 12.3)),
            SteeringDecision::OffsetLeft
        );
    }

    #[test]
    fn test_left_nose_away_nudges_left() {
        let engine = SteeringDecisionEngine::default();
        assert_eq!(
            engine.decide(&corridor(24.0, 20.0, 40.0, 40.0)),
            SteeringDecision::NudgeLeft
        );
    }

    #[test]
    fn test_left_nose_in_nudges_right() {
        let engine = SteeringDecisionEngine::default();
        assert_eq!(
            engine.decide(&corridor(18.0, 22.0, 40.0, 40.0)),
            SteeringDecision::NudgeRight
        );
        // Turning away applies even when very close
        assert_eq!(
            engine.decide(&corridor(10.0, 13.0, 40.0, 40.0)),
            SteeringDecision::NudgeRight
        );
    }

    #[test]
    fn test_right_side_mirrors_left() {
        let engine = SteeringDecisionEngine::default();
        assert_eq!(
            engine.decide(&corridor(40.0, 40.0, 24.0, 20.0)),
            SteeringDecision::NudgeRight
        );
        assert_eq!(
            engine.decide(&corridor(40.0, 40.0, 18.0, 22.0)),
            SteeringDecision::NudgeLeft
        );
    }

    #[test]
    fn test_too_close_to_correct_angle_holds() {
        let engine = SteeringDecisionEngine::default();
        assert_eq!(
            engine.decide(&corridor(14.0, 12.0, 40.0, 40.0)),
            SteeringDecision::HoldStraight
        );
    }

    #[test]
    fn test_small_difference_mid_range_holds() {
        let engine = SteeringDecisionEngine::default();
        assert_eq!(
            engine.decide(&corridor(20.5, 20.0, 40.0, 40.0)),
            SteeringDecision::HoldStraight
        );
    }

    #[test]
    fn test_turn_length() {
        let engine = SteeringDecisionEngine::default();
        assert_eq!(engine.turn_length(1500), 5);
        assert_eq!(engine.turn_length(1000), 3);
        assert_eq!(engine.turn_length(1200), 4);
        // Reverse throttle weighs as standstill
        assert_eq!(engine.turn_length(1700), 5);
    }

    #[test]
    fn test_offset_plan_steps() {
        let engine = SteeringDecisionEngine::default();
        let plan = engine.plan_offset(TurnDirection::Left, 1500);
        assert_eq!(plan.turn_ticks, 5);
        assert_eq!(plan.counter_ticks, 2);
        let steps: Vec<_> = plan.steps().collect();
        assert_eq!(
            steps,
            vec![
                TurnDirection::Left,
                TurnDirection::Left,
                TurnDirection::Left,
                TurnDirection::Left,
                TurnDirection::Left,
                TurnDirection::Right,
                TurnDirection::Right,
            ]
        );

        let fast = engine.plan_offset(TurnDirection::Right, 1000);
        assert_eq!((fast.turn_ticks, fast.counter_ticks), (3, 1));
        assert_eq!(fast.total_ticks(), 4);
    }

    #[test]
    fn test_nudge_saturates() {
        let engine = SteeringDecisionEngine::default();
        assert_eq!(engine.nudge(1500, TurnDirection::Left, StepMode::Fine), 1800);
        assert_eq!(engine.nudge(1800, TurnDirection::Left, StepMode::Fine), 2000);
        assert_eq!(engine.nudge(1500, TurnDirection::Right, StepMode::Coarse), 1000);
        assert_eq!(engine.nudge(1000, TurnDirection::Right, StepMode::Coarse), 1000);
    }

    #[test]
    fn test_step_mode_defaults_to_fine() {
        assert_eq!(StepMode::default(), StepMode::Fine);
    }
}
