//! LED array encoding of wall angle and confidence.
//!
//! Each side lights one cell of the 8-cell array. The cell encodes the wall
//! angle; its color encodes how much the side's readings can be trusted.
//!
//! | Side | Red | Green | Blue |
//! |------|-----|-------|------|
//! | Left | [`IndicatorMapper::red_blue`] | [`IndicatorMapper::green`] | 0 |
//! | Right | 0 | [`IndicatorMapper::green`] | [`IndicatorMapper::red_blue`] |
//!
//! Red/blue fades in as confidence drops, green fades out, so a close and
//! parallel wall shows green and a distant one shows a dim red or blue.
//!
//! # Angle to cell (before mirroring)
//!
//! ```text
//! cell:     0     1     2     3  |  4     5     6     7
//! angle:  +45°  ...   ...   0°  | -0°   ...   ...  -45°
//! ```

use crate::config::IndicatorConfig;
use crate::perception::WallEstimate;
use setu_io::{INDICATOR_CELLS, Rgb};

const HALF: usize = INDICATOR_CELLS / 2;

/// Color of one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorState {
    pub index: usize,
    pub color: Rgb,
}

/// Colors for the whole array, rebuilt every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndicatorFrame {
    cells: [Rgb; INDICATOR_CELLS],
}

impl IndicatorFrame {
    /// Every cell dark
    pub fn dark() -> Self {
        Self::default()
    }

    /// Every cell the same color
    pub fn filled(color: Rgb) -> Self {
        Self {
            cells: [color; INDICATOR_CELLS],
        }
    }

    pub fn cell(&self, index: usize) -> Option<Rgb> {
        self.cells.get(index).copied()
    }

    pub fn states(&self) -> impl Iterator<Item = IndicatorState> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(index, &color)| IndicatorState { index, color })
    }

    /// Cells with any channel lit
    pub fn lit(&self) -> Vec<IndicatorState> {
        self.states().filter(|s| !s.color.is_off()).collect()
    }
}

/// Mirror a cell index across the array
#[inline]
pub fn invert(index: usize) -> usize {
    (INDICATOR_CELLS - 1).saturating_sub(index)
}

#[derive(Debug, Clone)]
pub struct IndicatorMapper {
    config: IndicatorConfig,
}

impl IndicatorMapper {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    /// Cell for an angle in degrees, honoring the mirrored layout
    pub fn angle_to_index(&self, angle_deg: f64) -> usize {
        let index = self.unmirrored_index(angle_deg);
        if self.config.inverted {
            invert(index)
        } else {
            index
        }
    }

    /// Cell for an angle in degrees with cell 0 at +max
    pub fn unmirrored_index(&self, angle_deg: f64) -> usize {
        let max = self.config.max_angle_deg;
        let angle = if angle_deg.is_nan() {
            0.0
        } else {
            angle_deg.clamp(-max, max)
        };
        let offset = |a: f64| {
            let steps = (a / self.config.angle_span_deg * HALF as f64).floor() as usize;
            steps.min(HALF - 1)
        };
        if angle >= 0.0 {
            HALF - 1 - offset(angle)
        } else {
            HALF + offset(-angle)
        }
    }

    /// Red (left) or blue (right) intensity for a front/rear confidence pair
    pub fn red_blue(&self, c1: f64, c2: f64) -> u8 {
        let (sq1, sq2) = (c1 * c1, c2 * c2);
        let below = |threshold: f64| sq1 < threshold || sq2 < threshold;

        let mut intensity = 255i64.saturating_sub(scaled(c1 * c2));
        if below(self.config.red_blue_dim) {
            intensity /= 2;
        }
        if below(self.config.red_blue_dimmer) {
            intensity /= 2;
        }
        if below(self.config.red_blue_dark) {
            intensity = 0;
        }
        clamp_channel(intensity)
    }

    /// Green intensity for a front/rear confidence pair
    pub fn green(&self, c1: f64, c2: f64) -> u8 {
        let (sq1, sq2) = (c1 * c1, c2 * c2);
        let below = |threshold: f64| sq1 < threshold || sq2 < threshold;

        let mut intensity = scaled(c1 * c2);
        if below(self.config.green_dim) {
            intensity /= 2;
        }
        if below(self.config.green_dark) {
            intensity = 0;
        }
        clamp_channel(intensity)
    }

    /// Compose the frame for both walls
    ///
    /// The right wall's angle is negated so a car yawed toward either wall
    /// moves both cells in the same direction. When both sides pick the same
    /// cell, red and blue come from the left side and green is the brighter
    /// of the two.
    pub fn compose(&self, left: &WallEstimate, right: &WallEstimate) -> IndicatorFrame {
        let left_index = self.angle_to_index(left.angle_deg());
        let right_index = self.angle_to_index(-right.angle_deg());

        let left_color = Rgb::new(
            self.red_blue(left.front_confidence, left.rear_confidence),
            self.green(left.front_confidence, left.rear_confidence),
            0,
        );
        let right_color = Rgb::new(
            0,
            self.green(right.front_confidence, right.rear_confidence),
            self.red_blue(right.front_confidence, right.rear_confidence),
        );

        let mut frame = IndicatorFrame::dark();
        if left_index == right_index {
            frame.cells[left_index] = Rgb::new(
                left_color.red,
                left_color.green.max(right_color.green),
                left_color.blue,
            );
        } else {
            frame.cells[left_index] = left_color;
            frame.cells[right_index] = right_color;
        }
        frame
    }
}

impl Default for IndicatorMapper {
    fn default() -> Self {
        Self::new(IndicatorConfig::default())
    }
}

/// `round(256 · x)` as an integer, saturating
#[inline]
fn scaled(x: f64) -> i64 {
    (256.0 * x).round() as i64
}

#[inline]
fn clamp_channel(intensity: i64) -> u8 {
    intensity.clamp(0, 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use setu_io::Side;

    fn plain() -> IndicatorMapper {
        IndicatorMapper::new(IndicatorConfig {
            inverted: false,
            ..Default::default()
        })
    }

    fn wall(side: Side, angle_deg: f64, front: f64, rear: f64) -> WallEstimate {
        WallEstimate {
            side,
            angle_rad: angle_deg.to_radians(),
            perpendicular_cm: 20.0,
            front_confidence: front,
            rear_confidence: rear,
        }
    }

    #[test]
    fn test_zero_angle_is_cell_three() {
        assert_eq!(plain().angle_to_index(0.0), 3);
        assert_eq!(plain().angle_to_index(f64::NAN), 3);
    }

    #[test]
    fn test_index_steps() {
        let mapper = plain();
        assert_eq!(mapper.angle_to_index(11.0), 3);
        assert_eq!(mapper.angle_to_index(12.0), 2);
        assert_eq!(mapper.angle_to_index(30.0), 1);
        assert_eq!(mapper.angle_to_index(45.0), 0);
        assert_eq!(mapper.angle_to_index(-0.5), 4);
        assert_eq!(mapper.angle_to_index(-12.0), 5);
        assert_eq!(mapper.angle_to_index(-45.0), 7);
    }

    #[test]
    fn test_saturates_beyond_limit() {
        let mapper = plain();
        assert_eq!(mapper.angle_to_index(90.0), 0);
        assert_eq!(mapper.angle_to_index(-90.0), 7);
        assert_eq!(mapper.angle_to_index(f64::INFINITY), 0);
    }

    #[test]
    fn test_index_stays_in_range_when_span_equals_limit() {
        let mapper = IndicatorMapper::new(IndicatorConfig {
            inverted: false,
            angle_span_deg: 45.0,
            ..Default::default()
        });
        assert_eq!(mapper.angle_to_index(45.0), 0);
        assert_eq!(mapper.angle_to_index(-45.0), 7);
    }

    #[test]
    fn test_invert_is_self_inverse() {
        for i in 0..INDICATOR_CELLS {
            assert_eq!(invert(invert(i)), i);
        }
        assert_eq!(invert(0), 7);
        assert_eq!(invert(3), 4);
    }

    #[test]
    fn test_mirrored_layout() {
        let mapper = IndicatorMapper::default();
        assert_eq!(mapper.angle_to_index(0.0), 4);
        assert_eq!(mapper.angle_to_index(45.0), 7);
    }

    #[test]
    fn test_full_confidence_colors() {
        let mapper = plain();
        assert_eq!(mapper.green(1.0, 1.0), 255);
        assert_eq!(mapper.red_blue(1.0, 1.0), 0);
    }

    #[test]
    fn test_staged_attenuation() {
        let mapper = plain();
        // c² = 0.49: red/blue halved once, green halved
        let c = 0.7;
        assert_eq!(mapper.red_blue(c, c), ((255 - 125) / 2) as u8);
        assert_eq!(mapper.green(c, c), (125 / 2) as u8);
        // c² = 0.25: red/blue halved twice, green dark
        assert_eq!(mapper.red_blue(0.5, 0.5), ((255 - 64) / 2 / 2) as u8);
        assert_eq!(mapper.green(0.5, 0.5), 0);
        // c² = 0.16: everything dark
        assert_eq!(mapper.red_blue(0.4, 0.4), 0);
        assert_eq!(mapper.green(0.4, 0.4), 0);
    }

    #[test]
    fn test_one_weak_reading_attenuates() {
        let mapper = plain();
        assert_eq!(mapper.green(1.0, 0.6), 0);
        assert_eq!(mapper.red_blue(1.0, 0.3), 0);
    }

    #[test]
    fn test_degenerate_confidences_clamped() {
        let mapper = plain();
        for &(c1, c2) in &[(50.0, 50.0), (1e9, 3.0), (f64::INFINITY, 1.0), (0.0, 0.0)] {
            // Must not panic; u8 output is inherently in range
            let _ = mapper.red_blue(c1, c2);
            let _ = mapper.green(c1, c2);
        }
        assert_eq!(mapper.green(50.0, 50.0), 255);
        assert_eq!(mapper.red_blue(50.0, 50.0), 0);
        assert_eq!(mapper.green(f64::NAN, f64::NAN), 0);
    }

    #[test]
    fn test_compose_separate_cells() {
        let mapper = plain();
        let left = wall(Side::Left, 30.0, 1.0, 1.0);
        let right = wall(Side::Right, 30.0, 1.0, 1.0);
        let frame = mapper.compose(&left, &right);

        // Left at +30° -> cell 1; right negated to -30° -> cell 6
        assert_eq!(frame.cell(1), Some(Rgb::new(0, 255, 0)));
        assert_eq!(frame.cell(6), Some(Rgb::new(0, 255, 0)));
        assert_eq!(frame.lit().len(), 2);
    }

    #[test]
    fn test_compose_overlap_rule() {
        let mapper = plain();
        let left = wall(Side::Left, 5.0, 0.7, 0.7);
        let right = wall(Side::Right, -5.0, 1.0, 1.0);
        let frame = mapper.compose(&left, &right);

        let lit = frame.lit();
        assert_eq!(lit.len(), 1);
        assert_eq!(lit[0].index, 3);
        assert_eq!(
            lit[0].color,
            Rgb::new(mapper.red_blue(0.7, 0.7), 255, 0)
        );
    }

    #[test]
    fn test_compose_low_confidence_is_dark() {
        let mapper = plain();
        let left = wall(Side::Left, 0.0, 0.2, 0.2);
        let right = wall(Side::Right, 20.0, 0.2, 0.2);
        assert_eq!(mapper.compose(&left, &right), IndicatorFrame::dark());
    }
}
