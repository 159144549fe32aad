//! Core data types for the servo car board.
//!
//! Key types for driver implementers:
//! - [`AnalogChannel`] / [`ServoChannel`]: where a reading comes from or a pulse goes to
//! - [`ButtonEvent`]: switch notifications delivered by a [`crate::core::driver::ButtonSource`]
//! - [`Rgb`]: indicator cell color

use serde::{Deserialize, Serialize};
use std::fmt;

/// Servo pulse width for straight steering / stopped throttle
pub const PULSE_CENTER_US: u16 = 1500;

/// Lowest safe servo pulse width (full right / full forward)
pub const PULSE_MIN_US: u16 = 1000;

/// Highest safe servo pulse width (full left / full reverse)
pub const PULSE_MAX_US: u16 = 2000;

/// Cells on the board's tri-color LED array
pub const INDICATOR_CELLS: usize = 8;

/// Side of the vehicle a rangefinder looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Mounting position of a rangefinder along the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Front,
    Rear,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Front => write!(f, "front"),
            Position::Rear => write!(f, "rear"),
        }
    }
}

/// Analog input pin (A0..A3 on the demo board)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalogChannel(pub u8);

impl fmt::Display for AnalogChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{}", self.0)
    }
}

/// Servo output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServoChannel {
    /// Front wheel steering (above center turns left)
    Steering,
    /// Drive motor (below center drives forward)
    Throttle,
}

impl fmt::Display for ServoChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServoChannel::Steering => write!(f, "steering"),
            ServoChannel::Throttle => write!(f, "throttle"),
        }
    }
}

/// Raw voltage from one rangefinder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub side: Side,
    pub position: Position,
    pub voltage: f64,
}

/// Which analog input each rangefinder is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorWiring {
    #[serde(default = "default_right_front")]
    pub right_front: AnalogChannel,
    #[serde(default = "default_left_front")]
    pub left_front: AnalogChannel,
    #[serde(default = "default_right_rear")]
    pub right_rear: AnalogChannel,
    #[serde(default = "default_left_rear")]
    pub left_rear: AnalogChannel,
}

fn default_right_front() -> AnalogChannel {
    AnalogChannel(0)
}
fn default_left_front() -> AnalogChannel {
    AnalogChannel(1)
}
fn default_right_rear() -> AnalogChannel {
    AnalogChannel(2)
}
fn default_left_rear() -> AnalogChannel {
    AnalogChannel(3)
}

impl Default for SensorWiring {
    fn default() -> Self {
        Self {
            right_front: default_right_front(),
            left_front: default_left_front(),
            right_rear: default_right_rear(),
            left_rear: default_left_rear(),
        }
    }
}

impl SensorWiring {
    /// Channel wired to a rangefinder
    pub fn channel(&self, side: Side, position: Position) -> AnalogChannel {
        match (side, position) {
            (Side::Left, Position::Front) => self.left_front,
            (Side::Left, Position::Rear) => self.left_rear,
            (Side::Right, Position::Front) => self.right_front,
            (Side::Right, Position::Rear) => self.right_rear,
        }
    }

    /// Rangefinder wired to a channel, if any
    pub fn sensor(&self, channel: AnalogChannel) -> Option<(Side, Position)> {
        Self::SENSORS
            .into_iter()
            .find(|&(side, position)| self.channel(side, position) == channel)
    }

    /// True when no two rangefinders share a channel
    pub fn is_distinct(&self) -> bool {
        let channels = Self::SENSORS.map(|(side, position)| self.channel(side, position));
        channels
            .iter()
            .enumerate()
            .all(|(i, a)| channels[i + 1..].iter().all(|b| a != b))
    }

    /// All four rangefinders in read order
    pub const SENSORS: [(Side, Position); 4] = [
        (Side::Right, Position::Rear),
        (Side::Right, Position::Front),
        (Side::Left, Position::Front),
        (Side::Left, Position::Rear),
    ];
}

/// Physical push switches on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Switch {
    Sw1,
    Sw2,
}

/// What happened to a switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Pressed,
    Released,
}

/// Switch notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub switch: Switch,
    pub action: ButtonAction,
}

impl ButtonEvent {
    pub fn pressed(switch: Switch) -> Self {
        Self {
            switch,
            action: ButtonAction::Pressed,
        }
    }

    pub fn released(switch: Switch) -> Self {
        Self {
            switch,
            action: ButtonAction::Released,
        }
    }
}

/// Tri-color LED intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb::new(0, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// True when every channel is zero
    pub fn is_off(&self) -> bool {
        *self == Rgb::OFF
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_wiring() {
        let wiring = SensorWiring::default();
        assert!(wiring.is_distinct());
        assert_eq!(wiring.channel(Side::Right, Position::Front), AnalogChannel(0));
        assert_eq!(wiring.channel(Side::Left, Position::Rear), AnalogChannel(3));
        assert_eq!(
            wiring.sensor(AnalogChannel(1)),
            Some((Side::Left, Position::Front))
        );
        assert_eq!(wiring.sensor(AnalogChannel(7)), None);
    }

    #[test]
    fn test_wiring_detects_shared_channel() {
        let wiring = SensorWiring {
            left_rear: AnalogChannel(0),
            ..Default::default()
        };
        assert!(!wiring.is_distinct());
    }

    #[test]
    fn test_channel_deserialize() {
        #[derive(Deserialize)]
        struct Wiring {
            front: AnalogChannel,
            side: Side,
        }

        let wiring: Wiring = toml::from_str("front = 3\nside = \"left\"").unwrap();
        assert_eq!(wiring.front, AnalogChannel(3));
        assert_eq!(wiring.side, Side::Left);
        assert_eq!(wiring.front.to_string(), "A3");
    }
}
