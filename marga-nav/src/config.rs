//! Configuration loading for MargaNav
//!
//! Every tuning constant of the controller lives here. All fields have
//! defaults matching the demo car, so an empty file is a valid configuration.

use crate::error::{NavError, Result};
use crate::steering::StepMode;
use serde::Deserialize;
use setu_io::SensorWiring;
use setu_io::devices::mock::SimulationConfig;
use std::path::Path;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NavConfig {
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    #[serde(default)]
    pub indicator: IndicatorConfig,
    #[serde(default)]
    pub steering: SteeringConfig,
    #[serde(default)]
    pub servo: ServoConfig,
    #[serde(default)]
    pub speed: SpeedConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    /// Analog input of each rangefinder
    #[serde(default)]
    pub channels: SensorWiring,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Board simulation used by the binary
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// IR rangefinder voltage-to-distance curve `d = k / (v + offset)`
#[derive(Clone, Debug, Deserialize)]
pub struct CalibrationConfig {
    /// Curve numerator (default: 18.67)
    #[serde(default = "default_calibration_k")]
    pub k: f64,

    /// Voltage offset (default: 0.167)
    #[serde(default = "default_calibration_offset")]
    pub offset: f64,

    /// Voltages below this are raised to it before conversion (default: 0.0)
    #[serde(default)]
    pub min_voltage: f64,

    /// Voltage substituted when a read fails (default: 0.0)
    #[serde(default)]
    pub fallback_voltage: f64,
}

/// Sensor mounting
#[derive(Clone, Debug, Deserialize)]
pub struct GeometryConfig {
    /// Distance between front and rear rangefinders in cm (default: 10.0)
    #[serde(default = "default_sensor_baseline")]
    pub sensor_baseline_cm: f64,
}

/// Distance-based reliability heuristic `c = scale / d`
#[derive(Clone, Debug, Deserialize)]
pub struct ConfidenceConfig {
    /// Distance at which confidence reaches 1.0 (default: 10.0)
    #[serde(default = "default_confidence_scale")]
    pub scale: f64,

    /// Upper bound on reported confidence (default: 1.0)
    #[serde(default = "default_confidence_ceiling")]
    pub ceiling: f64,
}

/// LED array encoding of wall angle and confidence
#[derive(Clone, Debug, Deserialize)]
pub struct IndicatorConfig {
    /// Angles are clamped to +/- this many degrees (default: 45.0)
    #[serde(default = "default_max_angle")]
    pub max_angle_deg: f64,

    /// Degrees spanned by one half of the array (default: 45.1)
    #[serde(default = "default_angle_span")]
    pub angle_span_deg: f64,

    /// Array mounted mirrored on the car (default: true)
    #[serde(default = "default_inverted")]
    pub inverted: bool,

    /// Red/blue halves when either squared confidence is below this
    #[serde(default = "default_red_blue_dim")]
    pub red_blue_dim: f64,

    /// Red/blue halves again below this
    #[serde(default = "default_red_blue_dimmer")]
    pub red_blue_dimmer: f64,

    /// Red/blue goes dark below this
    #[serde(default = "default_red_blue_dark")]
    pub red_blue_dark: f64,

    /// Green halves when either squared confidence is below this
    #[serde(default = "default_green_dim")]
    pub green_dim: f64,

    /// Green goes dark below this
    #[serde(default = "default_green_dark")]
    pub green_dark: f64,
}

/// Wall-following decision thresholds
#[derive(Clone, Debug, Deserialize)]
pub struct SteeringConfig {
    /// Near wall farther than this is ignored (default: 30 cm)
    #[serde(default = "default_far_wall")]
    pub far_wall_cm: f64,

    /// Near wall closer than this is too close to correct angle (default: 15 cm)
    #[serde(default = "default_close_wall")]
    pub close_wall_cm: f64,

    /// Relative front/rear difference that counts as angled (default: 0.05)
    #[serde(default = "default_importance_threshold")]
    pub importance_threshold: f64,

    /// Coarse steering step in µs (default: 500)
    #[serde(default = "default_coarse_step")]
    pub coarse_step_us: u16,

    /// Fine steering step in µs (default: 300)
    #[serde(default = "default_fine_step")]
    pub fine_step_us: u16,

    /// Step size used at startup (default: fine)
    #[serde(default)]
    pub step_mode: StepMode,

    /// Offset maneuver turn length at standstill speed (default: 5)
    #[serde(default = "default_offset_base_ticks")]
    pub offset_base_ticks: u32,
}

/// Servo pulse limits
#[derive(Clone, Debug, Deserialize)]
pub struct ServoConfig {
    #[serde(default = "default_servo_min")]
    pub min_us: u16,
    #[serde(default = "default_servo_center")]
    pub center_us: u16,
    #[serde(default = "default_servo_max")]
    pub max_us: u16,
}

/// Throttle set point adjusted by the speed switch
#[derive(Clone, Debug, Deserialize)]
pub struct SpeedConfig {
    /// Requested throttle at startup and after wrap-around (default: 1500)
    #[serde(default = "default_speed_default")]
    pub default_us: u16,

    /// Fastest requested throttle (default: 1000)
    #[serde(default = "default_speed_floor")]
    pub floor_us: u16,

    /// Change per press (default: 100)
    #[serde(default = "default_speed_step")]
    pub step_us: u16,
}

/// Loop cadence
#[derive(Clone, Debug, Deserialize)]
pub struct TimingConfig {
    /// Control tick period in ms (default: 50)
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Delay after each steering reposition in ms (default: 10)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Startup self-test flash in ms (default: 500)
    #[serde(default = "default_startup_flash_ms")]
    pub startup_flash_ms: u64,
}

/// Lateral offset samples for the charting collaborator
#[derive(Clone, Debug, Deserialize)]
pub struct TelemetryConfig {
    /// Record one sample per tick (default: true)
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    /// Samples kept before the oldest is overwritten (default: 1200)
    #[serde(default = "default_telemetry_capacity")]
    pub capacity: usize,
}

// Default value functions
fn default_calibration_k() -> f64 {
    18.67
}
fn default_calibration_offset() -> f64 {
    0.167
}
fn default_sensor_baseline() -> f64 {
    10.0
}
fn default_confidence_scale() -> f64 {
    10.0
}
fn default_confidence_ceiling() -> f64 {
    1.0
}
fn default_max_angle() -> f64 {
    45.0
}
fn default_angle_span() -> f64 {
    45.1
}
fn default_inverted() -> bool {
    true
}
fn default_red_blue_dim() -> f64 {
    0.50
}
fn default_red_blue_dimmer() -> f64 {
    0.35
}
fn default_red_blue_dark() -> f64 {
    0.20
}
fn default_green_dim() -> f64 {
    0.60
}
fn default_green_dark() -> f64 {
    0.45
}
fn default_far_wall() -> f64 {
    30.0
}
fn default_close_wall() -> f64 {
    15.0
}
fn default_importance_threshold() -> f64 {
    0.05
}
fn default_coarse_step() -> u16 {
    500
}
fn default_fine_step() -> u16 {
    300
}
fn default_offset_base_ticks() -> u32 {
    5
}
fn default_servo_min() -> u16 {
    1000
}
fn default_servo_center() -> u16 {
    1500
}
fn default_servo_max() -> u16 {
    2000
}
fn default_speed_default() -> u16 {
    1500
}
fn default_speed_floor() -> u16 {
    1000
}
fn default_speed_step() -> u16 {
    100
}
fn default_tick_ms() -> u64 {
    50
}
fn default_settle_ms() -> u64 {
    10
}
fn default_startup_flash_ms() -> u64 {
    500
}
fn default_telemetry_enabled() -> bool {
    true
}
fn default_telemetry_capacity() -> usize {
    1200
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            k: default_calibration_k(),
            offset: default_calibration_offset(),
            min_voltage: 0.0,
            fallback_voltage: 0.0,
        }
    }
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            sensor_baseline_cm: default_sensor_baseline(),
        }
    }
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            scale: default_confidence_scale(),
            ceiling: default_confidence_ceiling(),
        }
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            max_angle_deg: default_max_angle(),
            angle_span_deg: default_angle_span(),
            inverted: default_inverted(),
            red_blue_dim: default_red_blue_dim(),
            red_blue_dimmer: default_red_blue_dimmer(),
            red_blue_dark: default_red_blue_dark(),
            green_dim: default_green_dim(),
            green_dark: default_green_dark(),
        }
    }
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            far_wall_cm: default_far_wall(),
            close_wall_cm: default_close_wall(),
            importance_threshold: default_importance_threshold(),
            coarse_step_us: default_coarse_step(),
            fine_step_us: default_fine_step(),
            step_mode: StepMode::default(),
            offset_base_ticks: default_offset_base_ticks(),
        }
    }
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            min_us: default_servo_min(),
            center_us: default_servo_center(),
            max_us: default_servo_max(),
        }
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            default_us: default_speed_default(),
            floor_us: default_speed_floor(),
            step_us: default_speed_step(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            settle_ms: default_settle_ms(),
            startup_flash_ms: default_startup_flash_ms(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            capacity: default_telemetry_capacity(),
        }
    }
}

impl ServoConfig {
    /// Clamp a pulse width into `[min_us, max_us]`
    #[inline]
    pub fn clamp(&self, pulse_us: i32) -> u16 {
        pulse_us.clamp(self.min_us as i32, self.max_us as i32) as u16
    }
}

impl NavConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NavError::Config(format!("Failed to read config file: {}", e)))?;
        let config: NavConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the controller cannot run with
    pub fn validate(&self) -> Result<()> {
        let servo = &self.servo;
        if !(servo.min_us < servo.center_us && servo.center_us < servo.max_us) {
            return invalid(format!(
                "servo limits must satisfy min < center < max, got {} / {} / {}",
                servo.min_us, servo.center_us, servo.max_us
            ));
        }
        if servo.min_us < setu_io::PULSE_MIN_US || servo.max_us > setu_io::PULSE_MAX_US {
            return invalid(format!(
                "servo limits {}..{} exceed the safe range {}..{}",
                servo.min_us,
                servo.max_us,
                setu_io::PULSE_MIN_US,
                setu_io::PULSE_MAX_US
            ));
        }

        let speed = &self.speed;
        if speed.floor_us < servo.min_us
            || speed.floor_us > speed.default_us
            || speed.default_us > servo.max_us
        {
            return invalid(format!(
                "speed must satisfy servo.min <= floor <= default <= servo.max, got floor {} default {}",
                speed.floor_us, speed.default_us
            ));
        }
        if speed.step_us == 0 {
            return invalid("speed.step_us must be positive".to_string());
        }

        let cal = &self.calibration;
        if cal.k <= 0.0 || cal.offset + cal.min_voltage <= 0.0 {
            return invalid(format!(
                "calibration needs k > 0 and offset + min_voltage > 0, got k={} offset={} min_voltage={}",
                cal.k, cal.offset, cal.min_voltage
            ));
        }
        if self.geometry.sensor_baseline_cm <= 0.0 {
            return invalid("geometry.sensor_baseline_cm must be positive".to_string());
        }
        if self.confidence.scale <= 0.0 || self.confidence.ceiling <= 0.0 {
            return invalid("confidence scale and ceiling must be positive".to_string());
        }

        let ind = &self.indicator;
        if ind.max_angle_deg <= 0.0 || ind.angle_span_deg < ind.max_angle_deg {
            return invalid(format!(
                "indicator.angle_span_deg ({}) must cover max_angle_deg ({})",
                ind.angle_span_deg, ind.max_angle_deg
            ));
        }
        if !(ind.red_blue_dark <= ind.red_blue_dimmer && ind.red_blue_dimmer <= ind.red_blue_dim) {
            return invalid("red/blue thresholds must satisfy dark <= dimmer <= dim".to_string());
        }
        if ind.green_dark > ind.green_dim {
            return invalid("green thresholds must satisfy dark <= dim".to_string());
        }

        let st = &self.steering;
        if st.close_wall_cm >= st.far_wall_cm {
            return invalid(format!(
                "steering.close_wall_cm ({}) must be below far_wall_cm ({})",
                st.close_wall_cm, st.far_wall_cm
            ));
        }
        if st.importance_threshold < 0.0 {
            return invalid("steering.importance_threshold must not be negative".to_string());
        }

        if self.timing.tick_ms == 0 {
            return invalid("timing.tick_ms must be positive".to_string());
        }
        if !self.channels.is_distinct() {
            return invalid("two rangefinders share an analog channel".to_string());
        }
        if self.telemetry.enabled && self.telemetry.capacity == 0 {
            return invalid("telemetry.capacity must be positive".to_string());
        }

        self.simulation
            .validate()
            .map_err(|e| NavError::Config(e.to_string()))
    }
}

fn invalid(message: String) -> Result<()> {
    Err(NavError::Config(message))
}
