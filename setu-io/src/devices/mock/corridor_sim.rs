//! Threaded corridor simulation
//!
//! Runs the car physics on its own thread at a fixed rate and exposes the
//! board's capabilities as driver handles:
//!
//! | Handle | Trait | Backed by |
//! |--------|-------|-----------|
//! | [`SimAnalogInput`] | `AnalogInputSource` | Beam geometry + IR curve + noise |
//! | [`SimServos`] | `ActuatorOutput` | Pulses fed into the physics |
//! | [`MockIndicators`] | `IndicatorArray` | In-memory cells, logged at debug |
//! | [`MockButtons`] | `ButtonSource` | Script thread (speed presses, timed stop) |

use super::config::SimulationConfig;
use super::fakes::{MockButtons, MockIndicators};
use super::noise::NoiseGenerator;
use super::physics::{CarPhysics, CarPose};
use crate::core::driver::{ActuatorOutput, AnalogInputSource};
use crate::core::types::{
    AnalogChannel, INDICATOR_CELLS, PULSE_CENTER_US, SensorWiring, ServoChannel, Switch,
};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Mutable simulation state, guarded by one lock
struct SimState {
    physics: CarPhysics,
    steering_us: u16,
    throttle_us: u16,
    noise: NoiseGenerator,
    wall_contacts: u64,
}

/// State shared between the simulation thread and driver handles
struct Shared {
    config: SimulationConfig,
    wiring: SensorWiring,
    state: Mutex<SimState>,
    shutdown: AtomicBool,
}

/// Hardware-free stand-in for the car and its hallway
pub struct CorridorSimulator {
    shared: Arc<Shared>,
    indicators: MockIndicators,
    buttons: MockButtons,
    handles: Vec<JoinHandle<()>>,
}

impl CorridorSimulator {
    /// Validate the configuration and start the simulation threads
    pub fn start(config: SimulationConfig, wiring: SensorWiring) -> Result<Self> {
        config.validate()?;
        if !wiring.is_distinct() {
            return Err(Error::Config(
                "two rangefinders share an analog channel".to_string(),
            ));
        }

        let state = SimState {
            physics: CarPhysics::new(&config.corridor),
            steering_us: PULSE_CENTER_US,
            throttle_us: PULSE_CENTER_US,
            noise: NoiseGenerator::new(config.random_seed),
            wall_contacts: 0,
        };
        let shared = Arc::new(Shared {
            config,
            wiring,
            state: Mutex::new(state),
            shutdown: AtomicBool::new(false),
        });
        let indicators = MockIndicators::new(INDICATOR_CELLS).with_logging();
        let buttons = MockButtons::new();

        let mut handles = Vec::with_capacity(2);

        let physics_shared = Arc::clone(&shared);
        handles.push(
            thread::Builder::new()
                .name("corridor-sim".to_string())
                .spawn(move || simulation_loop(physics_shared))
                .map_err(|e| Error::Other(format!("Failed to spawn simulation thread: {}", e)))?,
        );

        let script_shared = Arc::clone(&shared);
        let script_buttons = buttons.clone();
        handles.push(
            thread::Builder::new()
                .name("sim-buttons".to_string())
                .spawn(move || button_script(script_shared, script_buttons))
                .map_err(|e| Error::Other(format!("Failed to spawn button thread: {}", e)))?,
        );

        log::info!(
            "Corridor simulation started: width={:.0}cm, offset={:+.1}cm, heading={:+.1}°",
            shared.config.corridor.width_cm,
            shared.config.corridor.start_offset_cm,
            shared.config.corridor.start_heading_deg
        );

        Ok(Self {
            shared,
            indicators,
            buttons,
            handles,
        })
    }

    /// Rangefinder driver handle
    pub fn analog(&self) -> SimAnalogInput {
        SimAnalogInput {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Servo driver handle
    pub fn servos(&self) -> SimServos {
        SimServos {
            shared: Arc::clone(&self.shared),
        }
    }

    /// LED array handle
    pub fn indicators(&self) -> MockIndicators {
        self.indicators.clone()
    }

    /// Switch handle (scripted presses arrive through it)
    pub fn buttons(&self) -> MockButtons {
        self.buttons.clone()
    }

    /// Current pose of the simulated car
    pub fn pose(&self) -> CarPose {
        self.shared.state.lock().physics.pose()
    }

    /// Number of simulation steps in which the car touched a wall
    pub fn wall_contacts(&self) -> u64 {
        self.shared.state.lock().wall_contacts
    }

    /// Stop the simulation threads
    pub fn stop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for CorridorSimulator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Simulated rangefinders
#[derive(Clone)]
pub struct SimAnalogInput {
    shared: Arc<Shared>,
}

impl AnalogInputSource for SimAnalogInput {
    fn read_voltage(&mut self, channel: AnalogChannel) -> Result<f64> {
        if self.shared.shutdown.load(Ordering::Relaxed) {
            return Err(Error::NotRunning("corridor simulation"));
        }
        let (side, position) = self
            .shared
            .wiring
            .sensor(channel)
            .ok_or(Error::InvalidChannel(channel.0))?;

        let config = &self.shared.config;
        let mut state = self.shared.state.lock();
        if state.noise.chance(config.rangefinder.failure_rate) {
            return Err(Error::Io(std::io::Error::other(format!(
                "analog {} conversion timed out",
                channel
            ))));
        }

        let distance = state
            .physics
            .beam_distance(side, position, &config.car, &config.corridor);
        let volts = config.rangefinder.voltage_at(distance)
            + state.noise.gaussian(config.rangefinder.noise_stddev_v);
        log::trace!(
            "{} {} {}: {:.1}cm -> {:.3}V",
            channel,
            side,
            position,
            distance,
            volts
        );
        Ok(volts.max(0.0))
    }
}

/// Simulated steering and drive servos
#[derive(Clone)]
pub struct SimServos {
    shared: Arc<Shared>,
}

impl ActuatorOutput for SimServos {
    fn set_pulse_width(&mut self, channel: ServoChannel, pulse_us: u16) -> Result<()> {
        let mut state = self.shared.state.lock();
        match channel {
            ServoChannel::Steering => state.steering_us = pulse_us,
            ServoChannel::Throttle => state.throttle_us = pulse_us,
        }
        Ok(())
    }
}

/// Main simulation loop
fn simulation_loop(shared: Arc<Shared>) {
    let interval = Duration::from_secs_f64(1.0 / shared.config.rate_hz);
    let mut last_time = Instant::now();
    let mut touching = false;

    log::debug!("Simulation loop started: interval={:?}", interval);

    while !shared.shutdown.load(Ordering::Relaxed) {
        let loop_start = Instant::now();
        let dt = loop_start.duration_since(last_time).as_secs_f64();
        last_time = loop_start;

        {
            let mut state = shared.state.lock();
            let (steering, throttle) = (state.steering_us, state.throttle_us);
            let contact = state.physics.update(
                dt,
                steering,
                throttle,
                &shared.config.car,
                &shared.config.corridor,
            );
            if contact {
                state.wall_contacts += 1;
                if !touching {
                    let pose = state.physics.pose();
                    log::warn!(
                        "Car touched the {} wall at {:.0}cm",
                        if pose.lateral_cm > 0.0 { "left" } else { "right" },
                        pose.travelled_cm
                    );
                }
            }
            touching = contact;
        }

        let elapsed = loop_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }

    log::debug!("Simulation loop terminated");
}

/// Presses switches the way a person at the car would
fn button_script(shared: Arc<Shared>, buttons: MockButtons) {
    let script = &shared.config.buttons;
    let poll = Duration::from_millis(10);

    while !buttons.is_subscribed() {
        if shared.shutdown.load(Ordering::Relaxed) {
            return;
        }
        thread::sleep(poll);
    }

    for _ in 0..script.initial_speed_presses {
        buttons.click(Switch::Sw1);
    }
    if script.initial_speed_presses > 0 {
        log::info!("Pressed SW1 {} times", script.initial_speed_presses);
    }

    if script.stop_after_secs <= 0.0 {
        return;
    }
    let deadline = Instant::now() + Duration::from_secs_f64(script.stop_after_secs);
    while Instant::now() < deadline {
        if shared.shutdown.load(Ordering::Relaxed) {
            return;
        }
        thread::sleep(poll);
    }
    log::info!("Pressing SW2 after {:.1}s", script.stop_after_secs);
    buttons.click(Switch::Sw2);
}
