//! Control loop: read, estimate, decide, actuate.
//!
//! One tick:
//!
//! 1. Drain the button inbox; stop if requested
//! 2. Read all four rangefinders (failed reads fall back to a fixed voltage)
//! 3. Estimate both walls and refresh the LED array
//! 4. Report the lateral offset to the sample sink
//! 5. Drive forward at the requested speed and apply the steering decision
//!
//! Offset maneuvers run as a burst of sub-ticks inside a single tick. The
//! inbox and the shutdown signal are checked between sub-ticks, so a stop
//! takes effect within one sub-tick.

use crate::config::NavConfig;
use crate::error::{NavError, Result};
use crate::indicator::{IndicatorFrame, IndicatorMapper};
use crate::perception::{
    ConfidenceModel, CorridorReadings, DistanceModel, DistanceSample, WallEstimate, WallEstimator,
};
use crate::shared::{ButtonEffect, ControllerState, Inbox, ShutdownSignal};
use crate::steering::{SteeringDecision, SteeringDecisionEngine, StepMode, TurnDirection};
use crate::telemetry::SampleSink;
use setu_io::{
    ActuatorOutput, AnalogInputSource, INDICATOR_CELLS, IndicatorArray, Rgb, SensorReading,
    SensorWiring, ServoChannel,
};
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

/// Board capabilities the loop drives
pub struct Drivers {
    pub analog: Box<dyn AnalogInputSource>,
    pub actuators: Box<dyn ActuatorOutput>,
    pub indicators: Box<dyn IndicatorArray>,
}

/// Counters reported when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub maneuvers: u64,
    pub degraded_reads: u64,
    pub button_events: u64,
}

impl fmt::Display for LoopStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ticks, {} maneuvers, {} degraded reads, {} button events",
            self.ticks, self.maneuvers, self.degraded_reads, self.button_events
        )
    }
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tick ran and applied this decision
    Continued(SteeringDecision),
    /// A stop was observed; the throttle is neutral
    Stopped,
}

pub struct ControlLoop {
    config: NavConfig,
    drivers: Drivers,
    inbox: Inbox,
    shutdown: ShutdownSignal,
    state: ControllerState,
    distance: DistanceModel,
    walls: WallEstimator,
    mapper: IndicatorMapper,
    engine: SteeringDecisionEngine,
    sink: Option<Box<dyn SampleSink>>,
    stats: LoopStats,
    epoch: Instant,
}

impl ControlLoop {
    /// Create a loop; the configuration is validated first
    pub fn new(
        config: NavConfig,
        drivers: Drivers,
        inbox: Inbox,
        shutdown: ShutdownSignal,
    ) -> Result<Self> {
        config.validate()?;
        let cells = drivers.indicators.len();
        if cells < INDICATOR_CELLS {
            return Err(NavError::Config(format!(
                "indicator array has {} cells, need {}",
                cells, INDICATOR_CELLS
            )));
        }

        let walls = WallEstimator::new(
            &config.geometry,
            ConfidenceModel::new(&config.confidence),
        );
        Ok(Self {
            state: ControllerState::new(&config),
            distance: DistanceModel::new(&config.calibration),
            walls,
            mapper: IndicatorMapper::new(config.indicator.clone()),
            engine: SteeringDecisionEngine::new(config.steering.clone(), config.servo.clone()),
            config,
            drivers,
            inbox,
            shutdown,
            sink: None,
            stats: LoopStats::default(),
            epoch: Instant::now(),
        })
    }

    /// Report the lateral offset to `sink` every tick
    pub fn with_sample_sink(mut self, sink: impl SampleSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn step_mode(&self) -> StepMode {
        self.state.step_mode
    }

    /// Switch between coarse and fine steering steps
    pub fn set_step_mode(&mut self, mode: StepMode) {
        if mode != self.state.step_mode {
            log::info!(
                "Steering step: {:?} -> {:?} ({} µs)",
                self.state.step_mode,
                mode,
                self.engine.step_us(mode)
            );
        }
        self.state.step_mode = mode;
    }

    /// Run until a stop or shutdown is observed, then make the car safe
    ///
    /// The throttle is neutral on every exit path, errors included.
    pub fn run(&mut self) -> Result<LoopStats> {
        let result = self.run_ticks();
        self.shutdown();
        match &result {
            Ok(()) => log::info!("Control loop stopped: {}", self.stats),
            Err(e) => log::error!("Control loop aborted: {} ({})", e, self.stats),
        }
        result.map(|()| self.stats)
    }

    fn run_ticks(&mut self) -> Result<()> {
        // A stop already queued skips the self-test
        if self.poll_stop()? {
            return Ok(());
        }
        self.startup()?;

        let interval = Duration::from_millis(self.config.timing.tick_ms);
        log::info!(
            "Control loop started: tick={:?}, speed={}µs, step={:?}",
            interval,
            self.state.requested_speed_us,
            self.state.step_mode
        );

        loop {
            let tick_start = Instant::now();
            if self.tick()? == TickOutcome::Stopped {
                return Ok(());
            }
            let elapsed = tick_start.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }
    }

    /// Center the servos and flash the array green
    pub fn startup(&mut self) -> Result<()> {
        let center = self.config.servo.center_us;
        self.command_steering(center)?;
        self.command_throttle(center)?;

        log::info!(
            "LED self-test: {} cells green for {} ms",
            INDICATOR_CELLS,
            self.config.timing.startup_flash_ms
        );
        self.show_frame(&IndicatorFrame::filled(Rgb::GREEN))?;
        pause(self.config.timing.startup_flash_ms);
        self.lights_off()
    }

    /// Run one tick
    pub fn tick(&mut self) -> Result<TickOutcome> {
        if self.poll_stop()? {
            return Ok(TickOutcome::Stopped);
        }
        self.stats.ticks += 1;

        let readings = self.read_corridor();
        let (left, right) = self.walls.estimate_both(&readings);

        let frame = self.mapper.compose(&left, &right);
        if let Err(e) = self.show_frame(&frame) {
            log::warn!("LED refresh failed: {}", e);
        }
        self.report_offset(&left, &right);

        let decision = self.engine.decide(&readings);
        log::debug!(
            "L {:.1}/{:.1}cm {:+.1}° | R {:.1}/{:.1}cm {:+.1}° -> {:?}",
            readings.left.front_cm,
            readings.left.rear_cm,
            left.angle_deg(),
            readings.right.front_cm,
            readings.right.rear_cm,
            right.angle_deg(),
            decision
        );

        self.forward()?;
        match decision {
            SteeringDecision::HoldStraight => self.center_steering()?,
            SteeringDecision::NudgeLeft => self.nudge(TurnDirection::Left)?,
            SteeringDecision::NudgeRight => self.nudge(TurnDirection::Right)?,
            SteeringDecision::OffsetLeft => {
                if self.run_offset(TurnDirection::Left)? {
                    return Ok(TickOutcome::Stopped);
                }
            }
            SteeringDecision::OffsetRight => {
                if self.run_offset(TurnDirection::Right)? {
                    return Ok(TickOutcome::Stopped);
                }
            }
        }

        if self.poll_stop()? {
            return Ok(TickOutcome::Stopped);
        }
        Ok(TickOutcome::Continued(decision))
    }

    /// Turn toward `direction`, counter-turn, then straighten
    ///
    /// Returns true if a stop interrupted the burst.
    fn run_offset(&mut self, direction: TurnDirection) -> Result<bool> {
        let plan = self
            .engine
            .plan_offset(direction, self.state.requested_speed_us);
        log::info!(
            "Offsetting {}: {} ticks, {} back",
            direction,
            plan.turn_ticks,
            plan.counter_ticks
        );
        self.stats.maneuvers += 1;

        let sub_tick = self.config.timing.tick_ms;
        for step in plan.steps() {
            if self.poll_stop()? {
                log::info!("Offset {} interrupted by stop", direction);
                return Ok(true);
            }
            self.forward()?;
            self.nudge(step)?;
            pause(sub_tick);
        }
        self.center_steering()?;
        Ok(false)
    }

    /// Drain the inbox; true once a stop or shutdown has been requested
    fn poll_stop(&mut self) -> Result<bool> {
        let neutral = self.config.servo.center_us;
        for event in self.inbox.drain() {
            self.stats.button_events += 1;
            match self
                .state
                .apply_button(event, &self.config.speed, neutral)
            {
                ButtonEffect::Ignored => log::trace!("Ignoring {:?}", event),
                ButtonEffect::SpeedChanged { from_us, to_us } => {
                    log::info!("Speed set point: {} -> {} µs", from_us, to_us)
                }
                ButtonEffect::StopRequested => {
                    log::info!("Stop requested");
                    self.command_throttle(neutral)?;
                }
            }
        }

        if self.shutdown.is_requested() && !self.state.stop_requested {
            log::info!("Shutdown requested");
            self.state.stop_requested = true;
            self.command_throttle(neutral)?;
        }
        Ok(self.state.stop_requested)
    }

    fn read_corridor(&mut self) -> CorridorReadings {
        let wiring = self.config.channels;
        let fallback = self.config.calibration.fallback_voltage;

        let samples: Vec<DistanceSample> = SensorWiring::SENSORS
            .iter()
            .map(|&(side, position)| {
                let channel = wiring.channel(side, position);
                let voltage = match self.drivers.analog.read_voltage(channel) {
                    Ok(v) => v,
                    Err(e) => {
                        self.stats.degraded_reads += 1;
                        log::warn!(
                            "{} {} rangefinder ({}) read failed: {}; using {:.3}V",
                            side,
                            position,
                            channel,
                            e,
                            fallback
                        );
                        fallback
                    }
                };
                log::trace!("{} {} {}: {:.3}V", channel, side, position, voltage);
                self.distance.sample(&SensorReading {
                    side,
                    position,
                    voltage,
                })
            })
            .collect();

        CorridorReadings::from_samples(&samples, self.distance.distance(fallback))
    }

    fn report_offset(&mut self, left: &WallEstimate, right: &WallEstimate) {
        if !self.config.telemetry.enabled {
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            let offset = (right.perpendicular_cm - left.perpendicular_cm) / 2.0;
            sink.add_sample(self.epoch.elapsed().as_millis() as u64, offset);
        }
    }

    /// Write every cell of the frame, reporting the first failure
    fn show_frame(&mut self, frame: &IndicatorFrame) -> Result<()> {
        let mut first_err: Option<NavError> = None;
        for cell in frame.states() {
            let written = self
                .drivers
                .indicators
                .set_color(cell.index, cell.color)
                .and_then(|()| self.drivers.indicators.set_on(cell.index));
            if let Err(e) = written {
                first_err.get_or_insert(NavError::from(e));
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn lights_off(&mut self) -> Result<()> {
        for index in 0..self.drivers.indicators.len() {
            self.drivers.indicators.set_off(index)?;
        }
        Ok(())
    }

    fn forward(&mut self) -> Result<()> {
        self.command_throttle(self.state.requested_speed_us)
    }

    fn nudge(&mut self, direction: TurnDirection) -> Result<()> {
        let target = self
            .engine
            .nudge(self.state.steering_us, direction, self.state.step_mode);
        self.command_steering(target)?;
        pause(self.config.timing.settle_ms);
        Ok(())
    }

    fn center_steering(&mut self) -> Result<()> {
        self.command_steering(self.engine.center_us())
    }

    fn command_steering(&mut self, pulse_us: u16) -> Result<()> {
        let pulse = self.config.servo.clamp(pulse_us as i32);
        self.drivers
            .actuators
            .set_pulse_width(ServoChannel::Steering, pulse)?;
        self.state.steering_us = pulse;
        Ok(())
    }

    fn command_throttle(&mut self, pulse_us: u16) -> Result<()> {
        let pulse = self.config.servo.clamp(pulse_us as i32);
        self.drivers
            .actuators
            .set_pulse_width(ServoChannel::Throttle, pulse)?;
        self.state.throttle_us = pulse;
        Ok(())
    }

    /// Neutral throttle, centered steering, all cells off
    ///
    /// Every step is attempted even if an earlier one fails.
    pub fn shutdown(&mut self) {
        let center = self.config.servo.center_us;
        if let Err(e) = self.command_throttle(center) {
            log::error!("Failed to neutralize throttle: {}", e);
        }
        if let Err(e) = self.command_steering(center) {
            log::error!("Failed to center steering: {}", e);
        }
        for index in 0..self.drivers.indicators.len() {
            if let Err(e) = self.drivers.indicators.set_off(index) {
                log::warn!("Failed to turn off LED {}: {}", index, e);
            }
        }
    }
}

impl Drop for ControlLoop {
    fn drop(&mut self) {
        // Covers callers driving tick() directly and unwinding panics
        self.shutdown();
    }
}

#[inline]
fn pause(ms: u64) {
    if ms > 0 {
        thread::sleep(Duration::from_millis(ms));
    }
}
