//! Control loop driven against the setu-io fakes

use approx::assert_relative_eq;
use marga_nav::steering::{SteeringDecision, StepMode};
use marga_nav::telemetry::SampleRing;
use marga_nav::{ControlLoop, Drivers, NavConfig, NavError, ShutdownSignal, TickOutcome, inbox};
use parking_lot::Mutex;
use setu_io::devices::mock::{MockAnalogInput, MockButtons, MockIndicators, MockServos};
use setu_io::{
    AnalogChannel, ButtonSource, Position, Rgb, SensorWiring, ServoChannel, Side,
    Switch,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct Rig {
    analog: MockAnalogInput,
    servos: MockServos,
    leds: MockIndicators,
    buttons: MockButtons,
    shutdown: ShutdownSignal,
}

fn fast_config() -> NavConfig {
    let mut config = NavConfig::default();
    config.timing.tick_ms = 1;
    config.timing.settle_ms = 0;
    config.timing.startup_flash_ms = 0;
    config
}

fn rig(config: NavConfig) -> (ControlLoop, Rig) {
    let analog = MockAnalogInput::new();
    let servos = MockServos::new();
    let leds = MockIndicators::new(8);
    let mut buttons = MockButtons::new();
    let shutdown = ShutdownSignal::new();

    let (tx, button_inbox) = inbox();
    buttons.subscribe(tx).unwrap();

    let drivers = Drivers {
        analog: Box::new(analog.clone()),
        actuators: Box::new(servos.clone()),
        indicators: Box::new(leds.clone()),
    };
    let control = ControlLoop::new(config, drivers, button_inbox, shutdown.clone()).unwrap();
    (
        control,
        Rig {
            analog,
            servos,
            leds,
            buttons,
            shutdown,
        },
    )
}

/// Voltage the default calibration maps to `distance_cm`
fn volts_for(distance_cm: f64) -> f64 {
    18.67 / distance_cm - 0.167
}

impl Rig {
    fn set_distances(&self, lf: f64, lr: f64, rf: f64, rr: f64) {
        let wiring = SensorWiring::default();
        for (side, position, d) in [
            (Side::Left, Position::Front, lf),
            (Side::Left, Position::Rear, lr),
            (Side::Right, Position::Front, rf),
            (Side::Right, Position::Rear, rr),
        ] {
            self.analog
                .set_voltage(wiring.channel(side, position), volts_for(d));
        }
    }
}

#[test]
fn test_hold_in_wide_symmetric_corridor() {
    let (mut control, rig) = rig(fast_config());
    rig.set_distances(50.0, 50.0, 50.0, 50.0);

    assert_eq!(
        control.tick().unwrap(),
        TickOutcome::Continued(SteeringDecision::HoldStraight)
    );
    assert_eq!(rig.servos.pulse_width(ServoChannel::Steering), Some(1500));
}

#[test]
fn test_offset_maneuver_sequence() {
    let (mut control, rig) = rig(fast_config());
    // Close and parallel to the left wall
    rig.set_distances(12.0, 12.0, 40.0, 40.0);

    assert_eq!(
        control.tick().unwrap(),
        TickOutcome::Continued(SteeringDecision::OffsetRight)
    );
    // Five fine steps right (saturating), two back left, then centered
    assert_eq!(
        rig.servos.history(ServoChannel::Steering),
        vec![1200, 1000, 1000, 1000, 1000, 1300, 1600, 1500]
    );
    // Forward on the tick and on every sub-tick
    assert_eq!(rig.servos.history(ServoChannel::Throttle).len(), 8);
    assert_eq!(control.stats().maneuvers, 1);
}

#[test]
fn test_offset_shorter_at_full_speed() {
    let (mut control, rig) = rig(fast_config());
    for _ in 0..5 {
        rig.buttons.click(Switch::Sw1);
    }
    control.set_step_mode(StepMode::Coarse);
    // Close and parallel to the right wall
    rig.set_distances(40.0, 40.0, 12.0, 12.0);

    assert_eq!(
        control.tick().unwrap(),
        TickOutcome::Continued(SteeringDecision::OffsetLeft)
    );
    assert_eq!(control.state().requested_speed_us, 1000);
    assert_eq!(
        rig.servos.history(ServoChannel::Steering),
        vec![2000, 2000, 2000, 1500, 1500]
    );
    assert!(
        rig.servos
            .history(ServoChannel::Throttle)
            .iter()
            .all(|&us| us == 1000)
    );
}

#[test]
fn test_nudges_accumulate_across_ticks() {
    let (mut control, rig) = rig(fast_config());
    // Nose swinging away from the left wall
    rig.set_distances(24.0, 20.0, 40.0, 40.0);

    for _ in 0..3 {
        assert_eq!(
            control.tick().unwrap(),
            TickOutcome::Continued(SteeringDecision::NudgeLeft)
        );
    }
    assert_eq!(
        rig.servos.history(ServoChannel::Steering),
        vec![1800, 2000, 2000]
    );
}

#[test]
fn test_speed_button_applies_next_tick() {
    let (mut control, rig) = rig(fast_config());
    rig.set_distances(50.0, 50.0, 50.0, 50.0);

    rig.buttons.click(Switch::Sw1);
    rig.buttons.click(Switch::Sw1);
    control.tick().unwrap();

    assert_eq!(rig.servos.pulse_width(ServoChannel::Throttle), Some(1300));
    // Releases are counted but change nothing
    assert_eq!(control.stats().button_events, 4);
}

#[test]
fn test_leds_show_parallel_close_walls() {
    let (mut control, rig) = rig(fast_config());
    rig.set_distances(10.0, 10.0, 10.0, 10.0);
    control.tick().unwrap();

    // Both sides at 0° share a cell; mirrored layout puts it at 4
    assert_eq!(rig.leds.lit_cells(), vec![(4, Rgb::new(0, 255, 0))]);
    for index in (0..8).filter(|&i| i != 4) {
        assert_eq!(rig.leds.cell(index), Some((Rgb::OFF, true)));
    }
}

#[test]
fn test_leds_dark_for_distant_walls() {
    let (mut control, rig) = rig(fast_config());
    rig.set_distances(60.0, 60.0, 60.0, 60.0);
    control.tick().unwrap();
    assert!(rig.leds.lit_cells().is_empty());
}

#[test]
fn test_failed_read_uses_fallback() {
    let (mut control, rig) = rig(fast_config());
    rig.set_distances(50.0, 50.0, 50.0, 50.0);
    rig.analog.fail_always(AnalogChannel(1));

    // Left front falls back to 0 V (~112 cm), making left the far side
    assert_eq!(
        control.tick().unwrap(),
        TickOutcome::Continued(SteeringDecision::HoldStraight)
    );
    control.tick().unwrap();
    assert_eq!(control.stats().degraded_reads, 2);
    assert_eq!(control.stats().ticks, 2);
}

#[test]
fn test_offset_samples_reported() {
    let samples = Arc::new(Mutex::new(SampleRing::new(16)));
    let (control, rig) = rig(fast_config());
    let mut control = control.with_sample_sink(Arc::clone(&samples));
    rig.set_distances(20.0, 20.0, 40.0, 40.0);

    control.tick().unwrap();
    control.tick().unwrap();

    let ring = samples.lock();
    assert_eq!(ring.len(), 2);
    let last = ring.latest().unwrap();
    assert_relative_eq!(last.value, 10.0, epsilon = 1e-9);
}

#[test]
fn test_stop_button_from_another_thread() {
    let (mut control, rig) = rig(fast_config());
    rig.set_distances(50.0, 50.0, 50.0, 50.0);
    rig.buttons.click(Switch::Sw1);

    let buttons = rig.buttons.clone();
    let presser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        buttons.press(Switch::Sw2)
    });

    let stats = control.run().unwrap();
    assert!(presser.join().unwrap());

    assert!(stats.ticks > 0);
    assert!(control.state().stop_requested);
    assert_eq!(rig.servos.pulse_width(ServoChannel::Throttle), Some(1500));
    assert_eq!(rig.servos.pulse_width(ServoChannel::Steering), Some(1500));
    assert!(rig.leds.all_off());
    // Drove at the requested speed before the stop
    assert!(
        rig.servos
            .history(ServoChannel::Throttle)
            .contains(&1400)
    );
}

#[test]
fn test_stop_interrupts_offset_maneuver() {
    let mut config = fast_config();
    config.timing.tick_ms = 20;
    let (mut control, rig) = rig(config);
    rig.set_distances(12.0, 12.0, 40.0, 40.0);

    let buttons = rig.buttons.clone();
    let presser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        buttons.press(Switch::Sw2);
    });

    assert_eq!(control.tick().unwrap(), TickOutcome::Stopped);
    presser.join().unwrap();

    // Full burst is seven nudges plus centering
    assert!(rig.servos.history(ServoChannel::Steering).len() < 8);
    assert_eq!(rig.servos.pulse_width(ServoChannel::Throttle), Some(1500));
}

#[test]
fn test_shutdown_signal_stops_run() {
    let (mut control, rig) = rig(fast_config());
    rig.set_distances(50.0, 50.0, 50.0, 50.0);

    let signal = rig.shutdown.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        signal.request();
    });

    control.run().unwrap();
    handle.join().unwrap();
    assert_eq!(rig.servos.pulse_width(ServoChannel::Throttle), Some(1500));
}

#[test]
fn test_startup_flash_then_dark() {
    let (mut control, rig) = rig(fast_config());
    rig.set_distances(50.0, 50.0, 50.0, 50.0);
    control.startup().unwrap();

    assert!(rig.leds.all_off());
    // Cells were lit green before being switched off
    assert_eq!(rig.leds.cell(0), Some((Rgb::GREEN, false)));
    assert_eq!(rig.servos.pulse_width(ServoChannel::Throttle), Some(1500));
}

#[test]
fn test_actuator_failure_stops_loop() {
    let (mut control, rig) = rig(fast_config());
    rig.set_distances(50.0, 50.0, 50.0, 50.0);
    rig.servos.set_failing(true);

    let result = control.run();
    assert!(matches!(result, Err(NavError::Hardware(_))));
    assert!(rig.leds.all_off());
}

#[test]
fn test_pending_stop_ends_run_immediately() {
    let (mut control, rig) = rig(fast_config());
    rig.set_distances(50.0, 50.0, 50.0, 50.0);
    rig.buttons.press(Switch::Sw2);

    let stats = control.run().unwrap();
    assert_eq!(stats.ticks, 0);
    assert_eq!(rig.servos.pulse_width(ServoChannel::Throttle), Some(1500));
    // Self-test flash never ran
    assert_eq!(rig.leds.cell(0), Some((Rgb::OFF, false)));
}

#[test]
fn test_dropping_loop_makes_car_safe() {
    let mut config = fast_config();
    config.speed.default_us = 1300;
    let (mut control, rig) = rig(config);
    rig.set_distances(10.0, 10.0, 10.0, 10.0);

    control.tick().unwrap();
    assert_eq!(rig.servos.pulse_width(ServoChannel::Throttle), Some(1300));
    assert!(!rig.leds.lit_cells().is_empty());

    drop(control);
    assert_eq!(rig.servos.pulse_width(ServoChannel::Throttle), Some(1500));
    assert_eq!(rig.servos.pulse_width(ServoChannel::Steering), Some(1500));
    assert!(rig.leds.all_off());
}

#[test]
fn test_led_failure_still_refreshes_other_cells() {
    let (mut control, rig) = rig(fast_config());
    rig.set_distances(10.0, 10.0, 10.0, 10.0);
    control.tick().unwrap();
    assert_eq!(rig.leds.lit_cells(), vec![(4, Rgb::new(0, 255, 0))]);

    rig.leds.set_failing_cell(Some(1));
    rig.set_distances(60.0, 60.0, 60.0, 60.0);
    assert_eq!(
        control.tick().unwrap(),
        TickOutcome::Continued(SteeringDecision::HoldStraight)
    );

    // Cells past the failing one were still cleared
    assert!(rig.leds.lit_cells().is_empty());
    assert_eq!(rig.leds.cell(4), Some((Rgb::OFF, true)));
}
