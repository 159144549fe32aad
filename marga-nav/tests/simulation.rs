//! Control loop driving the threaded corridor simulation end to end

use marga_nav::{ControlLoop, Drivers, NavConfig, ShutdownSignal, inbox};
use setu_io::ButtonSource;
use setu_io::devices::mock::CorridorSimulator;

fn sim_config(offset_cm: f64, heading_deg: f64) -> NavConfig {
    let mut config = NavConfig::default();
    config.timing.tick_ms = 10;
    config.timing.settle_ms = 1;
    config.timing.startup_flash_ms = 0;
    config.simulation.random_seed = 7;
    config.simulation.corridor.start_offset_cm = offset_cm;
    config.simulation.corridor.start_heading_deg = heading_deg;
    config.simulation.buttons.initial_speed_presses = 2;
    config.simulation.buttons.stop_after_secs = 1.0;
    config
}

fn drive(config: NavConfig) -> (CorridorSimulator, marga_nav::LoopStats) {
    let simulator = CorridorSimulator::start(config.simulation.clone(), config.channels).unwrap();
    let (tx, button_inbox) = inbox();
    simulator.buttons().subscribe(tx).unwrap();

    let drivers = Drivers {
        analog: Box::new(simulator.analog()),
        actuators: Box::new(simulator.servos()),
        indicators: Box::new(simulator.indicators()),
    };
    let mut control =
        ControlLoop::new(config, drivers, button_inbox, ShutdownSignal::new()).unwrap();
    let stats = control.run().unwrap();
    (simulator, stats)
}

#[test]
fn test_scripted_run_drives_and_stops() {
    let (mut simulator, stats) = drive(sim_config(0.0, 0.0));

    assert!(stats.ticks > 10);
    // Two SW1 clicks and one SW2 press
    assert!(stats.button_events >= 5);

    let travelled = simulator.pose().travelled_cm;
    assert!(travelled > 0.0);

    // Throttle is neutral: the car no longer moves
    std::thread::sleep(std::time::Duration::from_millis(50));
    assert_eq!(simulator.pose().travelled_cm, travelled);
    assert!(simulator.indicators().all_off());
    simulator.stop();
}

#[test]
fn test_car_near_wall_runs_offset_maneuver() {
    // 12 cm left of center: left rangefinders read 13 cm, inside the close-wall band
    let (mut simulator, stats) = drive(sim_config(12.0, 0.0));
    assert!(stats.maneuvers >= 1);
    simulator.stop();
}
