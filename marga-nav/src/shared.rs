//! State owned by the control loop and the channels that feed it.
//!
//! Switch events arrive on the button source's own thread. They never touch
//! [`ControllerState`] directly: the source pushes them into the [`Inbox`]
//! and the loop drains it at tick boundaries and between maneuver sub-ticks.
//! Process shutdown (Ctrl-C) is a [`ShutdownSignal`] checked at the same
//! points.

use crate::config::{NavConfig, SpeedConfig};
use crate::steering::StepMode;
use crossbeam_channel::{Receiver, Sender};
use setu_io::{ButtonAction, ButtonEvent, Switch};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Mutable controller state, single owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerState {
    /// Last commanded steering pulse
    pub steering_us: u16,
    /// Last commanded throttle pulse
    pub throttle_us: u16,
    /// Throttle applied when driving (lower is faster)
    pub requested_speed_us: u16,
    pub stop_requested: bool,
    pub step_mode: StepMode,
}

/// What a switch event changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEffect {
    Ignored,
    SpeedChanged { from_us: u16, to_us: u16 },
    StopRequested,
}

impl ControllerState {
    pub fn new(config: &NavConfig) -> Self {
        Self {
            steering_us: config.servo.center_us,
            throttle_us: config.servo.center_us,
            requested_speed_us: config.speed.default_us,
            stop_requested: false,
            step_mode: config.steering.step_mode,
        }
    }

    /// Apply one switch event
    ///
    /// SW1 speeds up one step until the floor, then wraps back to the
    /// default. SW2 requests a stop and neutralizes the throttle. Releases
    /// do nothing.
    pub fn apply_button(
        &mut self,
        event: ButtonEvent,
        speed: &SpeedConfig,
        neutral_us: u16,
    ) -> ButtonEffect {
        if event.action == ButtonAction::Released {
            return ButtonEffect::Ignored;
        }
        match event.switch {
            Switch::Sw1 => {
                let from_us = self.requested_speed_us;
                let to_us = if from_us > speed.floor_us {
                    from_us.saturating_sub(speed.step_us).max(speed.floor_us)
                } else {
                    speed.default_us
                };
                self.requested_speed_us = to_us;
                ButtonEffect::SpeedChanged { from_us, to_us }
            }
            Switch::Sw2 => {
                self.stop_requested = true;
                self.throttle_us = neutral_us;
                ButtonEffect::StopRequested
            }
        }
    }
}

/// Create the button channel: the sender goes to the button source
pub fn inbox() -> (Sender<ButtonEvent>, Inbox) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (tx, Inbox { rx })
}

/// Receiving end of the button channel
pub struct Inbox {
    rx: Receiver<ButtonEvent>,
}

impl Inbox {
    /// All events received since the last drain, oldest first
    pub fn drain(&self) -> Vec<ButtonEvent> {
        self.rx.try_iter().collect()
    }
}

/// Cooperative process shutdown request
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
