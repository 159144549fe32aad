//! Scripted fake drivers for tests
//!
//! Every fake is a cheap handle around shared state: clone it, hand one
//! clone to the code under test and keep the other to script inputs and
//! inspect what was commanded.

use crate::core::driver::{ActuatorOutput, AnalogInputSource, ButtonSource, IndicatorArray};
use crate::core::types::{AnalogChannel, ButtonEvent, Rgb, ServoChannel, Switch};
use crate::error::{Error, Result};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct AnalogState {
    voltages: HashMap<AnalogChannel, f64>,
    /// Remaining forced failures per channel (`u32::MAX` = forever)
    failures: HashMap<AnalogChannel, u32>,
    reads: u64,
}

/// Analog input returning whatever voltage the test last set
#[derive(Clone, Default)]
pub struct MockAnalogInput {
    state: Arc<Mutex<AnalogState>>,
}

impl MockAnalogInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_voltage(&self, channel: AnalogChannel, volts: f64) {
        self.state.lock().voltages.insert(channel, volts);
    }

    /// Fail the next `count` reads on a channel
    pub fn fail_next(&self, channel: AnalogChannel, count: u32) {
        let mut state = self.state.lock();
        if count == 0 {
            state.failures.remove(&channel);
        } else {
            state.failures.insert(channel, count);
        }
    }

    /// Fail every read on a channel until [`Self::recover`]
    pub fn fail_always(&self, channel: AnalogChannel) {
        self.fail_next(channel, u32::MAX);
    }

    pub fn recover(&self, channel: AnalogChannel) {
        self.state.lock().failures.remove(&channel);
    }

    /// Total reads attempted, failed ones included
    pub fn reads(&self) -> u64 {
        self.state.lock().reads
    }
}

impl AnalogInputSource for MockAnalogInput {
    fn read_voltage(&mut self, channel: AnalogChannel) -> Result<f64> {
        let mut state = self.state.lock();
        state.reads += 1;

        if let Some(remaining) = state.failures.get_mut(&channel) {
            if *remaining != u32::MAX {
                *remaining -= 1;
            }
            if *remaining == 0 {
                state.failures.remove(&channel);
            }
            return Err(Error::Io(std::io::Error::other(format!(
                "analog {} read failed",
                channel
            ))));
        }

        state
            .voltages
            .get(&channel)
            .copied()
            .ok_or(Error::InvalidChannel(channel.0))
    }
}

#[derive(Default)]
struct ServoState {
    current: HashMap<ServoChannel, u16>,
    history: Vec<(ServoChannel, u16)>,
    failing: bool,
}

/// Servo output that records every command
#[derive(Clone, Default)]
pub struct MockServos {
    state: Arc<Mutex<ServoState>>,
}

impl MockServos {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last pulse width commanded on a channel
    pub fn pulse_width(&self, channel: ServoChannel) -> Option<u16> {
        self.state.lock().current.get(&channel).copied()
    }

    /// Every pulse width commanded on a channel, oldest first
    pub fn history(&self, channel: ServoChannel) -> Vec<u16> {
        self.state
            .lock()
            .history
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, us)| *us)
            .collect()
    }

    pub fn command_count(&self) -> usize {
        self.state.lock().history.len()
    }

    /// Make subsequent commands fail with an I/O error
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }
}

impl ActuatorOutput for MockServos {
    fn set_pulse_width(&mut self, channel: ServoChannel, pulse_us: u16) -> Result<()> {
        let mut state = self.state.lock();
        if state.failing {
            return Err(Error::Io(std::io::Error::other(format!(
                "{} servo not responding",
                channel
            ))));
        }
        state.current.insert(channel, pulse_us);
        state.history.push((channel, pulse_us));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Cell {
    color: Rgb,
    on: bool,
}

struct IndicatorState {
    cells: Vec<Cell>,
    log_changes: bool,
    /// Cell whose writes are rejected
    failing: Option<usize>,
}

/// LED array holding the color and on/off state of each cell
#[derive(Clone)]
pub struct MockIndicators {
    state: Arc<Mutex<IndicatorState>>,
}

impl MockIndicators {
    pub fn new(len: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(IndicatorState {
                cells: vec![Cell::default(); len],
                log_changes: false,
                failing: None,
            })),
        }
    }

    /// Log every visible change at debug level
    pub fn with_logging(self) -> Self {
        self.state.lock().log_changes = true;
        self
    }

    /// Reject every write to `index` until cleared with `None`
    pub fn set_failing_cell(&self, index: Option<usize>) {
        self.state.lock().failing = index;
    }

    /// Color and on/off state of a cell
    pub fn cell(&self, index: usize) -> Option<(Rgb, bool)> {
        self.state.lock().cells.get(index).map(|c| (c.color, c.on))
    }

    /// Cells that are on with a non-black color
    pub fn lit_cells(&self) -> Vec<(usize, Rgb)> {
        self.state
            .lock()
            .cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.on && !c.color.is_off())
            .map(|(i, c)| (i, c.color))
            .collect()
    }

    /// True when every cell is switched off
    pub fn all_off(&self) -> bool {
        self.state.lock().cells.iter().all(|c| !c.on)
    }

    fn update(&self, index: usize, apply: impl FnOnce(&mut Cell)) -> Result<()> {
        let mut state = self.state.lock();
        let len = state.cells.len();
        let log_changes = state.log_changes;
        if state.failing == Some(index) {
            return Err(Error::Io(std::io::Error::other(format!(
                "LED {} not responding",
                index
            ))));
        }
        let cell = state
            .cells
            .get_mut(index)
            .ok_or(Error::IndicatorOutOfRange { index, len })?;
        let before = *cell;
        apply(cell);
        if log_changes && *cell != before {
            log::debug!(
                "LED {}: {} rgb({}, {}, {})",
                index,
                if cell.on { "on" } else { "off" },
                cell.color.red,
                cell.color.green,
                cell.color.blue
            );
        }
        Ok(())
    }
}

impl IndicatorArray for MockIndicators {
    fn len(&self) -> usize {
        self.state.lock().cells.len()
    }

    fn set_color(&mut self, index: usize, color: Rgb) -> Result<()> {
        self.update(index, |cell| cell.color = color)
    }

    fn set_on(&mut self, index: usize) -> Result<()> {
        self.update(index, |cell| cell.on = true)
    }

    fn set_off(&mut self, index: usize) -> Result<()> {
        self.update(index, |cell| cell.on = false)
    }
}

/// Switches pressed from test code (or a script thread)
#[derive(Clone, Default)]
pub struct MockButtons {
    sink: Arc<Mutex<Option<Sender<ButtonEvent>>>>,
}

impl MockButtons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_subscribed(&self) -> bool {
        self.sink.lock().is_some()
    }

    /// Deliver a press; false when nobody is listening
    pub fn press(&self, switch: Switch) -> bool {
        self.deliver(ButtonEvent::pressed(switch))
    }

    /// Deliver a release; false when nobody is listening
    pub fn release(&self, switch: Switch) -> bool {
        self.deliver(ButtonEvent::released(switch))
    }

    /// Press then release
    pub fn click(&self, switch: Switch) -> bool {
        self.press(switch) && self.release(switch)
    }

    fn deliver(&self, event: ButtonEvent) -> bool {
        match self.sink.lock().as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

impl ButtonSource for MockButtons {
    fn subscribe(&mut self, events: Sender<ButtonEvent>) -> Result<()> {
        *self.sink.lock() = Some(events);
        Ok(())
    }
}
