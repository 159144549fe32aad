//! Lateral offset samples for the charting collaborator.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Receiver of `(timestamp, value)` samples
pub trait SampleSink: Send {
    fn add_sample(&mut self, timestamp_ms: u64, value: f64);
}

/// One recorded sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp_ms: u64,
    pub value: f64,
}

/// Fixed-capacity sample buffer; the oldest sample is dropped when full
#[derive(Debug, Clone)]
pub struct SampleRing {
    samples: VecDeque<Sample>,
    capacity: usize,
    overwritten: u64,
}

impl SampleRing {
    /// Create a ring holding at least one sample
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            overwritten: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples dropped to make room
    pub fn overwritten(&self) -> u64 {
        self.overwritten
    }

    pub fn latest(&self) -> Option<Sample> {
        self.samples.back().copied()
    }

    /// Samples oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }
}

impl SampleSink for SampleRing {
    fn add_sample(&mut self, timestamp_ms: u64, value: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
            self.overwritten += 1;
        }
        self.samples.push_back(Sample {
            timestamp_ms,
            value,
        });
    }
}

/// Shared ring, written by the loop and read elsewhere
impl<S: SampleSink> SampleSink for Arc<Mutex<S>> {
    fn add_sample(&mut self, timestamp_ms: u64, value: f64) {
        self.lock().add_sample(timestamp_ms, value);
    }
}
