//! Time-windowed sample stores and fixed-capacity rings.
//!
//! Three storage policies cover every buffer in the engine:
//! - Prefix-trimmed sample windows: append on ingest, then evict any entries
//!   older than the window duration relative to the just-ingested timestamp.
//! - A fixed-capacity scalar ring where eviction is implicit via overwrite.
//! - A prefix-trimmed breath-cycle history.
//!
//! All aggregates (running sum, running sum of squares) are maintained
//! incrementally: O(1) per sample, no rescans on the hot path.
//!
//! Design note: timestamp arithmetic uses saturating subtraction, so an
//! out-of-order ingest timestamp evicts nothing instead of draining the
//! window.

use std::collections::VecDeque;

use crate::types::{BreathCycle, SensorSample};

/// Retention for the raw sensor windows (gyro and accel).
pub const SENSOR_WINDOW_MS: u64 = 5_000;

/// Retention for the breath-cycle history.
pub const BREATH_WINDOW_MS: u64 = 60_000;

/// A time-trimmed window of raw sensor samples.
///
/// Used for the gyroscope channel, where only the most recent sample and the
/// retained count matter.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<SensorSample>,
    window_ms: u64,
}

impl SampleWindow {
    /// Create an empty window with the given retention duration.
    pub fn new(window_ms: u64) -> Self {
        Self {
            samples: VecDeque::new(),
            window_ms,
        }
    }

    /// Append a sample, then trim entries older than the retention window
    /// relative to the appended timestamp.
    pub fn push(&mut self, sample: SensorSample) {
        self.samples.push_back(sample);
        let now = sample.timestamp_ms;
        while let Some(front) = self.samples.front() {
            if now.saturating_sub(front.timestamp_ms) > self.window_ms {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Most recently ingested sample, if any.
    pub fn last(&self) -> Option<&SensorSample> {
        self.samples.back()
    }

    /// Oldest retained sample, if any.
    pub fn oldest(&self) -> Option<&SensorSample> {
        self.samples.front()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drop all retained samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// A time-trimmed accelerometer window tracking per-sample magnitudes with
/// streaming aggregates.
///
/// The magnitude sequence is kept strictly parallel to the sample sequence:
/// every insertion and eviction updates the running sum and sum of squares,
/// so mean and variance are O(1) reads.
#[derive(Debug, Clone)]
pub struct MagnitudeWindow {
    samples: VecDeque<SensorSample>,
    magnitudes: VecDeque<f32>,
    sum: f32,
    sum_squares: f32,
    window_ms: u64,
}

impl MagnitudeWindow {
    pub fn new(window_ms: u64) -> Self {
        Self {
            samples: VecDeque::new(),
            magnitudes: VecDeque::new(),
            sum: 0.0,
            sum_squares: 0.0,
            window_ms,
        }
    }

    /// Append a sample and its magnitude, then trim the stale prefix.
    ///
    /// Returns the magnitude of the appended sample.
    pub fn push(&mut self, sample: SensorSample) -> f32 {
        let magnitude = sample.magnitude();
        self.samples.push_back(sample);
        self.magnitudes.push_back(magnitude);
        self.sum += magnitude;
        self.sum_squares += magnitude * magnitude;

        let now = sample.timestamp_ms;
        while let Some(front) = self.samples.front() {
            if now.saturating_sub(front.timestamp_ms) > self.window_ms {
                if let Some(outgoing) = self.magnitudes.pop_front() {
                    self.sum -= outgoing;
                    self.sum_squares -= outgoing * outgoing;
                }
                self.samples.pop_front();
            } else {
                break;
            }
        }
        magnitude
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Oldest retained sample, if any.
    pub fn oldest(&self) -> Option<&SensorSample> {
        self.samples.front()
    }

    /// Population variance of the retained magnitudes.
    ///
    /// Streaming sums can drift after long sessions; if the computed variance
    /// falls below a small negative epsilon the aggregates are rebuilt from
    /// the retained values before recomputing. Mild negatives inside the
    /// tolerance are clamped to zero.
    pub fn variance(&mut self) -> f32 {
        let n = self.magnitudes.len();
        if n == 0 {
            return 0.0;
        }
        let mean = self.sum / n as f32;
        let mut variance = self.sum_squares / n as f32 - mean * mean;
        if variance < -1e-3 {
            self.rebuild_aggregates();
            let mean = self.sum / n as f32;
            variance = self.sum_squares / n as f32 - mean * mean;
        }
        variance.max(0.0)
    }

    fn rebuild_aggregates(&mut self) {
        self.sum = self.magnitudes.iter().sum();
        self.sum_squares = self.magnitudes.iter().map(|m| m * m).sum();
    }

    /// Drop all retained samples and zero the aggregates.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.magnitudes.clear();
        self.sum = 0.0;
        self.sum_squares = 0.0;
    }

    #[cfg(test)]
    pub(crate) fn aggregates(&self) -> (f32, f32) {
        (self.sum, self.sum_squares)
    }
}

/// A fixed-capacity circular buffer of scalars with streaming aggregates.
///
/// Slots start at zero and are overwritten in ring order; statistics are
/// always taken over the full capacity, treating unwritten slots as zeros.
#[derive(Debug, Clone)]
pub struct ScalarRing {
    slots: Vec<f32>,
    index: usize,
    sum: f32,
    sum_squares: f32,
}

impl ScalarRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![0.0; capacity.max(1)],
            index: 0,
            sum: 0.0,
            sum_squares: 0.0,
        }
    }

    /// Overwrite the current slot, updating the aggregates with the value
    /// going out and the value coming in, then advance the write index.
    pub fn push(&mut self, value: f32) {
        // Defensive recovery: an impossible index is clamped, not propagated.
        if self.index >= self.slots.len() {
            self.index = 0;
        }
        let outgoing = self.slots[self.index];
        self.slots[self.index] = value;
        self.sum += value - outgoing;
        self.sum_squares += value * value - outgoing * outgoing;
        self.index = (self.index + 1) % self.slots.len();
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Mean over the full capacity (zeros included).
    pub fn mean(&self) -> f32 {
        self.sum / self.slots.len() as f32
    }

    /// Population standard deviation over the full capacity, clamped to be
    /// non-negative before the square root.
    pub fn std_dev(&self) -> f32 {
        let n = self.slots.len() as f32;
        let mean = self.sum / n;
        let variance = self.sum_squares / n - mean * mean;
        variance.max(0.0).sqrt()
    }

    /// Reset every slot to zero and rewind the index.
    pub fn clear(&mut self) {
        self.slots.fill(0.0);
        self.index = 0;
        self.sum = 0.0;
        self.sum_squares = 0.0;
    }
}

/// Prefix-trimmed history of validated breath cycles.
#[derive(Debug, Clone, Default)]
pub struct BreathHistory {
    cycles: VecDeque<BreathCycle>,
}

impl BreathHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a cycle, then trim entries older than the retention window
    /// relative to the appended timestamp.
    pub fn push(&mut self, cycle: BreathCycle) {
        let now = cycle.timestamp_ms;
        self.cycles.push_back(cycle);
        self.trim(now);
    }

    /// Evict every cycle older than the retention window relative to `now_ms`.
    ///
    /// Called on each ingest step as well as on push, so quiet stretches age
    /// stale cycles out instead of freezing the history.
    pub fn trim(&mut self, now_ms: u64) {
        while let Some(front) = self.cycles.front() {
            if now_ms.saturating_sub(front.timestamp_ms) > BREATH_WINDOW_MS {
                self.cycles.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Newest retained cycle, if any.
    pub fn newest(&self) -> Option<&BreathCycle> {
        self.cycles.back()
    }

    /// Oldest-to-newest iteration.
    pub fn iter(&self) -> impl Iterator<Item = &BreathCycle> {
        self.cycles.iter()
    }

    /// Newest-to-oldest iteration (used by the 30 s rate slice).
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &BreathCycle> {
        self.cycles.iter().rev()
    }

    pub fn clear(&mut self) {
        self.cycles.clear();
    }
}
