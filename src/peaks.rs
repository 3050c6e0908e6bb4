//! Breath peak detection on the bandpass output.
//!
//! A two-state detector with an adaptive threshold and hysteresis:
//! - The threshold rides at mean + k·σ̂ over a fixed ring of recent samples,
//!   so it tracks slow amplitude changes without manual tuning.
//! - Entering a peak requires crossing the threshold; leaving requires
//!   dropping below a fraction of it, which suppresses chatter near the
//!   crossing point.
//! - A peak closes a breath cycle only when its spacing from the previous
//!   peak lands in the physiological range (10–120 breaths per minute).
//!
//! Runs in parallel with the phase–memory operator on the same filtered
//! stream; this branch feeds rate, regularity, SNR, and apnea.

use crate::types::BreathCycle;
use crate::window::{BreathHistory, ScalarRing};

/// Configuration for breath peak detection.
#[derive(Debug, Clone)]
pub struct BreathPeakConfig {
    /// Ring capacity for threshold statistics. Typical: 256 (~5 s at 50 Hz).
    pub ring_capacity: usize,
    /// Threshold sits at mean + this multiple of σ̂. Typical: 0.6.
    pub threshold_multiplier: f32,
    /// Release level as a fraction of the threshold. Typical: 0.8.
    pub release_ratio: f32,
    /// Minimum peak spacing accepted as a breath (ms, exclusive).
    pub min_breath_ms: u64,
    /// Maximum peak spacing accepted as a breath (ms, exclusive).
    pub max_breath_ms: u64,
}

impl Default for BreathPeakConfig {
    fn default() -> Self {
        Self {
            ring_capacity: 256,
            threshold_multiplier: 0.6,
            release_ratio: 0.8,
            min_breath_ms: 500,
            max_breath_ms: 6_000,
        }
    }
}

/// Hysteresis margin on the release comparison.
const EPSILON: f32 = 1e-6;

/// Floor on σ̂ to keep the threshold and amplitude normalization away from
/// a degenerate zero-variance ring.
const MIN_STD_DEV: f32 = 1e-6;

/// Initial threshold before the ring has seen any signal.
const INITIAL_THRESHOLD: f32 = 0.1;

/// Adaptive-threshold breath peak detector.
#[derive(Debug, Clone)]
pub struct BreathPeakDetector {
    config: BreathPeakConfig,
    ring: ScalarRing,
    threshold: f32,
    in_peak: bool,
    last_peak_ms: u64,
    last_peak_value: f32,
    last_breath_ms: u64,
}

impl BreathPeakDetector {
    pub fn new(config: BreathPeakConfig) -> Self {
        let ring = ScalarRing::new(config.ring_capacity);
        Self {
            config,
            ring,
            threshold: INITIAL_THRESHOLD,
            in_peak: false,
            last_peak_ms: 0,
            last_peak_value: 0.0,
            last_breath_ms: 0,
        }
    }

    /// Feed one filtered sample. A validated breath cycle, if any, is
    /// appended to `history`.
    pub fn update(&mut self, signal: f32, timestamp_ms: u64, history: &mut BreathHistory) {
        self.ring.push(signal);

        let mean = self.ring.mean();
        let std_dev = self.ring.std_dev().max(MIN_STD_DEV);
        self.threshold = mean + std_dev * self.config.threshold_multiplier;

        if !self.in_peak && signal > self.threshold {
            self.in_peak = true;

            // A stale timestamp cannot produce a negative duration.
            if self.last_peak_ms > 0 && timestamp_ms >= self.last_peak_ms {
                let duration = timestamp_ms - self.last_peak_ms;
                if duration > self.config.min_breath_ms && duration < self.config.max_breath_ms {
                    history.push(BreathCycle {
                        timestamp_ms,
                        duration_ms: duration as f32,
                        amplitude: signal / std_dev,
                    });
                    self.last_breath_ms = timestamp_ms;
                }
            }

            self.last_peak_ms = timestamp_ms;
            self.last_peak_value = signal;
        } else if self.in_peak && signal < self.threshold * self.config.release_ratio - EPSILON {
            self.in_peak = false;
        }
    }

    /// Timestamp of the last validated breath (0 before the first one).
    pub fn last_breath_ms(&self) -> u64 {
        self.last_breath_ms
    }

    /// Current adaptive threshold (diagnostics).
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Value of the sample that opened the most recent peak.
    pub fn last_peak_value(&self) -> f32 {
        self.last_peak_value
    }

    /// True while the detector is inside a peak.
    pub fn in_peak(&self) -> bool {
        self.in_peak
    }

    /// Return all state to the documented initial values.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.threshold = INITIAL_THRESHOLD;
        self.in_peak = false;
        self.last_peak_ms = 0;
        self.last_peak_value = 0.0;
        self.last_breath_ms = 0;
    }
}

impl Default for BreathPeakDetector {
    fn default() -> Self {
        Self::new(BreathPeakConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed a 50 Hz sine of the given breathing frequency for `seconds`.
    fn feed_breathing(
        detector: &mut BreathPeakDetector,
        history: &mut BreathHistory,
        freq_hz: f32,
        seconds: f32,
        start_ms: u64,
    ) -> u64 {
        let count = (seconds * 50.0) as u64;
        for i in 0..count {
            let t = i as f32 / 50.0;
            let signal = (2.0 * std::f32::consts::PI * freq_hz * t).sin();
            detector.update(signal, start_ms + i * 20, history);
        }
        start_ms + count * 20
    }

    #[test]
    fn test_detects_cycles_at_breathing_rate() {
        let mut detector = BreathPeakDetector::default();
        let mut history = BreathHistory::new();
        // 0.25 Hz = 15 BPM for 40 s => ~10 peaks, first one opens no cycle
        feed_breathing(&mut detector, &mut history, 0.25, 40.0, 0);

        assert!(history.len() >= 6, "expected cycles, got {}", history.len());
        for cycle in history.iter() {
            assert!(cycle.duration_ms > 500.0 && cycle.duration_ms < 6_000.0);
            assert!((cycle.duration_ms - 4_000.0).abs() < 300.0,
                "cycle duration should be near 4 s, got {}", cycle.duration_ms);
        }
    }

    #[test]
    fn test_amplitude_is_normalized() {
        let mut detector = BreathPeakDetector::default();
        let mut history = BreathHistory::new();
        feed_breathing(&mut detector, &mut history, 0.25, 40.0, 0);

        for cycle in history.iter() {
            // Crossing sample sits near mean + 0.6σ̂, so the normalized value
            // lands well inside (0, 5)
            assert!(cycle.amplitude > 0.1 && cycle.amplitude < 5.0,
                "normalized amplitude out of range: {}", cycle.amplitude);
        }
    }

    #[test]
    fn test_too_fast_cycles_rejected() {
        let mut detector = BreathPeakDetector::default();
        let mut history = BreathHistory::new();
        // 3 Hz oscillation: peak spacing ~333 ms, below the breath floor
        feed_breathing(&mut detector, &mut history, 3.0, 20.0, 0);
        assert_eq!(history.len(), 0, "sub-physiological cycles must be dropped");
    }

    #[test]
    fn test_too_slow_cycles_rejected() {
        let mut detector = BreathPeakDetector::default();
        let mut history = BreathHistory::new();
        // 0.1 Hz oscillation: peak spacing 10 s, above the breath ceiling
        feed_breathing(&mut detector, &mut history, 0.1, 60.0, 0);
        assert_eq!(history.len(), 0, "super-slow cycles must be dropped");
    }

    #[test]
    fn test_hysteresis_prevents_double_trigger() {
        let mut detector = BreathPeakDetector::default();
        let mut history = BreathHistory::new();

        // Prime the ring so the threshold settles
        for i in 0..256 {
            detector.update(0.0, i * 20, &mut history);
        }
        let threshold = detector.threshold();

        // Cross once, then hover just above the release level: still in peak
        detector.update(threshold + 1.0, 6_000, &mut history);
        assert!(detector.in_peak());
        assert!(detector.last_peak_value() > threshold);
        detector.update(detector.threshold() * 0.95, 6_020, &mut history);
        assert!(detector.in_peak(), "hovering above release must stay in peak");
    }

    #[test]
    fn test_stale_timestamp_opens_no_cycle() {
        let mut detector = BreathPeakDetector::default();
        let mut history = BreathHistory::new();
        feed_breathing(&mut detector, &mut history, 0.25, 20.0, 10_000);
        let cycles_before = history.len();

        // Force a peak with a timestamp older than the last one
        detector.update(10.0, 5_000, &mut history);
        assert_eq!(history.len(), cycles_before, "stale peak must not append");
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut detector = BreathPeakDetector::default();
        let mut history = BreathHistory::new();
        feed_breathing(&mut detector, &mut history, 0.25, 30.0, 0);
        assert!(detector.last_breath_ms() > 0);

        detector.reset();
        assert_eq!(detector.last_breath_ms(), 0);
        assert!(!detector.in_peak());
        assert_eq!(detector.threshold(), INITIAL_THRESHOLD);
    }
}
