//! Complete respiratory analysis pipeline.
//!
//! This module orchestrates the full data flow from raw IMU samples through
//! gravity separation, breathing-band filtering, phase–memory analysis, and
//! breath peak detection to produce respiratory metrics snapshots.
//!
//! # Architecture
//!
//! Each accelerometer sample drives one end-to-end step:
//! 1. **Windowing**: retain the sample, update magnitude aggregates
//! 2. **Gravity separation**: form the scalar respiration channel
//! 3. **Motion coupling**: blend the latest gyroscope magnitude
//! 4. **Bandpass**: isolate the breathing band
//! 5. **Analysis**: phase–memory operator and peak detector in parallel
//! 6. **Caching**: refresh the rate estimate and movement variance
//!
//! Gyroscope samples are only buffered; they are consulted opportunistically
//! during the accelerometer step.
//!
//! # Determinism & performance
//! - O(1) per sample after session start: fixed memory, no allocation on the
//!   hot path, no I/O
//! - The metrics stream is a deterministic function of the ordered input
//!   stream and the session preamble
//! - A single pipeline instance is not synchronized; callers own threading

use tracing::debug;

use crate::metrics;
use crate::peaks::{BreathPeakConfig, BreathPeakDetector};
use crate::phase::{PhaseMemoryConfig, PhaseMemoryOperator};
use crate::signal::{BandpassFilter, FilterConfig, GravityEstimator};
use crate::types::{BreathCycle, RespiratoryMetrics, SampleError, SensorSample};
use crate::window::{BreathHistory, MagnitudeWindow, SampleWindow, SENSOR_WINDOW_MS};

/// How the gyroscope stream couples into the respiration channel.
///
/// The additive blend reproduces the documented lightweight coupling: the
/// magnitude of the most recent gyro sample, scaled, is added to the
/// respiration scalar. A proper implementation would gate rather than add;
/// this hook exists so gating can be swapped in without touching the rest of
/// the pipeline. Both variants are deterministic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionCoupling {
    /// Add `gain · ‖last gyro‖` to the respiration channel.
    AdditiveBlend {
        /// Scale on the gyro magnitude. Typical: 0.1.
        gain: f32,
    },
    /// Ignore the gyroscope when forming the respiration channel.
    Disabled,
}

impl Default for MotionCoupling {
    fn default() -> Self {
        MotionCoupling::AdditiveBlend { gain: 0.1 }
    }
}

/// Configuration for the complete pipeline.
///
/// Bundles all sub-component configurations into a single coherent package.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Gravity separation parameters.
    pub filter: FilterConfig,
    /// Instability decision parameters.
    pub phase: PhaseMemoryConfig,
    /// Breath peak detection parameters.
    pub peaks: BreathPeakConfig,
    /// Gyroscope coupling hook.
    pub motion_coupling: MotionCoupling,
}

/// Streaming respiratory analysis engine.
///
/// Owns every buffer and component by value; state is mutated exclusively by
/// [`start_session`](Self::start_session), [`feed_gyro`](Self::feed_gyro),
/// and [`feed_accel`](Self::feed_accel). [`metrics`](Self::metrics) is a
/// pure read.
pub struct RespiratoryPipeline {
    config: PipelineConfig,

    // Sensor windows
    gyro_window: SampleWindow,
    accel_window: MagnitudeWindow,
    breath_history: BreathHistory,

    // Processing stages
    gravity: GravityEstimator,
    bandpass: BandpassFilter,
    phase: PhaseMemoryOperator,
    peaks: BreathPeakDetector,

    // Cached per-feed results
    current_bpm: f32,
    movement_variance: f32,
    session_start_ms: u64,
}

impl RespiratoryPipeline {
    /// Creates a pipeline with default configuration.
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    /// Creates a pipeline with custom configuration.
    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            gyro_window: SampleWindow::new(SENSOR_WINDOW_MS),
            accel_window: MagnitudeWindow::new(SENSOR_WINDOW_MS),
            breath_history: BreathHistory::new(),
            gravity: GravityEstimator::new(&config.filter),
            bandpass: BandpassFilter::new(),
            phase: PhaseMemoryOperator::new(config.phase.clone()),
            peaks: BreathPeakDetector::new(config.peaks.clone()),
            current_bpm: 0.0,
            movement_variance: 0.0,
            session_start_ms: 0,
            config,
        }
    }

    /// Reset all streaming state and begin a new monitoring session.
    ///
    /// Safe to call repeatedly; every window and scalar returns to its
    /// documented initial value without reallocating the engine.
    pub fn start_session(&mut self, timestamp_ms: u64) {
        debug!(timestamp_ms, "respiratory session reset");
        self.gyro_window.clear();
        self.accel_window.clear();
        self.breath_history.clear();
        self.gravity.reset();
        self.bandpass.reset();
        self.phase.reset();
        self.peaks.reset();
        self.current_bpm = 0.0;
        self.movement_variance = 0.0;
        self.session_start_ms = timestamp_ms;
    }

    /// Ingest one gyroscope sample.
    ///
    /// The sample is only buffered; it contributes to the respiration channel
    /// on the next accelerometer step. Non-finite components reject the
    /// sample with no state change.
    pub fn feed_gyro(&mut self, x: f32, y: f32, z: f32, timestamp_ms: u64) -> Result<(), SampleError> {
        let sample = SensorSample::new(x, y, z, timestamp_ms);
        // The magnitude check also catches finite components whose squared
        // sum overflows f32; infinity must never enter the windows.
        if !sample.is_finite() || !sample.magnitude().is_finite() {
            return Err(SampleError::NonFinite);
        }
        self.gyro_window.push(sample);
        Ok(())
    }

    /// Ingest one accelerometer sample and run the full pipeline step.
    ///
    /// Non-finite components reject the sample with no state change.
    pub fn feed_accel(&mut self, x: f32, y: f32, z: f32, timestamp_ms: u64) -> Result<(), SampleError> {
        let sample = SensorSample::new(x, y, z, timestamp_ms);
        if !sample.is_finite() || !sample.magnitude().is_finite() {
            return Err(SampleError::NonFinite);
        }

        let magnitude = self.accel_window.push(sample);

        // Scalar respiration channel: gravity-removed accel magnitude.
        let mut respiration = self.gravity.update(magnitude);

        // Opportunistic gyroscope contribution.
        if let MotionCoupling::AdditiveBlend { gain } = self.config.motion_coupling {
            if let Some(gyro) = self.gyro_window.last() {
                respiration += gyro.magnitude() * gain;
            }
        }

        // Isolate the breathing band, then run both analysis branches on the
        // same filtered stream.
        let filtered = self.bandpass.process(respiration);
        self.phase.update(filtered);
        self.peaks.update(filtered, timestamp_ms, &mut self.breath_history);
        self.breath_history.trim(timestamp_ms);

        self.current_bpm = metrics::breathing_rate_bpm(&self.breath_history);

        self.movement_variance = if self.accel_window.len() > 10 {
            self.accel_window.variance()
        } else {
            0.0
        };

        Ok(())
    }

    /// Produce a fresh metrics snapshot from current state.
    ///
    /// Never mutates the pipeline; `now_ms` only drives the apnea check.
    pub fn metrics(&self, now_ms: u64) -> RespiratoryMetrics {
        let cycle_count = self.breath_history.len();
        let regularity = metrics::breathing_regularity(&self.breath_history);
        let movement = metrics::movement_intensity(self.movement_variance);
        let snr = metrics::signal_noise_ratio(&self.breath_history);

        RespiratoryMetrics {
            current_stage: metrics::classify_sleep_stage(movement, regularity, cycle_count),
            confidence: metrics::confidence(cycle_count),
            breathing_rate_bpm: self.current_bpm,
            breathing_regularity: regularity,
            movement_intensity: movement,
            breath_cycles_detected: cycle_count as u32,
            possible_apnea: metrics::possible_apnea(self.peaks.last_breath_ms(), now_ms),
            signal_quality: metrics::classify_quality(snr, cycle_count, regularity),
            signal_noise_ratio: snr,
            instability_score: self.phase.instability_score(),
            instability_detected: self.phase.instability_detected(),
        }
    }

    /// Retained breath cycles, oldest first (advanced analysis).
    pub fn breath_history(&self) -> impl Iterator<Item = &BreathCycle> {
        self.breath_history.iter()
    }

    /// σ_ω from the instability calibration window.
    pub fn baseline_sigma(&self) -> f32 {
        self.phase.baseline_sigma()
    }

    /// Current gravity baseline in m/s².
    pub fn gravity_estimate(&self) -> f32 {
        self.gravity.estimate()
    }

    /// Timestamp passed to the last [`start_session`](Self::start_session).
    pub fn session_start_ms(&self) -> u64 {
        self.session_start_ms
    }
}

impl Default for RespiratoryPipeline {
    fn default() -> Self {
        Self::new()
    }
}
