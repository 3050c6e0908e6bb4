//! Core data types for the respiratory monitoring engine.
//!
//! This module defines the fundamental types used throughout the breathing
//! analysis pipeline. All types are carefully designed to minimize allocation
//! and maximize clarity.
//!
//! Design principle: Types should make intent obvious. If a concept exists,
//! it gets a type. Never pass raw tuples or untyped collections across boundaries.

use thiserror::Error;

/// A single timestamped three-axis sensor sample.
///
/// This represents the minimal input contract for both sensor channels:
/// three axes plus a monotonic timestamp. It is never interpreted at this
/// layer, only preserved.
///
/// Design note: We use f32 for on-device execution to save memory and battery.
/// Breathing-band analysis does not need double precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    /// X-axis reading (accelerometer m/s², gyroscope rad/s).
    pub x: f32,
    /// Y-axis reading.
    pub y: f32,
    /// Z-axis reading.
    pub z: f32,
    /// Monotonic timestamp in milliseconds. Required for temporal ordering.
    pub timestamp_ms: u64,
}

impl SensorSample {
    /// Creates a new sensor sample.
    ///
    /// Assumptions:
    /// - timestamp_ms should be monotonically increasing within a channel
    /// - readings are calibrated (device-specific bias removed)
    pub fn new(x: f32, y: f32, z: f32, timestamp_ms: u64) -> Self {
        Self { x, y, z, timestamp_ms }
    }

    /// Euclidean magnitude of the three axes.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// True when every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A validated breath cycle extracted by the peak detector.
///
/// One record per detected inhalation peak whose spacing from the previous
/// peak falls inside the physiological range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreathCycle {
    /// Timestamp of the peak that closed this cycle (ms).
    pub timestamp_ms: u64,
    /// Time since the previous peak (ms). Always in (500, 6000).
    pub duration_ms: f32,
    /// Peak value normalized by the ring's standard deviation.
    pub amplitude: f32,
}

/// Input validation failure for a sensor sample.
///
/// Surfaced on the Rust API; the C boundary maps it to a silent drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SampleError {
    /// One or more components were NaN or infinite.
    #[error("sensor sample contains a non-finite component")]
    NonFinite,
}

/// Coarse sleep stage inferred from movement and breathing regularity.
///
/// This is a rule-based heuristic, not a clinical hypnogram. The engine
/// reports what the motion evidence supports and nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SleepStage {
    /// Sustained movement; the wearer is awake or restless.
    Awake,
    /// Moderate stillness with imperfect breathing regularity.
    LightSleep,
    /// Near-total stillness with highly regular breathing.
    DeepSleep,
    /// Characteristic rapid micro-movements between still intervals.
    RemSleep,
    /// Not enough breath history to classify.
    #[default]
    Unknown,
}

impl SleepStage {
    /// Stable integer encoding used across the C boundary.
    pub fn as_i32(self) -> i32 {
        match self {
            SleepStage::Awake => 0,
            SleepStage::LightSleep => 1,
            SleepStage::DeepSleep => 2,
            SleepStage::RemSleep => 3,
            SleepStage::Unknown => 4,
        }
    }
}

/// Overall quality assessment of the breathing signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalQuality {
    /// High SNR, consistent cycles, plenty of history.
    Excellent,
    /// Acceptable SNR and regularity.
    Good,
    /// Marginal quality; metrics usable with caution.
    Fair,
    /// Too noisy or too little signal for dependable metrics.
    Poor,
    /// Not enough data to assess.
    #[default]
    Unknown,
}

impl SignalQuality {
    /// Stable integer encoding used across the C boundary.
    pub fn as_i32(self) -> i32 {
        match self {
            SignalQuality::Excellent => 0,
            SignalQuality::Good => 1,
            SignalQuality::Fair => 2,
            SignalQuality::Poor => 3,
            SignalQuality::Unknown => 4,
        }
    }
}

/// A complete respiratory metrics snapshot.
///
/// This is the primary output of the engine: an immutable record computed
/// from current state by [`crate::pipeline::RespiratoryPipeline::metrics`].
/// Producing it never mutates the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RespiratoryMetrics {
    /// Inferred sleep stage.
    pub current_stage: SleepStage,
    /// Heuristic confidence in the snapshot [0.0, 1.0].
    pub confidence: f32,
    /// Estimated respiratory rate in breaths per minute (0 when unknown).
    pub breathing_rate_bpm: f32,
    /// Breathing regularity [0.0, 1.0]; higher is more consistent.
    pub breathing_regularity: f32,
    /// Movement intensity [0.0, 1.0]; higher is more movement.
    pub movement_intensity: f32,
    /// Number of breath cycles currently retained in the 60 s history.
    pub breath_cycles_detected: u32,
    /// True when breathing stopped for longer than the apnea threshold.
    pub possible_apnea: bool,
    /// Signal quality classification.
    pub signal_quality: SignalQuality,
    /// Estimated signal-to-noise ratio of breath amplitudes (>= 0).
    pub signal_noise_ratio: f32,
    /// Phase-memory divergence |ω(t) − ω̄(t)| in rad/s.
    pub instability_score: f32,
    /// True when the divergence exceeds the calibrated threshold.
    pub instability_detected: bool,
}

impl Default for RespiratoryMetrics {
    /// The zero snapshot: what a fresh or failed query reports.
    fn default() -> Self {
        Self {
            current_stage: SleepStage::Unknown,
            confidence: 0.0,
            breathing_rate_bpm: 0.0,
            breathing_regularity: 0.0,
            movement_intensity: 0.0,
            breath_cycles_detected: 0,
            possible_apnea: false,
            signal_quality: SignalQuality::Unknown,
            signal_noise_ratio: 0.0,
            instability_score: 0.0,
            instability_detected: false,
        }
    }
}

impl RespiratoryMetrics {
    /// True when every floating-point field is finite.
    pub fn is_finite(&self) -> bool {
        self.confidence.is_finite()
            && self.breathing_rate_bpm.is_finite()
            && self.breathing_regularity.is_finite()
            && self.movement_intensity.is_finite()
            && self.signal_noise_ratio.is_finite()
            && self.instability_score.is_finite()
    }
}
