//! Session export for debugging and dashboard consumption.
//!
//! Produces a self-contained JSON snapshot of the current metrics and the
//! retained breath history. This is the slow path: it allocates and
//! serializes, so it belongs at session boundaries or on-demand queries,
//! never inside the per-sample loop.

use serde::Serialize;

use crate::pipeline::RespiratoryPipeline;
use crate::types::{RespiratoryMetrics, SignalQuality, SleepStage};

/// Complete session snapshot for export.
#[derive(Debug, Clone, Serialize)]
pub struct SessionExport {
    /// Schema version for downstream compatibility.
    pub schema_version: u32,
    /// Engine version string.
    pub engine_version: &'static str,
    /// Timestamp passed to the last session start (ms).
    pub session_start_ms: u64,
    /// Timestamp at which this snapshot was captured (ms).
    pub captured_at_ms: u64,
    /// Metrics at capture time.
    pub metrics: MetricsExport,
    /// Retained breath cycles, oldest first.
    pub breath_cycles: Vec<BreathCycleExport>,
}

/// Metrics record flattened for export.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsExport {
    pub stage: &'static str,
    pub confidence: f32,
    pub breathing_rate_bpm: f32,
    pub breathing_regularity: f32,
    pub movement_intensity: f32,
    pub breath_cycles_detected: u32,
    pub possible_apnea: bool,
    pub signal_quality: &'static str,
    pub signal_noise_ratio: f32,
    pub instability_score: f32,
    pub instability_detected: bool,
}

/// One breath cycle for export.
#[derive(Debug, Clone, Serialize)]
pub struct BreathCycleExport {
    pub timestamp_ms: u64,
    pub duration_ms: f32,
    pub amplitude: f32,
}

impl SessionExport {
    /// Current export schema version.
    pub const SCHEMA_VERSION: u32 = 1;

    /// Capture a snapshot of the pipeline at `now_ms`.
    pub fn capture(pipeline: &RespiratoryPipeline, now_ms: u64) -> Self {
        let metrics = pipeline.metrics(now_ms);
        Self {
            schema_version: Self::SCHEMA_VERSION,
            engine_version: crate::VERSION,
            session_start_ms: pipeline.session_start_ms(),
            captured_at_ms: now_ms,
            metrics: MetricsExport::from(&metrics),
            breath_cycles: pipeline
                .breath_history()
                .map(|cycle| BreathCycleExport {
                    timestamp_ms: cycle.timestamp_ms,
                    duration_ms: cycle.duration_ms,
                    amplitude: cycle.amplitude,
                })
                .collect(),
        }
    }

    /// Serialize to a compact JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<&RespiratoryMetrics> for MetricsExport {
    fn from(metrics: &RespiratoryMetrics) -> Self {
        Self {
            stage: stage_label(metrics.current_stage),
            confidence: metrics.confidence,
            breathing_rate_bpm: metrics.breathing_rate_bpm,
            breathing_regularity: metrics.breathing_regularity,
            movement_intensity: metrics.movement_intensity,
            breath_cycles_detected: metrics.breath_cycles_detected,
            possible_apnea: metrics.possible_apnea,
            signal_quality: quality_label(metrics.signal_quality),
            signal_noise_ratio: metrics.signal_noise_ratio,
            instability_score: metrics.instability_score,
            instability_detected: metrics.instability_detected,
        }
    }
}

fn stage_label(stage: SleepStage) -> &'static str {
    match stage {
        SleepStage::Awake => "awake",
        SleepStage::LightSleep => "light",
        SleepStage::DeepSleep => "deep",
        SleepStage::RemSleep => "rem",
        SleepStage::Unknown => "unknown",
    }
}

fn quality_label(quality: SignalQuality) -> &'static str {
    match quality {
        SignalQuality::Excellent => "excellent",
        SignalQuality::Good => "good",
        SignalQuality::Fair => "fair",
        SignalQuality::Poor => "poor",
        SignalQuality::Unknown => "unknown",
    }
}
