//! Derived respiratory metrics.
//!
//! Everything here is a pure function of the breath history and the cached
//! movement statistics: rate, regularity, SNR, quality, confidence, apnea,
//! and the sleep-stage heuristic. Insufficient history degrades to zeroed or
//! sentinel values, never to an error.

use crate::types::{SignalQuality, SleepStage};
use crate::window::BreathHistory;

/// Rate is computed over cycles no older than this, anchored at the newest
/// cycle's timestamp.
const RATE_WINDOW_MS: u64 = 30_000;

/// No breath for longer than this raises the apnea flag.
pub const APNEA_THRESHOLD_MS: u64 = 10_000;

const EPSILON: f32 = 1e-6;

/// Respiratory rate in breaths per minute.
///
/// Mean cycle duration over the 30-second slice, newest first; iteration
/// stops at the first cycle outside the window. Fewer than 3 retained
/// cycles yields 0.
pub fn breathing_rate_bpm(history: &BreathHistory) -> f32 {
    if history.len() < 3 {
        return 0.0;
    }
    let now = match history.newest() {
        Some(cycle) => cycle.timestamp_ms,
        None => return 0.0,
    };

    let mut sum = 0.0f32;
    let mut count = 0u32;
    for cycle in history.iter_newest_first() {
        if cycle.timestamp_ms > now || now - cycle.timestamp_ms > RATE_WINDOW_MS {
            break;
        }
        sum += cycle.duration_ms;
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }

    let mean_duration = sum / count as f32;
    if mean_duration < EPSILON {
        return 0.0;
    }
    60_000.0 / mean_duration
}

/// Breathing regularity in [0, 1] from the full retained history.
///
/// One minus the coefficient of variation of cycle durations, clamped.
/// Uses the whole 60-second history rather than the 30-second rate slice;
/// the longer window damps the score against momentary rate shifts.
pub fn breathing_regularity(history: &BreathHistory) -> f32 {
    if history.len() < 5 {
        return 0.0;
    }

    let n = history.len() as f32;
    let mean: f32 = history.iter().map(|c| c.duration_ms).sum::<f32>() / n;
    if mean < EPSILON {
        return 0.0;
    }

    let variance: f32 = history
        .iter()
        .map(|c| {
            let diff = c.duration_ms - mean;
            diff * diff
        })
        .sum::<f32>()
        / n;

    let cv = variance.sqrt() / mean;
    (1.0 - cv).clamp(0.0, 1.0)
}

/// Movement intensity in [0, 1] from the accel-magnitude variance.
pub fn movement_intensity(movement_variance: f32) -> f32 {
    (movement_variance * 10.0).min(1.0)
}

/// Signal-to-noise ratio of breath amplitudes.
///
/// Mean over population standard deviation; degenerate spreads yield 0.
pub fn signal_noise_ratio(history: &BreathHistory) -> f32 {
    if history.len() < 3 {
        return 0.0;
    }

    let n = history.len() as f32;
    let mean: f32 = history.iter().map(|c| c.amplitude).sum::<f32>() / n;
    let variance: f32 = history
        .iter()
        .map(|c| {
            let diff = c.amplitude - mean;
            diff * diff
        })
        .sum::<f32>()
        / n;

    let noise = variance.sqrt();
    if noise < EPSILON {
        return 0.0;
    }
    mean / noise
}

/// Classify overall signal quality from SNR, history depth, and regularity.
///
/// Precedence runs from the data-starved case down to the poor default.
pub fn classify_quality(snr: f32, cycle_count: usize, regularity: f32) -> SignalQuality {
    if cycle_count < 5 {
        return SignalQuality::Unknown;
    }
    if snr > 5.0 && regularity > 0.7 && cycle_count >= 20 {
        return SignalQuality::Excellent;
    }
    if snr > 3.0 && regularity > 0.5 && cycle_count >= 10 {
        return SignalQuality::Good;
    }
    if snr > 1.5 && cycle_count >= 5 {
        return SignalQuality::Fair;
    }
    SignalQuality::Poor
}

/// Heuristic confidence: saturates once 20 cycles are retained.
pub fn confidence(cycle_count: usize) -> f32 {
    (cycle_count as f32 / 20.0).min(1.0)
}

/// Apnea flag: breathing was observed at least once and then stopped for
/// longer than the threshold. A session that never detects a breath never
/// reports apnea.
pub fn possible_apnea(last_breath_ms: u64, now_ms: u64) -> bool {
    last_breath_ms > 0 && now_ms.saturating_sub(last_breath_ms) > APNEA_THRESHOLD_MS
}

/// Rule-based sleep-stage heuristic from movement and breathing regularity.
pub fn classify_sleep_stage(
    movement_intensity: f32,
    breathing_regularity: f32,
    cycle_count: usize,
) -> SleepStage {
    if cycle_count < 5 {
        return SleepStage::Unknown;
    }

    if movement_intensity > 0.4 {
        return SleepStage::Awake;
    }
    if movement_intensity < 0.05 && breathing_regularity > 0.85 {
        return SleepStage::DeepSleep;
    }
    if movement_intensity > 0.15 && movement_intensity < 0.35 {
        // Characteristic rapid micro-movements
        return SleepStage::RemSleep;
    }
    SleepStage::LightSleep
}
