//! C FFI bindings for mobile platform integration.
//!
//! This module exposes the respiratory engine to iOS/Android via a flat C
//! ABI. Platform sensor callbacks feed samples; the UI layer polls metrics.
//!
//! Memory Safety:
//! - The engine instance must be freed with `breathsense_engine_destroy()`
//! - Strings returned by `breathsense_export_session_json()` must be freed
//!   with `breathsense_free_string()`
//! - NULL checks are performed on all inputs
//!
//! Error policy:
//! - Every operation is null-safe: a NULL handle degrades to a no-op, and
//!   `breathsense_query_metrics` zero-fills its output
//! - Non-finite sensor components are dropped silently
//! - Internal faults are caught at the boundary and degrade to the same
//!   zero-filled contract; nothing ever unwinds across the ABI
//!
//! Thread Safety:
//! - A single engine is NOT thread-safe. Use one thread or a mutex.
//! - Distinct engines are fully independent.

use std::ffi::CString;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

use crate::export::SessionExport;
use crate::pipeline::RespiratoryPipeline;
use crate::types::RespiratoryMetrics;

// ============================================================================
// OPAQUE HANDLE AND OUTPUT RECORD
// ============================================================================

/// Opaque handle to a respiratory engine instance.
pub struct BreathEngine {
    pipeline: RespiratoryPipeline,
}

/// Respiratory metrics record crossing the C boundary.
///
/// Field order and widths are part of the external contract; do not reorder.
///
/// Encodings:
/// - `current_stage`: 0=AWAKE, 1=LIGHT, 2=DEEP, 3=REM, 4=UNKNOWN
/// - `signal_quality`: 0=EXCELLENT, 1=GOOD, 2=FAIR, 3=POOR, 4=UNKNOWN
/// - `possible_apnea`, `instability_detected`: 0 or 1
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BreathMetrics {
    /// Sleep stage classification.
    pub current_stage: i32,
    /// Heuristic confidence [0.0, 1.0].
    pub confidence: f32,
    /// Respiratory rate in breaths per minute (>= 0).
    pub breathing_rate_bpm: f32,
    /// Breathing regularity [0.0, 1.0].
    pub breathing_regularity: f32,
    /// Movement intensity [0.0, 1.0].
    pub movement_intensity: f32,
    /// Breath cycles retained in the 60 s history (>= 0).
    pub breath_cycles_detected: i32,
    /// Apnea flag (0 or 1).
    pub possible_apnea: i32,
    /// Signal quality classification.
    pub signal_quality: i32,
    /// Breath-amplitude SNR estimate (>= 0).
    pub signal_noise_ratio: f32,
    /// Phase-memory divergence in rad/s (>= 0).
    pub instability_score: f32,
    /// Instability decision (0 or 1).
    pub instability_detected: i32,
}

impl BreathMetrics {
    /// The safe-default record: all zeros with stage and quality UNKNOWN.
    fn zeroed() -> Self {
        Self {
            current_stage: 4,
            confidence: 0.0,
            breathing_rate_bpm: 0.0,
            breathing_regularity: 0.0,
            movement_intensity: 0.0,
            breath_cycles_detected: 0,
            possible_apnea: 0,
            signal_quality: 4,
            signal_noise_ratio: 0.0,
            instability_score: 0.0,
            instability_detected: 0,
        }
    }
}

impl From<RespiratoryMetrics> for BreathMetrics {
    fn from(metrics: RespiratoryMetrics) -> Self {
        Self {
            current_stage: metrics.current_stage.as_i32(),
            confidence: metrics.confidence,
            breathing_rate_bpm: metrics.breathing_rate_bpm,
            breathing_regularity: metrics.breathing_regularity,
            movement_intensity: metrics.movement_intensity,
            breath_cycles_detected: metrics.breath_cycles_detected as i32,
            possible_apnea: metrics.possible_apnea as i32,
            signal_quality: metrics.signal_quality.as_i32(),
            signal_noise_ratio: metrics.signal_noise_ratio,
            instability_score: metrics.instability_score,
            instability_detected: metrics.instability_detected as i32,
        }
    }
}

// ============================================================================
// ENGINE LIFECYCLE
// ============================================================================

/// Create a new respiratory engine instance.
///
/// The returned pointer must be freed with `breathsense_engine_destroy()`.
///
/// # Returns
/// - Pointer to the engine on success.
/// - NULL on failure.
#[no_mangle]
pub extern "C" fn breathsense_engine_create() -> *mut BreathEngine {
    let engine = catch_unwind(|| {
        Box::new(BreathEngine {
            pipeline: RespiratoryPipeline::new(),
        })
    });
    match engine {
        Ok(engine) => Box::into_raw(engine),
        Err(_) => ptr::null_mut(),
    }
}

/// Destroy an engine instance and release all resources.
///
/// # Safety
/// - `engine` must be NULL or a pointer from `breathsense_engine_create()`.
/// - Must not be called more than once for the same pointer.
#[no_mangle]
pub unsafe extern "C" fn breathsense_engine_destroy(engine: *mut BreathEngine) {
    if engine.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        drop(Box::from_raw(engine));
    }));
}

/// Reset all streaming state and begin a new monitoring session.
///
/// Safe to call repeatedly.
///
/// # Safety
/// `engine` must be NULL or a valid engine pointer.
#[no_mangle]
pub unsafe extern "C" fn breathsense_start_session(engine: *mut BreathEngine, timestamp_ms: u64) {
    if engine.is_null() {
        return;
    }
    let engine = &mut *engine;
    let _ = catch_unwind(AssertUnwindSafe(|| {
        engine.pipeline.start_session(timestamp_ms);
    }));
}

// ============================================================================
// SENSOR INGESTION
// ============================================================================

/// Feed one gyroscope sample (rad/s or device-native units).
///
/// Non-finite components are rejected silently; engine state is unchanged.
///
/// # Safety
/// `engine` must be NULL or a valid engine pointer.
#[no_mangle]
pub unsafe extern "C" fn breathsense_feed_gyro(
    engine: *mut BreathEngine,
    x: f32,
    y: f32,
    z: f32,
    timestamp_ms: u64,
) {
    if engine.is_null() {
        return;
    }
    let engine = &mut *engine;
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let _ = engine.pipeline.feed_gyro(x, y, z, timestamp_ms);
    }));
}

/// Feed one accelerometer sample (m/s² or device-native units).
///
/// Non-finite components are rejected silently; engine state is unchanged.
///
/// # Safety
/// `engine` must be NULL or a valid engine pointer.
#[no_mangle]
pub unsafe extern "C" fn breathsense_feed_accel(
    engine: *mut BreathEngine,
    x: f32,
    y: f32,
    z: f32,
    timestamp_ms: u64,
) {
    if engine.is_null() {
        return;
    }
    let engine = &mut *engine;
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let _ = engine.pipeline.feed_accel(x, y, z, timestamp_ms);
    }));
}

// ============================================================================
// METRICS RETRIEVAL
// ============================================================================

/// Retrieve the latest respiratory metrics.
///
/// On a NULL engine or an internal fault, `out_metrics` is zero-filled with
/// stage=UNKNOWN and quality=UNKNOWN.
///
/// # Safety
/// - `engine` must be NULL or a valid engine pointer.
/// - `out_metrics` must be NULL or a valid writable pointer.
#[no_mangle]
pub unsafe extern "C" fn breathsense_query_metrics(
    engine: *const BreathEngine,
    timestamp_ms: u64,
    out_metrics: *mut BreathMetrics,
) {
    if out_metrics.is_null() {
        return;
    }
    if engine.is_null() {
        *out_metrics = BreathMetrics::zeroed();
        return;
    }
    let engine = &*engine;
    let metrics = catch_unwind(AssertUnwindSafe(|| engine.pipeline.metrics(timestamp_ms)));
    *out_metrics = match metrics {
        Ok(metrics) => BreathMetrics::from(metrics),
        Err(_) => BreathMetrics::zeroed(),
    };
}

/// σ_ω from the instability calibration window (diagnostics).
///
/// Returns 0.0 for a NULL engine.
///
/// # Safety
/// `engine` must be NULL or a valid engine pointer.
#[no_mangle]
pub unsafe extern "C" fn breathsense_baseline_sigma(engine: *const BreathEngine) -> f32 {
    if engine.is_null() {
        return 0.0;
    }
    let engine = &*engine;
    catch_unwind(AssertUnwindSafe(|| engine.pipeline.baseline_sigma())).unwrap_or(0.0)
}

// ============================================================================
// SESSION EXPORT (SLOW PATH - DEBUG/DASHBOARD)
// ============================================================================

/// Export the current session as JSON.
///
/// This is the slow path: it allocates and serializes. Call it at session
/// boundaries, not inside the sensor loop.
///
/// # Safety
/// `engine` must be NULL or a valid engine pointer.
///
/// # Returns
/// - JSON string (MUST be freed with `breathsense_free_string()`).
/// - NULL on error.
#[no_mangle]
pub unsafe extern "C" fn breathsense_export_session_json(
    engine: *const BreathEngine,
    timestamp_ms: u64,
) -> *mut c_char {
    if engine.is_null() {
        return ptr::null_mut();
    }
    let engine = &*engine;
    let json = catch_unwind(AssertUnwindSafe(|| {
        SessionExport::capture(&engine.pipeline, timestamp_ms).to_json()
    }));
    match json {
        Ok(Ok(json)) => match CString::new(json) {
            Ok(cstring) => cstring.into_raw(),
            Err(_) => ptr::null_mut(),
        },
        _ => ptr::null_mut(),
    }
}

/// Free a string returned by `breathsense_export_session_json()`.
///
/// # Safety
/// - `ptr` must be NULL or a string returned by an export function.
/// - Must not be called more than once for the same pointer.
#[no_mangle]
pub unsafe extern "C" fn breathsense_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// VERSION INFO
// ============================================================================

/// Get the library version string.
///
/// # Returns
/// - Static string, do NOT free.
#[no_mangle]
pub extern "C" fn breathsense_version() -> *const c_char {
    static VERSION: &[u8] = b"1.0.0\0";
    VERSION.as_ptr() as *const c_char
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_engine_lifecycle() {
        unsafe {
            let engine = breathsense_engine_create();
            assert!(!engine.is_null());

            breathsense_start_session(engine, 1_000);
            breathsense_start_session(engine, 2_000); // repeat is safe

            breathsense_engine_destroy(engine);
            breathsense_engine_destroy(ptr::null_mut()); // NULL is safe
        }
    }

    #[test]
    fn test_sample_processing_populates_output() {
        unsafe {
            let engine = breathsense_engine_create();
            breathsense_start_session(engine, 0);

            for i in 0..500u64 {
                let ts = i * 20;
                breathsense_feed_gyro(engine, 0.01, 0.01, 0.01, ts);
                breathsense_feed_accel(engine, 0.0, 0.0, 9.81, ts);
            }

            let mut out = BreathMetrics::zeroed();
            breathsense_query_metrics(engine, 10_000, &mut out);
            assert_eq!(out.breath_cycles_detected, 0);
            assert_eq!(out.current_stage, 4);
            assert_eq!(out.possible_apnea, 0);
            assert!(out.instability_score >= 0.0);

            breathsense_engine_destroy(engine);
        }
    }

    #[test]
    fn test_null_safety() {
        unsafe {
            breathsense_start_session(ptr::null_mut(), 0);
            breathsense_feed_gyro(ptr::null_mut(), 0.0, 0.0, 0.0, 0);
            breathsense_feed_accel(ptr::null_mut(), 0.0, 0.0, 0.0, 0);
            assert_eq!(breathsense_baseline_sigma(ptr::null()), 0.0);
            assert!(breathsense_export_session_json(ptr::null(), 0).is_null());
            breathsense_free_string(ptr::null_mut());

            let mut out = BreathMetrics {
                current_stage: 0,
                confidence: 0.5,
                breathing_rate_bpm: 12.0,
                breathing_regularity: 0.5,
                movement_intensity: 0.5,
                breath_cycles_detected: 7,
                possible_apnea: 1,
                signal_quality: 0,
                signal_noise_ratio: 3.0,
                instability_score: 0.2,
                instability_detected: 1,
            };
            breathsense_query_metrics(ptr::null(), 0, &mut out);
            assert_eq!(out.current_stage, 4);
            assert_eq!(out.signal_quality, 4);
            assert_eq!(out.breathing_rate_bpm, 0.0);
            assert_eq!(out.possible_apnea, 0);
            assert_eq!(out.instability_detected, 0);

            // NULL output pointer is a no-op
            breathsense_query_metrics(ptr::null(), 0, ptr::null_mut());
        }
    }

    #[test]
    fn test_non_finite_input_dropped() {
        unsafe {
            let engine = breathsense_engine_create();
            breathsense_start_session(engine, 0);

            for i in 0..100u64 {
                breathsense_feed_accel(engine, 0.0, 0.0, 9.81, i * 20);
            }
            let mut before = BreathMetrics::zeroed();
            breathsense_query_metrics(engine, 2_000, &mut before);

            breathsense_feed_accel(engine, f32::NAN, 0.0, 0.0, 2_000);
            breathsense_feed_accel(engine, f32::INFINITY, 0.0, 0.0, 2_020);

            let mut after = BreathMetrics::zeroed();
            breathsense_query_metrics(engine, 2_000, &mut after);
            assert_eq!(before.instability_score, after.instability_score);
            assert_eq!(before.breath_cycles_detected, after.breath_cycles_detected);
            assert_eq!(before.movement_intensity, after.movement_intensity);

            breathsense_engine_destroy(engine);
        }
    }

    #[test]
    fn test_version_string() {
        let version = breathsense_version();
        assert!(!version.is_null());
        unsafe {
            let version = CStr::from_ptr(version).to_str().unwrap();
            assert_eq!(version, "1.0.0");
        }
    }

    #[test]
    fn test_export_json_round_trip() {
        unsafe {
            let engine = breathsense_engine_create();
            breathsense_start_session(engine, 0);
            for i in 0..250u64 {
                breathsense_feed_accel(engine, 0.0, 0.0, 9.81, i * 20);
            }

            let json_ptr = breathsense_export_session_json(engine, 5_000);
            assert!(!json_ptr.is_null());

            let json = CStr::from_ptr(json_ptr).to_str().unwrap().to_string();
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["captured_at_ms"], 5_000);

            breathsense_free_string(json_ptr);
            breathsense_engine_destroy(engine);
        }
    }
}
