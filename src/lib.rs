//! BreathSense Respiratory Engine Library
//!
//! A streaming signal-processing engine that converts chest-mounted IMU
//! samples (3-axis accelerometer and gyroscope at ~50 Hz) into real-time
//! respiratory metrics: an instability score with a calibrated decision,
//! respiratory rate, signal quality, sleep-stage heuristics, and an apnea
//! flag.
//!
//! # Design Philosophy
//!
//! This library is built on several core principles:
//!
//! - **Deterministic streaming**: the metric stream is a pure function of the
//!   ordered input stream; identical sessions produce identical output.
//! - **Fixed memory, bounded time**: O(1) per sample, no allocation on the
//!   hot path after session start, no I/O, no timers, no background threads.
//! - **Fail-quiet boundary**: invalid input is dropped, internal faults
//!   degrade to a zero-filled snapshot; nothing unwinds across the C ABI.
//! - **Evidence first**: metrics report what the motion evidence supports;
//!   this is wellness instrumentation, not medical diagnosis.
//!
//! # Core Modules
//!
//! - `signal`: gravity separation and breathing-band isolation
//! - `phase`: the phase–memory operator producing the instability score
//! - `peaks`: adaptive-threshold breath cycle detection
//! - `metrics`: derived rate/regularity/quality/stage heuristics
//! - `pipeline`: the session controller composing all of the above
//! - `ffi`: C ABI for mobile platform bridges
//!
//! # Example
//!
//! ```
//! use breathsense::pipeline::RespiratoryPipeline;
//!
//! let mut pipeline = RespiratoryPipeline::new();
//! pipeline.start_session(0);
//!
//! // In the sensor callback loop (50 Hz):
//! pipeline.feed_gyro(0.01, 0.01, 0.01, 20).unwrap();
//! pipeline.feed_accel(0.0, 0.0, 9.81, 20).unwrap();
//!
//! let metrics = pipeline.metrics(20);
//! assert_eq!(metrics.breathing_rate_bpm, 0.0); // not enough history yet
//! ```

pub mod types;
pub mod window;
pub mod signal;
pub mod phase;
pub mod peaks;
pub mod metrics;
pub mod pipeline;
pub mod export;

// C FFI bindings for mobile platforms
pub mod ffi;



#[cfg(test)]
mod tests_proptest;

/// Library version string, also exposed through the C ABI.
pub const VERSION: &str = "1.0.0";

// Re-export commonly used types
pub use types::{
    BreathCycle, RespiratoryMetrics, SampleError, SensorSample, SignalQuality, SleepStage,
};

pub use signal::{BandpassFilter, FilterConfig, GravityEstimator};

pub use phase::{PersistenceGate, PhaseMemoryConfig, PhaseMemoryOperator};

pub use peaks::{BreathPeakConfig, BreathPeakDetector};

pub use pipeline::{MotionCoupling, PipelineConfig, RespiratoryPipeline};

pub use export::SessionExport;

// FFI surface for platform bridges
pub use ffi::{
    breathsense_engine_create, breathsense_engine_destroy, breathsense_export_session_json,
    breathsense_feed_accel, breathsense_feed_gyro, breathsense_free_string,
    breathsense_query_metrics, breathsense_start_session, breathsense_version, BreathEngine,
    BreathMetrics,
};
