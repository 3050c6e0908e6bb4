//! Property-based test suite for the engine's quantified invariants:
//! metric range bounds, boundary rejection, determinism, reset idempotence,
//! and monotone window trimming under arbitrary input.

use proptest::prelude::*;

use crate::pipeline::RespiratoryPipeline;
use crate::types::{RespiratoryMetrics, SensorSample};
use crate::window::{BreathHistory, MagnitudeWindow, SampleWindow, SENSOR_WINDOW_MS};

/// A bounded, finite sensor reading.
fn axis() -> impl Strategy<Value = f32> {
    -50.0f32..50.0f32
}

/// A stream of finite samples with non-decreasing timestamps.
fn sample_stream(max_len: usize) -> impl Strategy<Value = Vec<(f32, f32, f32, u64)>> {
    prop::collection::vec((axis(), axis(), axis(), 1u64..120u64), 1..max_len).prop_map(|raw| {
        let mut ts = 0u64;
        raw.into_iter()
            .map(|(x, y, z, dt)| {
                ts += dt;
                (x, y, z, ts)
            })
            .collect()
    })
}

fn feed_stream(pipeline: &mut RespiratoryPipeline, stream: &[(f32, f32, f32, u64)]) {
    for &(x, y, z, ts) in stream {
        pipeline.feed_gyro(x * 0.01, y * 0.01, z * 0.01, ts).unwrap();
        pipeline.feed_accel(x, y, z + 9.81, ts).unwrap();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_metrics_stay_in_range(stream in sample_stream(400)) {
        let mut pipeline = RespiratoryPipeline::new();
        pipeline.start_session(0);
        feed_stream(&mut pipeline, &stream);

        let now = stream.last().map(|s| s.3).unwrap_or(0);
        let metrics = pipeline.metrics(now);

        prop_assert!(metrics.is_finite(), "non-finite metrics: {:?}", metrics);
        prop_assert!((0.0..=1.0).contains(&metrics.confidence));
        prop_assert!((0.0..=1.0).contains(&metrics.breathing_regularity));
        prop_assert!((0.0..=1.0).contains(&metrics.movement_intensity));
        prop_assert!(metrics.breathing_rate_bpm >= 0.0);
        prop_assert!(metrics.signal_noise_ratio >= 0.0);
        prop_assert!(metrics.instability_score >= 0.0);
    }

    #[test]
    fn prop_non_finite_input_changes_nothing(
        stream in sample_stream(200),
        bad_axis in 0usize..3usize,
    ) {
        let mut pipeline = RespiratoryPipeline::new();
        pipeline.start_session(0);
        feed_stream(&mut pipeline, &stream);

        let now = stream.last().map(|s| s.3).unwrap_or(0);
        let before = pipeline.metrics(now);

        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let mut components = [0.0f32, 0.0, 9.81];
            components[bad_axis] = bad;
            let [x, y, z] = components;
            prop_assert!(pipeline.feed_accel(x, y, z, now + 20).is_err());
            prop_assert!(pipeline.feed_gyro(x, y, z, now + 20).is_err());
        }

        prop_assert_eq!(pipeline.metrics(now), before);
    }

    #[test]
    fn prop_identical_streams_are_deterministic(stream in sample_stream(300)) {
        let mut first = RespiratoryPipeline::new();
        let mut second = RespiratoryPipeline::new();
        first.start_session(100);
        second.start_session(100);
        feed_stream(&mut first, &stream);
        feed_stream(&mut second, &stream);

        let now = stream.last().map(|s| s.3).unwrap_or(0) + 1_000;
        prop_assert_eq!(first.metrics(now), second.metrics(now));
        prop_assert_eq!(first.baseline_sigma(), second.baseline_sigma());
    }

    #[test]
    fn prop_reset_restores_zero_snapshot(stream in sample_stream(300)) {
        let mut pipeline = RespiratoryPipeline::new();
        pipeline.start_session(0);
        feed_stream(&mut pipeline, &stream);

        let restart = stream.last().map(|s| s.3).unwrap_or(0) + 5_000;
        pipeline.start_session(restart);
        prop_assert_eq!(pipeline.metrics(restart), RespiratoryMetrics::default());
    }

    #[test]
    fn prop_sample_windows_trim_monotonically(
        stamps in prop::collection::vec(0u64..200_000u64, 1..200),
    ) {
        let mut window = SampleWindow::new(SENSOR_WINDOW_MS);
        let mut magnitudes = MagnitudeWindow::new(SENSOR_WINDOW_MS);

        for &ts in &stamps {
            window.push(SensorSample::new(0.1, 0.2, 9.8, ts));
            magnitudes.push(SensorSample::new(0.1, 0.2, 9.8, ts));

            // Nothing older than (ingest - window) survives an ingest
            if let Some(oldest) = window.oldest() {
                prop_assert!(ts.saturating_sub(oldest.timestamp_ms) <= SENSOR_WINDOW_MS);
            }
            if let Some(oldest) = magnitudes.oldest() {
                prop_assert!(ts.saturating_sub(oldest.timestamp_ms) <= SENSOR_WINDOW_MS);
            }
        }
    }

    #[test]
    fn prop_breath_history_trims_monotonically(
        stamps in prop::collection::vec(0u64..500_000u64, 1..100),
    ) {
        use crate::types::BreathCycle;
        use crate::window::BREATH_WINDOW_MS;

        let mut history = BreathHistory::new();
        for &ts in &stamps {
            history.push(BreathCycle { timestamp_ms: ts, duration_ms: 4_000.0, amplitude: 1.0 });
            for cycle in history.iter() {
                prop_assert!(ts.saturating_sub(cycle.timestamp_ms) <= BREATH_WINDOW_MS);
            }
        }
    }

    #[test]
    fn prop_magnitude_aggregates_match_contents(
        stamps in prop::collection::vec((0u64..100_000u64, 0.1f32..30.0f32), 1..150),
    ) {
        let mut window = MagnitudeWindow::new(SENSOR_WINDOW_MS);
        for &(ts, value) in &stamps {
            window.push(SensorSample::new(value, 0.0, 0.0, ts));
        }
        // Streaming aggregates must never produce a negative or non-finite
        // variance, whatever the eviction pattern was
        let streamed = window.variance();
        prop_assert!(streamed >= 0.0);
        prop_assert!(streamed.is_finite());
    }
}
