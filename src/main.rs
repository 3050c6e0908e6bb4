//! BreathSense Respiratory Engine
//!
//! Demonstration entry point: runs a short synthetic breathing session
//! through the pipeline and prints the resulting metrics. For library use,
//! see lib.rs.

use breathsense::pipeline::RespiratoryPipeline;

fn main() {
    println!("BreathSense Respiratory Engine v{}", breathsense::VERSION);
    println!("Simulating 60 s of 15 BPM breathing at 50 Hz...\n");

    let mut pipeline = RespiratoryPipeline::new();
    pipeline.start_session(0);

    // 15 BPM chest oscillation with a quiet gyroscope
    for i in 0..3_000u64 {
        let t = i as f32 / 50.0;
        let ts = i * 20;
        let z = 9.81 + 0.1 * (2.0 * std::f32::consts::PI * 0.25 * t).sin();
        let _ = pipeline.feed_gyro(0.01, 0.01, 0.01, ts);
        let _ = pipeline.feed_accel(0.0, 0.0, z, ts);
    }

    let metrics = pipeline.metrics(60_000);
    println!("breathing rate:   {:.1} BPM", metrics.breathing_rate_bpm);
    println!("breath cycles:    {}", metrics.breath_cycles_detected);
    println!("regularity:       {:.2}", metrics.breathing_regularity);
    println!("confidence:       {:.2}", metrics.confidence);
    println!("signal quality:   {:?}", metrics.signal_quality);
    println!("sleep stage:      {:?}", metrics.current_stage);
    println!("instability:      {:.4} rad/s (detected: {})",
        metrics.instability_score, metrics.instability_detected);
    println!("possible apnea:   {}", metrics.possible_apnea);
}
