/// Basic usage example: feed a synthetic breathing session and read metrics.
use breathsense::{RespiratoryPipeline, SessionExport};

fn main() {
    println!("=== BreathSense Engine: Basic Usage Example ===\n");

    let mut pipeline = RespiratoryPipeline::new();
    pipeline.start_session(0);

    // Phase 1: settling at rest - 10 seconds
    for i in 0..500u64 {
        let ts = i * 20;
        let _ = pipeline.feed_gyro(0.0, 0.0, 0.0, ts);
        let _ = pipeline.feed_accel(0.0, 0.0, 9.81, ts);
    }

    // Phase 2: steady 15 BPM breathing - 50 seconds
    for i in 500..3_000u64 {
        let ts = i * 20;
        let t = i as f32 / 50.0;
        let z = 9.81 + 0.1 * (2.0 * std::f32::consts::PI * 0.25 * t).sin();
        let _ = pipeline.feed_gyro(0.01, 0.01, 0.01, ts);
        let _ = pipeline.feed_accel(0.0, 0.0, z, ts);
    }

    let metrics = pipeline.metrics(60_000);
    println!("Breathing rate:  {:.1} BPM", metrics.breathing_rate_bpm);
    println!("Cycles detected: {}", metrics.breath_cycles_detected);
    println!("Regularity:      {:.2}", metrics.breathing_regularity);
    println!("Quality:         {:?}", metrics.signal_quality);
    println!("Stage:           {:?}", metrics.current_stage);
    println!(
        "Instability:     {:.4} rad/s (detected: {})",
        metrics.instability_score, metrics.instability_detected
    );

    // Session snapshot as JSON (debug/dashboard path)
    let export = SessionExport::capture(&pipeline, 60_000);
    match export.to_json() {
        Ok(json) => println!("\nSession export: {} bytes of JSON", json.len()),
        Err(err) => eprintln!("export failed: {}", err),
    }
}
