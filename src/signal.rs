//! Signal conditioning: gravity separation and breathing-band isolation.
//!
//! This module provides the low-level per-sample processing in front of the
//! phase and peak analysis:
//! - Gravity baseline estimation via incremental exponential smoothing
//! - A fixed-coefficient 2nd-order Butterworth bandpass for the breathing band
//!
//! Design note: All filters use incremental updates (O(1) per sample).
//! No batch processing, no allocations in hot paths.
//!
//! Why this matters:
//! Chest orientation drifts slowly as the wearer shifts position. Separating
//! the gravity baseline removes that drift without distorting breathing
//! frequencies, and the bandpass strips both residual drift and motion
//! artefacts outside 0.1–0.5 Hz (6–30 breaths per minute).

/// Parameters for signal conditioning.
///
/// These values are tuned for a chest-mounted device sampling near 50 Hz and
/// balance responsiveness with stability. Conservative by design.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Exponential smoothing factor for the gravity baseline.
    /// Range: [0.0, 1.0]. Typical: 0.8 (cut-off well below the breathing band).
    /// Higher = more stable, slower to adapt. Lower = faster, noisier.
    pub gravity_smoothing: f32,

    /// Initial gravity magnitude estimate in m/s².
    /// Normal range: [9.0, 10.0].
    pub gravity_initial: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            gravity_smoothing: 0.8,
            gravity_initial: 9.81,
        }
    }
}

/// Scalar gravity baseline estimator.
///
/// Maintains a slowly-varying estimate of the accelerometer magnitude's
/// gravity component. The residual (magnitude minus baseline) is the raw
/// respiration channel: a cheap single-pole high-pass whose cut-off sits
/// well below the breathing band.
#[derive(Debug, Clone)]
pub struct GravityEstimator {
    estimate: f32,
    smoothing: f32,
    initial: f32,
}

impl GravityEstimator {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            estimate: config.gravity_initial,
            smoothing: config.gravity_smoothing,
            initial: config.gravity_initial,
        }
    }

    /// Fold a new magnitude into the baseline and return the residual.
    ///
    /// g ← s·g + (1−s)·m, residual = m − g.
    pub fn update(&mut self, magnitude: f32) -> f32 {
        self.estimate = self.smoothing * self.estimate + (1.0 - self.smoothing) * magnitude;
        magnitude - self.estimate
    }

    /// Current gravity baseline in m/s².
    pub fn estimate(&self) -> f32 {
        self.estimate
    }

    /// Restore the documented initial baseline.
    pub fn reset(&mut self) {
        self.estimate = self.initial;
    }
}

/// 2nd-order Butterworth bandpass, direct form I.
///
/// Coefficients are pre-baked for a 0.1–0.5 Hz passband at a 50 Hz sample
/// rate. Running the filter at a different rate shifts the passband; callers
/// deviating from 50 Hz must recompute the coefficient set.
#[derive(Debug, Clone)]
pub struct BandpassFilter {
    // Delay registers: x[n-1], x[n-2], y[n-1], y[n-2]
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BandpassFilter {
    const B0: f32 = 0.0201;
    const B1: f32 = 0.0;
    const B2: f32 = -0.0201;
    const A1: f32 = -1.5610;
    const A2: f32 = 0.6414;

    pub fn new() -> Self {
        Self {
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Push one input sample through the filter and return the output.
    pub fn process(&mut self, input: f32) -> f32 {
        let output = Self::B0 * input + Self::B1 * self.x1 + Self::B2 * self.x2
            - Self::A1 * self.y1
            - Self::A2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    /// Zero all delay registers.
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

impl Default for BandpassFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gravity_estimator_starts_at_initial() {
        let estimator = GravityEstimator::new(&FilterConfig::default());
        assert!((estimator.estimate() - 9.81).abs() < 1e-6);
    }

    #[test]
    fn test_gravity_converges_to_constant_input() {
        let mut estimator = GravityEstimator::new(&FilterConfig::default());
        for _ in 0..100 {
            estimator.update(9.5);
        }
        assert!((estimator.estimate() - 9.5).abs() < 0.01);
    }

    #[test]
    fn test_gravity_residual_vanishes_at_rest() {
        let mut estimator = GravityEstimator::new(&FilterConfig::default());
        let mut residual = 0.0;
        for _ in 0..200 {
            residual = estimator.update(9.81);
        }
        assert!(residual.abs() < 1e-4);
    }

    #[test]
    fn test_gravity_reset_restores_initial() {
        let mut estimator = GravityEstimator::new(&FilterConfig::default());
        for _ in 0..50 {
            estimator.update(11.0);
        }
        estimator.reset();
        assert!((estimator.estimate() - 9.81).abs() < 1e-6);
    }

    #[test]
    fn test_bandpass_rejects_dc() {
        let mut filter = BandpassFilter::new();
        let mut output = 1.0;
        for _ in 0..1_000 {
            output = filter.process(1.0);
        }
        // DC lies far below the passband; steady-state output decays to ~zero
        assert!(output.abs() < 1e-3, "DC should be rejected, got {}", output);
    }

    #[test]
    fn test_bandpass_responds_to_breathing_tone() {
        let mut filter = BandpassFilter::new();
        // 0.3 Hz sine at 50 Hz: steady-state output must oscillate, not die out
        let mut peak = 0.0f32;
        for i in 0..2_000 {
            let t = i as f32 / 50.0;
            let output = filter.process((2.0 * std::f32::consts::PI * 0.3 * t).sin());
            if i > 1_000 {
                peak = peak.max(output.abs());
            }
        }
        assert!(peak > 1e-3, "breathing tone should survive, peak {}", peak);
        assert!(peak < 1.0, "gain must stay below unity, peak {}", peak);
    }

    #[test]
    fn test_bandpass_output_stays_bounded() {
        let mut filter = BandpassFilter::new();
        // Unit-amplitude 5 Hz tone: output must remain finite and attenuated
        for i in 0..2_000 {
            let t = i as f32 / 50.0;
            let output = filter.process((2.0 * std::f32::consts::PI * 5.0 * t).sin());
            assert!(output.is_finite());
            assert!(output.abs() < 0.5, "output diverged to {}", output);
        }
    }

    #[test]
    fn test_bandpass_reset_zeroes_state() {
        let mut filter = BandpassFilter::new();
        for i in 0..100 {
            filter.process((i as f32 * 0.1).sin());
        }
        filter.reset();
        // After reset the first output depends only on the new input
        let output = filter.process(1.0);
        assert!((output - 0.0201).abs() < 1e-6);
    }
}
