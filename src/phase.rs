//! Phase–memory instability analysis.
//!
//! The operator turns the bandpass-filtered respiration channel into a
//! per-sample instability score:
//!
//! 1. Analytic-signal approximation: for a narrow-band signal the Hilbert
//!    component can be taken as a scaled derivative, h[n] = −Δx / (ω₀·Δt),
//!    with ω₀ the angular center frequency of the breathing band.
//! 2. Instantaneous phase θ[n] = atan2(h[n], x[n]).
//! 3. Phase velocity ω[n] = Δθ/Δt after wrapping Δθ into (−π, π].
//! 4. Phase memory ω̄[n]: rolling mean of ω over a fixed window.
//! 5. Instability score ΔΦ[n] = |ω[n] − ω̄[n]|.
//! 6. Decision: unstable when ΔΦ[n] > α·σ_ω, with σ_ω estimated once on the
//!    first calibration window and frozen thereafter.
//!
//! Everything is O(1) per sample with fixed memory. A full FFT-based Hilbert
//! transform must not be substituted here without rescaling the dependent
//! constants; the derivative form is what the thresholds are calibrated
//! against.

use std::f32::consts::PI;

/// Phase-velocity samples in the rolling memory window (~3 s at 50 Hz).
pub const MEMORY_SAMPLES: usize = 150;

/// Phase-velocity samples collected for baseline calibration (~5 s at 50 Hz).
pub const BASELINE_SAMPLES: usize = 250;

/// Angular center frequency of the breathing passband (0.3 Hz), rad/s.
const OMEGA_0: f32 = 2.0 * PI * 0.3;

/// Nominal sample period in seconds. The operator runs on sample count, not
/// wall-clock timestamps; feeding at a different rate rescales ω.
const DT: f32 = 1.0 / 50.0;

/// Floor for the calibrated σ_ω, preventing threshold collapse.
const SIGMA_FLOOR: f32 = 1e-4;

/// Tunable parameters for the instability decision.
#[derive(Debug, Clone)]
pub struct PhaseMemoryConfig {
    /// Sensitivity multiplier α on the calibrated σ_ω.
    /// Range: [2.0, 3.0]. Lower = more sensitive.
    pub alpha: f32,
}

impl Default for PhaseMemoryConfig {
    fn default() -> Self {
        Self { alpha: 2.0 }
    }
}

/// Streaming phase–memory operator.
///
/// Feed one bandpass-filtered sample per step; read the score and decision
/// between steps. Before the calibration window completes, the decision is
/// always "stable" regardless of score magnitude.
#[derive(Debug, Clone)]
pub struct PhaseMemoryOperator {
    config: PhaseMemoryConfig,

    prev_input: f32,
    prev_theta: f32,
    bootstrapped: bool,

    // Rolling phase-velocity memory
    omega_window: [f32; MEMORY_SAMPLES],
    omega_index: usize,
    omega_sum: f32,
    omega_filled: usize,

    // Baseline calibration
    baseline: [f32; BASELINE_SAMPLES],
    baseline_count: usize,
    baseline_ready: bool,
    sigma_omega: f32,

    delta_phi: f32,
}

impl PhaseMemoryOperator {
    pub fn new(config: PhaseMemoryConfig) -> Self {
        let mut operator = Self {
            config,
            prev_input: 0.0,
            prev_theta: 0.0,
            bootstrapped: false,
            omega_window: [0.0; MEMORY_SAMPLES],
            omega_index: 0,
            omega_sum: 0.0,
            omega_filled: 0,
            baseline: [0.0; BASELINE_SAMPLES],
            baseline_count: 0,
            baseline_ready: false,
            sigma_omega: 1.0,
            delta_phi: 0.0,
        };
        operator.reset();
        operator
    }

    /// Return all state to the documented initial values.
    pub fn reset(&mut self) {
        self.prev_input = 0.0;
        self.prev_theta = 0.0;
        self.bootstrapped = false;
        self.omega_window = [0.0; MEMORY_SAMPLES];
        self.omega_index = 0;
        self.omega_sum = 0.0;
        self.omega_filled = 0;
        self.baseline = [0.0; BASELINE_SAMPLES];
        self.baseline_count = 0;
        self.baseline_ready = false;
        self.sigma_omega = 1.0; // placeholder until calibration completes
        self.delta_phi = 0.0;
    }

    /// Feed one bandpass-filtered sample. Returns the updated ΔΦ.
    pub fn update(&mut self, input: f32) -> f32 {
        if !self.bootstrapped {
            // Bootstrap: record the first sample without touching any window.
            self.prev_input = input;
            self.prev_theta = 0.0;
            self.bootstrapped = true;
            return 0.0;
        }

        // Analytic signal via the derivative approximation.
        let dx = input - self.prev_input;
        let hilbert = -dx / (OMEGA_0 * DT);
        self.prev_input = input;

        // Instantaneous phase. atan2(0, 0) is defined as 0.
        let theta = hilbert.atan2(input);

        // Phase velocity with 2π unwrap.
        let d_theta = wrap_phase_delta(theta - self.prev_theta);
        let omega = d_theta / DT;
        self.prev_theta = theta;

        // Rolling memory: outgoing slot leaves, new sample enters.
        let outgoing = self.omega_window[self.omega_index];
        self.omega_window[self.omega_index] = omega;
        self.omega_sum += omega - outgoing;
        self.omega_index = (self.omega_index + 1) % MEMORY_SAMPLES;
        if self.omega_filled < MEMORY_SAMPLES {
            self.omega_filled += 1;
        }

        let omega_mean = if self.omega_filled > 0 {
            self.omega_sum / self.omega_filled as f32
        } else {
            omega
        };

        self.delta_phi = (omega - omega_mean).abs();

        if !self.baseline_ready {
            self.baseline[self.baseline_count] = omega;
            self.baseline_count += 1;
            if self.baseline_count >= BASELINE_SAMPLES {
                self.calibrate();
            }
        }

        self.delta_phi
    }

    /// Estimate σ_ω over the calibration window and freeze it.
    fn calibrate(&mut self) {
        let n = BASELINE_SAMPLES as f32;
        let mean: f32 = self.baseline.iter().sum::<f32>() / n;
        let variance: f32 = self
            .baseline
            .iter()
            .map(|omega| {
                let diff = omega - mean;
                diff * diff
            })
            .sum::<f32>()
            / n;
        self.sigma_omega = variance.sqrt().max(SIGMA_FLOOR);
        self.baseline_ready = true;
    }

    /// Most recent instability score ΔΦ in rad/s.
    pub fn instability_score(&self) -> f32 {
        self.delta_phi
    }

    /// True when ΔΦ exceeds α·σ_ω. Always false before calibration.
    pub fn instability_detected(&self) -> bool {
        self.baseline_ready && self.delta_phi > self.config.alpha * self.sigma_omega
    }

    /// σ_ω from the calibration window (placeholder 1.0 until ready).
    pub fn baseline_sigma(&self) -> f32 {
        self.sigma_omega
    }

    /// True once the calibration window has been consumed.
    pub fn baseline_ready(&self) -> bool {
        self.baseline_ready
    }
}

impl Default for PhaseMemoryOperator {
    fn default() -> Self {
        Self::new(PhaseMemoryConfig::default())
    }
}

/// Wrap a phase difference into (−π, π].
fn wrap_phase_delta(mut delta: f32) -> f32 {
    while delta > PI {
        delta -= 2.0 * PI;
    }
    while delta < -PI {
        delta += 2.0 * PI;
    }
    delta
}

/// Optional downstream persistence gate.
///
/// Requires L consecutive raw detections before reporting instability,
/// suppressing single-sample spikes. Not part of the C ABI output; callers
/// on the Rust API can layer it over the raw decision.
#[derive(Debug, Clone)]
pub struct PersistenceGate {
    required: u32,
    consecutive: u32,
}

impl PersistenceGate {
    pub fn new(required: u32) -> Self {
        Self {
            required: required.max(1),
            consecutive: 0,
        }
    }

    /// Feed one raw decision; returns the gated decision.
    pub fn update(&mut self, raw_detection: bool) -> bool {
        if raw_detection {
            self.consecutive = self.consecutive.saturating_add(1);
        } else {
            self.consecutive = 0;
        }
        self.consecutive >= self.required
    }

    pub fn reset(&mut self) {
        self.consecutive = 0;
    }
}
