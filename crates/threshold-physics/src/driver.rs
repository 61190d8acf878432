// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Driver Generation
// ─────────────────────────────────────────────────────────────────────
//! Synthetic driver sequences J(t) for the field integrator: constant
//! currents, evenly spaced sweeps, and a seeded burst-plus-harmonic profile.

use serde::{Deserialize, Serialize};

/// Minimal xorshift64 RNG for reproducible driver noise.
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0xDEAD_BEEF_CAFE_BABE } else { seed },
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Gaussian burst on a small baseline, with a slow harmonic and uniform noise:
///
/// ```text
/// J(t) = base + amp·exp(-(t - c)² / 2w²) + h·sin(2πt / P) + noise·(u - ½)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub base: f64,
    pub burst_amplitude: f64,
    pub burst_center: f64,
    pub burst_width: f64,
    pub harmonic_gain: f64,
    pub harmonic_period: f64,
    pub noise: f64,
    pub seed: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            base: 0.12,
            burst_amplitude: 0.95,
            burst_center: 45.0,
            burst_width: 16.0,
            harmonic_gain: 0.08,
            harmonic_period: 18.0,
            noise: 0.015,
            seed: 11,
        }
    }
}

/// Sample the burst profile at `t = 0, 1, …, steps - 1`.
pub fn build_driver(steps: usize, config: &DriverConfig) -> Vec<f64> {
    let mut rng = SimpleRng::new(config.seed);
    let width = config.burst_width;
    let period = config.harmonic_period.max(1e-6);
    (0..steps)
        .map(|k| {
            let t = k as f64;
            let burst = config.burst_amplitude * (-(t - config.burst_center).powi(2) / (2.0 * width * width)).exp();
            let harmonic = config.harmonic_gain * (std::f64::consts::TAU * t / period).sin();
            let jitter = config.noise * (rng.next_f64() - 0.5);
            config.base + burst + harmonic + jitter
        })
        .collect()
}

pub fn constant_driver(value: f64, steps: usize) -> Vec<f64> {
    vec![value; steps]
}

/// `n` evenly spaced samples over `[start, stop]`, endpoints included.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}
