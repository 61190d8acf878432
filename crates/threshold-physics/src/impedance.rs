// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Impedance Models
// ─────────────────────────────────────────────────────────────────────
//! Interchangeable ζ(R) strategies behind one object-safe trait.
//!
//! - `UnitImpedance`: ζ ≡ 1.
//! - `StaticBlend`: smooth logistic switch between a resonant and a damped gain.
//! - `RobinBoundary`: gated impedance plus an additive boundary leakage.
//! - `HystereticMotif`: relief / recovery / hysteresis relaxation with memory.
//!
//! Memory is never hidden inside a model: every call takes an
//! [`ImpedanceState`] and returns the next one, so one model instance can
//! serve any number of independent runs.

use serde::{Deserialize, Serialize};

use threshold_types::BoundaryConfig;

use crate::logistic::logistic_response;

/// Impedance memory threaded through successive samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpedanceState {
    /// Latest impedance value.
    pub zeta: f64,
    /// Gate value seen at the previous sample (0 when the model has no gate).
    pub last_gate: f64,
}

impl ImpedanceState {
    pub fn at_rest(zeta: f64) -> Self {
        Self {
            zeta,
            last_gate: 0.0,
        }
    }
}

/// Strategy producing the scalar impedance ζ(R).
pub trait ImpedanceModel: Send + Sync {
    /// Memory at rest, before any sample has been seen.
    fn baseline_state(&self) -> ImpedanceState;

    /// Consume one sample: `(state, R) -> (state', ζ)`.
    fn evaluate(&self, state: ImpedanceState, r: f64, dt: f64) -> (ImpedanceState, f64);

    /// ζ(R) evaluated from the baseline state with a unit step.
    fn impedance(&self, r: f64) -> f64 {
        self.evaluate(self.baseline_state(), r, 1.0).1
    }

    /// Gate occupancy in [0, 1], for models that have one.
    fn gate(&self, _r: f64) -> Option<f64> {
        None
    }

    /// Additive leakage term, for boundary models.
    fn boundary_flux(&self, _r: f64, _sigma: f64, _driver: f64) -> Option<f64> {
        None
    }

    fn name(&self) -> &'static str;
}

// ── Unit ────────────────────────────────────────────────────────────

/// ζ ≡ 1. Used when nothing else is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitImpedance;

impl ImpedanceModel for UnitImpedance {
    fn baseline_state(&self) -> ImpedanceState {
        ImpedanceState::at_rest(1.0)
    }

    fn evaluate(&self, state: ImpedanceState, _r: f64, _dt: f64) -> (ImpedanceState, f64) {
        (ImpedanceState { zeta: 1.0, ..state }, 1.0)
    }

    fn impedance(&self, _r: f64) -> f64 {
        1.0
    }

    fn name(&self) -> &'static str {
        "unit"
    }
}

// ── Static blend ────────────────────────────────────────────────────

/// `ζ(R) = rg + (dg - rg)·σ((R - Θ) / width)`; monotone in R.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaticBlend {
    pub theta: f64,
    pub resonant_gain: f64,
    pub damped_gain: f64,
    pub switch_width: f64,
}

impl StaticBlend {
    /// Defaults: resonant 0.6, damped 1.4, width 0.4.
    pub fn new(theta: f64) -> Self {
        smooth_impedance_profile(theta, 0.6, 1.4, 0.4)
    }

    #[inline]
    fn profile(&self, r: f64) -> f64 {
        let scaled = (r - self.theta) / self.switch_width.max(1e-6);
        self.resonant_gain + (self.damped_gain - self.resonant_gain) * logistic_response(scaled, 0.0, 1.0)
    }
}

/// Build the resonant → damped blend around Θ.
pub fn smooth_impedance_profile(
    theta: f64,
    resonant_gain: f64,
    damped_gain: f64,
    switch_width: f64,
) -> StaticBlend {
    StaticBlend {
        theta,
        resonant_gain,
        damped_gain,
        switch_width,
    }
}

impl ImpedanceModel for StaticBlend {
    fn baseline_state(&self) -> ImpedanceState {
        ImpedanceState::at_rest(self.profile(self.theta))
    }

    fn evaluate(&self, state: ImpedanceState, r: f64, _dt: f64) -> (ImpedanceState, f64) {
        let zeta = self.profile(r);
        (ImpedanceState { zeta, ..state }, zeta)
    }

    fn impedance(&self, r: f64) -> f64 {
        self.profile(r)
    }

    fn name(&self) -> &'static str {
        "static_blend"
    }
}

// ── Robin boundary ──────────────────────────────────────────────────

/// Gate, impedance, and leakage captured at one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundarySnapshot {
    pub gate: f64,
    pub impedance: f64,
    pub boundary_flux: f64,
}

/// Robin-style boundary: a logistic gate that stiffens the membrane and
/// leaks flux toward both the logistic target and the driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobinBoundary {
    pub theta: f64,
    pub beta_robin: f64,
    pub zeta_floor: f64,
    pub zeta_ceiling: f64,
    pub logistic_weight: f64,
    pub driver_weight: f64,
}

impl RobinBoundary {
    pub fn new(theta: f64) -> Self {
        Self::from_config(theta, &BoundaryConfig::default())
    }

    pub fn from_config(theta: f64, config: &BoundaryConfig) -> Self {
        Self {
            theta,
            beta_robin: config.beta_robin,
            zeta_floor: config.zeta_floor,
            zeta_ceiling: config.zeta_ceiling,
            logistic_weight: config.logistic_weight,
            driver_weight: config.driver_weight,
        }
    }

    #[inline]
    pub fn gate_value(&self, r: f64) -> f64 {
        logistic_response(r, self.theta, self.beta_robin)
    }

    #[inline]
    pub fn impedance_value(&self, r: f64) -> f64 {
        self.zeta_floor + (self.zeta_ceiling - self.zeta_floor) * self.gate_value(r)
    }

    /// `gate·(w_logistic(σ - R) + w_driver(driver - R))`.
    #[inline]
    pub fn flux_value(&self, r: f64, sigma: f64, driver: f64) -> f64 {
        let gate = self.gate_value(r);
        gate * (self.logistic_weight * (sigma - r) + self.driver_weight * (driver - r))
    }

    pub fn snapshot(&self, r: f64, sigma: f64, driver: f64) -> BoundarySnapshot {
        BoundarySnapshot {
            gate: self.gate_value(r),
            impedance: self.impedance_value(r),
            boundary_flux: self.flux_value(r, sigma, driver),
        }
    }
}

impl ImpedanceModel for RobinBoundary {
    fn baseline_state(&self) -> ImpedanceState {
        ImpedanceState::at_rest(self.zeta_floor)
    }

    fn evaluate(&self, _state: ImpedanceState, r: f64, _dt: f64) -> (ImpedanceState, f64) {
        let gate = self.gate_value(r);
        let zeta = self.zeta_floor + (self.zeta_ceiling - self.zeta_floor) * gate;
        (
            ImpedanceState {
                zeta,
                last_gate: gate,
            },
            zeta,
        )
    }

    fn impedance(&self, r: f64) -> f64 {
        self.impedance_value(r)
    }

    fn gate(&self, r: f64) -> Option<f64> {
        Some(self.gate_value(r))
    }

    fn boundary_flux(&self, r: f64, sigma: f64, driver: f64) -> Option<f64> {
        Some(self.flux_value(r, sigma, driver))
    }

    fn name(&self) -> &'static str {
        "robin_boundary"
    }
}

// ── Hysteretic motif ────────────────────────────────────────────────

/// Forces acting on the motif during one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MotifForces {
    gate: f64,
    relief: f64,
    recovery: f64,
    hysteresis: f64,
}

/// Impedance that relaxes toward `floor` once the gate opens and recovers
/// toward `baseline` as it closes, with a braid reacting to gate changes.
///
/// Per sample:
///
/// ```text
/// relief     = relief_gain · (ζ - floor) · g
/// recovery   = recovery_rate · (baseline - ζ) · (1 - g)
/// hysteresis = hysteresis · (g - g_prev)
/// ζ'         = clip(ζ - dt·relief + dt·recovery - dt·hysteresis, floor, ceiling)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HystereticMotif {
    pub theta: f64,
    pub beta: f64,
    pub relief_gain: f64,
    pub recovery_rate: f64,
    pub hysteresis: f64,
    pub baseline: f64,
    pub floor: f64,
    pub ceiling: f64,
}

impl HystereticMotif {
    /// Defaults: relief 0.65, recovery 0.18, hysteresis 0.3, baseline 0.84,
    /// floor 0.12, ceiling 1.08.
    pub fn new(theta: f64, beta: f64) -> Self {
        Self::with_params(theta, beta, 0.65, 0.18, 0.3, 0.84, 0.12, 1.08)
    }

    /// Full constructor. `baseline` is clipped into `[floor, ceiling]`.
    #[allow(clippy::too_many_arguments)]
    pub fn with_params(
        theta: f64,
        beta: f64,
        relief_gain: f64,
        recovery_rate: f64,
        hysteresis: f64,
        baseline: f64,
        floor: f64,
        ceiling: f64,
    ) -> Self {
        Self {
            theta,
            beta,
            relief_gain,
            recovery_rate,
            hysteresis,
            baseline: baseline.max(floor).min(ceiling),
            floor,
            ceiling,
        }
    }

    /// Same motif with a different resting impedance and relief floor.
    pub fn with_baseline(self, baseline: f64, floor: f64) -> Self {
        Self::with_params(
            self.theta,
            self.beta,
            self.relief_gain,
            self.recovery_rate,
            self.hysteresis,
            baseline,
            floor,
            self.ceiling,
        )
    }

    fn advance(&self, state: ImpedanceState, r: f64, dt: f64) -> (ImpedanceState, MotifForces) {
        let gate = logistic_response(r, self.theta, self.beta);
        let relief = self.relief_gain * (state.zeta - self.floor) * gate;
        let recovery = self.recovery_rate * (self.baseline - state.zeta) * (1.0 - gate);
        let hysteresis = self.hysteresis * (gate - state.last_gate);

        let zeta = (state.zeta - dt * relief + dt * recovery - dt * hysteresis)
            .max(self.floor)
            .min(self.ceiling);
        (
            ImpedanceState {
                zeta,
                last_gate: gate,
            },
            MotifForces {
                gate,
                relief,
                recovery,
                hysteresis,
            },
        )
    }

    /// Restore impedance and gate memory to rest.
    pub fn reset(&self, state: &mut ImpedanceState) {
        *state = self.baseline_state();
    }

    /// Propagate the motif across a control trace, recording every force.
    pub fn trace(
        &self,
        state: ImpedanceState,
        r: &[f64],
        dt: f64,
    ) -> (ImpedanceState, MotifTrace) {
        let mut history = MotifTrace::with_capacity(r.len());
        let mut state = state;
        for &value in r {
            let (next, forces) = self.advance(state, value, dt);
            state = next;
            history.r.push(value);
            history.zeta.push(state.zeta);
            history.gate.push(forces.gate);
            history.relief.push(forces.relief);
            history.recovery.push(forces.recovery);
            history.hysteresis.push(forces.hysteresis);
        }
        (state, history)
    }

    /// Resonance diagnostics over a recorded trace.
    ///
    /// Areas are trapezoidal integrals over R; with fewer than two samples
    /// they fall back to plain sums.
    pub fn summarise(&self, history: &MotifTrace) -> MotifSummary {
        let area = |y: &[f64]| {
            if history.r.len() >= 2 {
                trapezoid(y, &history.r)
            } else {
                y.iter().sum()
            }
        };
        let abs_hysteresis: Vec<f64> = history.hysteresis.iter().map(|h| h.abs()).collect();

        let gate_area = area(&history.gate);
        let impedance_area = area(&history.zeta);
        let relief_area = area(&history.relief);
        let recovery_area = area(&history.recovery);
        let hysteresis_area = area(&abs_hysteresis);
        let hysteresis_bias = area(&history.hysteresis);

        let balance = relief_area - recovery_area;
        let ratio = (recovery_area.abs() > 1e-12).then(|| relief_area / recovery_area);
        let total = relief_area + recovery_area;
        let symmetry = (total.abs() > 1e-12).then(|| balance / total);

        let zeta = &history.zeta;
        MotifSummary {
            theta: self.theta,
            beta: self.beta,
            zeta_mean: mean_or(zeta, self.baseline),
            zeta_min: fold_or(zeta, self.baseline, f64::min),
            zeta_max: fold_or(zeta, self.baseline, f64::max),
            gate_mean: mean_or(&history.gate, 0.0),
            gate_area,
            impedance_area,
            relief_area,
            recovery_area,
            hysteresis_area,
            relief_recovery_balance: balance,
            relief_recovery_ratio: ratio,
            relief_recovery_symmetry: symmetry,
            hysteresis_bias,
            relief_peak: fold_or(&history.relief, 0.0, f64::max),
            recovery_peak: fold_or(&history.recovery, 0.0, f64::max),
            hysteresis_peak: fold_or(&abs_hysteresis, 0.0, f64::max),
            final_impedance: zeta.last().copied().unwrap_or(self.baseline),
            baseline_impedance: self.baseline,
        }
    }
}

impl ImpedanceModel for HystereticMotif {
    fn baseline_state(&self) -> ImpedanceState {
        ImpedanceState::at_rest(self.baseline)
    }

    fn evaluate(&self, state: ImpedanceState, r: f64, dt: f64) -> (ImpedanceState, f64) {
        let (next, _) = self.advance(state, r, dt);
        (next, next.zeta)
    }

    fn gate(&self, r: f64) -> Option<f64> {
        Some(logistic_response(r, self.theta, self.beta))
    }

    fn name(&self) -> &'static str {
        "hysteretic_motif"
    }
}

/// Per-sample record of a motif sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotifTrace {
    #[serde(rename = "R")]
    pub r: Vec<f64>,
    pub zeta: Vec<f64>,
    pub gate: Vec<f64>,
    pub relief: Vec<f64>,
    pub recovery: Vec<f64>,
    pub hysteresis: Vec<f64>,
}

impl MotifTrace {
    fn with_capacity(n: usize) -> Self {
        Self {
            r: Vec::with_capacity(n),
            zeta: Vec::with_capacity(n),
            gate: Vec::with_capacity(n),
            relief: Vec::with_capacity(n),
            recovery: Vec::with_capacity(n),
            hysteresis: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.r.len()
    }

    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotifSummary {
    pub theta: f64,
    pub beta: f64,
    pub zeta_mean: f64,
    pub zeta_min: f64,
    pub zeta_max: f64,
    pub gate_mean: f64,
    pub gate_area: f64,
    pub impedance_area: f64,
    pub relief_area: f64,
    pub recovery_area: f64,
    pub hysteresis_area: f64,
    pub relief_recovery_balance: f64,
    pub relief_recovery_ratio: Option<f64>,
    pub relief_recovery_symmetry: Option<f64>,
    pub hysteresis_bias: f64,
    pub relief_peak: f64,
    pub recovery_peak: f64,
    pub hysteresis_peak: f64,
    pub final_impedance: f64,
    pub baseline_impedance: f64,
}

/// ∫ y dx by the trapezoid rule.
pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    y.windows(2)
        .zip(x.windows(2))
        .map(|(yy, xx)| 0.5 * (xx[1] - xx[0]) * (yy[0] + yy[1]))
        .sum()
}

fn mean_or(values: &[f64], empty: f64) -> f64 {
    if values.is_empty() {
        empty
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn fold_or(values: &[f64], empty: f64, f: fn(f64, f64) -> f64) -> f64 {
    values.iter().copied().reduce(f).unwrap_or(empty)
}
