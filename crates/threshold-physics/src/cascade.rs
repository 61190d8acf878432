// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Potential Cascade
// ─────────────────────────────────────────────────────────────────────
//! Recursive threshold: potential condenses into condition.
//!
//! ```text
//! g  = σ(β_cascade(p - Θ))
//! ΔΘ = dt·(gain·g·(p - Θ) - relax·(Θ - condition))
//! β* = β₀·(1 + coherence·gain·g)
//! Δβ = dt·fatigue·(β* - β),   β ← max(1e-3, β + Δβ)
//! ```
//!
//! The cascade itself is immutable; callers thread [`CascadeState`].

use serde::{Deserialize, Serialize};

use threshold_types::{ensure_same_length, ThresholdResult};

use crate::logistic::{logistic_impedance_gate, logistic_response};

/// Evolving cascade memory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CascadeState {
    pub theta: f64,
    pub beta: f64,
    /// Number of beats taken so far.
    pub step: usize,
}

/// Record of one cascade step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CascadeBeat {
    pub step: usize,
    pub potential: f64,
    pub coherence: f64,
    pub theta: f64,
    pub beta: f64,
    pub gate: f64,
    pub zeta: f64,
    pub theta_shift: f64,
    pub beta_shift: f64,
}

/// Column view over a run of beats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CascadeSummary {
    pub theta: Vec<f64>,
    pub beta: Vec<f64>,
    pub gate: Vec<f64>,
    pub zeta: Vec<f64>,
    pub theta_shift: Vec<f64>,
    pub beta_shift: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PotentialCascade {
    pub baseline_theta: f64,
    pub baseline_beta: f64,
    pub cascade_gain: f64,
    pub condition_relaxation: f64,
    pub fatigue_rate: f64,
    pub logistic_beta: f64,
    pub zeta_closed: f64,
    pub zeta_open: f64,
}

impl PotentialCascade {
    pub fn new(theta: f64, beta: f64) -> Self {
        Self {
            baseline_theta: theta,
            baseline_beta: beta,
            cascade_gain: 0.6,
            condition_relaxation: 0.2,
            fatigue_rate: 0.4,
            logistic_beta: 4.2,
            zeta_closed: 1.3,
            zeta_open: 0.6,
        }
    }

    /// Fresh memory at the baselines.
    pub fn baseline_state(&self) -> CascadeState {
        CascadeState {
            theta: self.baseline_theta,
            beta: self.baseline_beta,
            step: 0,
        }
    }

    /// One beat. `condition` defaults to the baseline Θ.
    pub fn step(
        &self,
        state: &CascadeState,
        potential: f64,
        coherence: f64,
        condition: Option<f64>,
        dt: f64,
    ) -> (CascadeState, CascadeBeat) {
        let gate = logistic_response(potential, state.theta, self.logistic_beta);
        let zeta = logistic_impedance_gate(
            potential,
            state.theta,
            self.logistic_beta,
            self.zeta_closed,
            self.zeta_open,
        );
        let target = condition.unwrap_or(self.baseline_theta);

        let theta_shift = dt
            * (self.cascade_gain * gate * (potential - state.theta)
                - self.condition_relaxation * (state.theta - target));
        let theta = state.theta + theta_shift;

        let beta_target = self.baseline_beta * (1.0 + coherence * self.cascade_gain * gate);
        let beta_shift = dt * self.fatigue_rate * (beta_target - state.beta);
        let beta = (state.beta + beta_shift).max(1e-3);

        let beat = CascadeBeat {
            step: state.step,
            potential,
            coherence,
            theta,
            beta,
            gate,
            zeta,
            theta_shift,
            beta_shift,
        };
        (
            CascadeState {
                theta,
                beta,
                step: state.step + 1,
            },
            beat,
        )
    }

    /// Step through paired potentials and coherences.
    pub fn run(
        &self,
        state: &CascadeState,
        potentials: &[f64],
        coherences: &[f64],
        conditions: Option<&[f64]>,
        dt: f64,
    ) -> ThresholdResult<(CascadeState, Vec<CascadeBeat>)> {
        ensure_same_length(potentials.len(), coherences.len())?;
        if let Some(conditions) = conditions {
            ensure_same_length(potentials.len(), conditions.len())?;
        }

        let mut state = *state;
        let mut beats = Vec::with_capacity(potentials.len());
        for (idx, (&p, &c)) in potentials.iter().zip(coherences).enumerate() {
            let condition = conditions.map(|cs| cs[idx]);
            let (next, beat) = self.step(&state, p, c, condition, dt);
            state = next;
            beats.push(beat);
        }
        Ok((state, beats))
    }

    pub fn summary(beats: &[CascadeBeat]) -> CascadeSummary {
        CascadeSummary {
            theta: beats.iter().map(|b| b.theta).collect(),
            beta: beats.iter().map(|b| b.beta).collect(),
            gate: beats.iter().map(|b| b.gate).collect(),
            zeta: beats.iter().map(|b| b.zeta).collect(),
            theta_shift: beats.iter().map(|b| b.theta_shift).collect(),
            beta_shift: beats.iter().map(|b| b.beta_shift).collect(),
        }
    }
}
