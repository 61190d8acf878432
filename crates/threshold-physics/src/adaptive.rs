// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Adaptive Threshold Controller
// ─────────────────────────────────────────────────────────────────────
//! Lets Θ and β drift with the membrane.
//!
//! A meta-gate `g = σ(meta_beta(R - Θ))` switches between pulling Θ toward
//! the current order parameter (gate open) and relaxing it back to its
//! baseline (gate closed). β tracks `β₀(1 + gain·g)` and tires in
//! proportion to how fast Θ moved.

use serde::{Deserialize, Serialize};

use crate::logistic::logistic_response;

/// Evolving (Θ, β) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerState {
    pub theta: f64,
    pub beta: f64,
}

/// Diagnostics of one controller update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerReport {
    pub meta_gate: f64,
    pub theta_shift: f64,
    pub beta_shift: f64,
    pub theta: f64,
    pub beta: f64,
}

/// Read-only view of the controller at a sample, without advancing it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    pub theta: f64,
    pub beta: f64,
    pub meta_gate: f64,
    pub driver_gap: f64,
    pub impedance_relief: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveThresholdController {
    pub theta_baseline: f64,
    pub beta_baseline: f64,
    pub meta_beta: f64,
    pub adaptation_rate: f64,
    pub relaxation_rate: f64,
    pub impedance_weight: f64,
    pub driver_weight: f64,
    pub sigma_weight: f64,
    pub beta_gain: f64,
    pub beta_rate: f64,
    pub beta_fatigue: f64,
}

impl AdaptiveThresholdController {
    pub fn new(theta: f64, beta: f64) -> Self {
        Self {
            theta_baseline: theta,
            beta_baseline: beta,
            meta_beta: 3.5,
            adaptation_rate: 0.8,
            relaxation_rate: 0.25,
            impedance_weight: 0.3,
            driver_weight: 0.18,
            sigma_weight: 0.2,
            beta_gain: 0.55,
            beta_rate: 0.65,
            beta_fatigue: 0.35,
        }
    }

    /// State at the remembered baselines. Serves as `reset`.
    pub fn baseline_state(&self) -> ControllerState {
        ControllerState {
            theta: self.theta_baseline,
            beta: self.beta_baseline,
        }
    }

    #[inline]
    pub fn meta_gate(&self, state: &ControllerState, r: f64) -> f64 {
        logistic_response(r, state.theta, self.meta_beta)
    }

    /// Advance (Θ, β) one Euler step.
    pub fn update(
        &self,
        state: &ControllerState,
        r: f64,
        sigma: f64,
        driver: f64,
        impedance: f64,
        dt: f64,
    ) -> (ControllerState, ControllerReport) {
        let gate = self.meta_gate(state, r);

        let theta_shift = dt
            * (self.adaptation_rate * gate * (r - state.theta)
                + self.relaxation_rate * (1.0 - gate) * (self.theta_baseline - state.theta)
                + self.impedance_weight * gate * (1.0 - impedance)
                + self.driver_weight * gate * (driver - self.theta_baseline)
                + self.sigma_weight * gate * (sigma - state.theta));
        let theta = state.theta + theta_shift;

        let beta_target = self.beta_baseline * (1.0 + self.beta_gain * gate);
        let beta_shift = dt
            * (self.beta_rate * (beta_target - state.beta) - self.beta_fatigue * theta_shift.abs());
        let beta = (state.beta + beta_shift).max(1e-3);

        (
            ControllerState { theta, beta },
            ControllerReport {
                meta_gate: gate,
                theta_shift,
                beta_shift,
                theta,
                beta,
            },
        )
    }

    pub fn snapshot(
        &self,
        state: &ControllerState,
        r: f64,
        driver: f64,
        impedance: f64,
    ) -> ControllerSnapshot {
        ControllerSnapshot {
            theta: state.theta,
            beta: state.beta,
            meta_gate: self.meta_gate(state, r),
            driver_gap: driver - self.theta_baseline,
            impedance_relief: 1.0 - impedance,
        }
    }
}
