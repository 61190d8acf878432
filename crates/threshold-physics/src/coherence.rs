// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Mandala Coherence
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use threshold_types::{ensure_same_length, ThresholdError, ThresholdResult};

use crate::logistic::{logistic_impedance_gate, logistic_response};

/// Coherence between two field traces, gated through the logistic membrane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MandalaCoherence {
    /// Sample covariance (n - 1 denominator).
    pub covariance: f64,
    /// Pearson correlation; 0 when either trace has no variance.
    pub normalised: f64,
    /// σ(β(|corr| - Θ)).
    pub gate: f64,
    pub zeta: f64,
}

/// Gate parameters for [`mandala_coherence`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoherenceGate {
    pub theta: f64,
    pub beta: f64,
    pub zeta_closed: f64,
    pub zeta_open: f64,
}

impl Default for CoherenceGate {
    fn default() -> Self {
        Self {
            theta: 0.25,
            beta: 4.2,
            zeta_closed: 1.3,
            zeta_open: 0.6,
        }
    }
}

/// Covariance and correlation of `psi` against `phi`, with gate and impedance.
pub fn mandala_coherence(
    psi: &[f64],
    phi: &[f64],
    gate: &CoherenceGate,
) -> ThresholdResult<MandalaCoherence> {
    ensure_same_length(psi.len(), phi.len())?;
    if psi.is_empty() {
        return Err(ThresholdError::EmptyInput(
            "coherence needs at least one sample".to_string(),
        ));
    }

    let n = psi.len();
    let (covariance, psi_var, phi_var) = if n > 1 {
        let psi_mean = psi.iter().sum::<f64>() / n as f64;
        let phi_mean = phi.iter().sum::<f64>() / n as f64;
        let (mut cov, mut vp, mut vf) = (0.0, 0.0, 0.0);
        for (p, f) in psi.iter().zip(phi) {
            let dp = p - psi_mean;
            let df = f - phi_mean;
            cov += dp * df;
            vp += dp * dp;
            vf += df * df;
        }
        let denom = (n - 1) as f64;
        (cov / denom, vp / denom, vf / denom)
    } else {
        (0.0, 0.0, 0.0)
    };

    let normalised = if psi_var <= 0.0 || phi_var <= 0.0 {
        0.0
    } else {
        covariance / (psi_var * phi_var).sqrt()
    };
    let magnitude = normalised.abs();

    Ok(MandalaCoherence {
        covariance,
        normalised,
        gate: logistic_response(magnitude, gate.theta, gate.beta),
        zeta: logistic_impedance_gate(
            magnitude,
            gate.theta,
            gate.beta,
            gate.zeta_closed,
            gate.zeta_open,
        ),
    })
}
