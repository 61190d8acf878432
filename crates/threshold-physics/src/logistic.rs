// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Logistic Core
// ─────────────────────────────────────────────────────────────────────
//! σ(R) = 1 / (1 + exp(-β(R - Θ))) and its clipped inverse.

/// Probabilities are clipped to `[LOGIT_EPS, 1 - LOGIT_EPS]` before the logit.
pub const LOGIT_EPS: f64 = 1e-6;

/// Logistic response of the order parameter.
#[inline]
pub fn logistic_response(r: f64, theta: f64, beta: f64) -> f64 {
    1.0 / (1.0 + (-beta * (r - theta)).exp())
}

pub fn logistic_response_all(r: &[f64], theta: f64, beta: f64) -> Vec<f64> {
    r.iter().map(|&x| logistic_response(x, theta, beta)).collect()
}

/// Log-odds with boundary observations pulled inside (0, 1).
#[inline]
pub fn logit(p: f64) -> f64 {
    let p = p.clamp(LOGIT_EPS, 1.0 - LOGIT_EPS);
    (p / (1.0 - p)).ln()
}

pub fn logit_all(p: &[f64]) -> Vec<f64> {
    p.iter().map(|&x| logit(x)).collect()
}

/// Blend from `zeta_closed` (gate shut) to `zeta_open` (gate open).
#[inline]
pub fn logistic_impedance_gate(
    r: f64,
    theta: f64,
    beta: f64,
    zeta_closed: f64,
    zeta_open: f64,
) -> f64 {
    let gate = logistic_response(r, theta, beta);
    zeta_closed + (zeta_open - zeta_closed) * gate
}
