// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Fit Result Types
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::config::NullKind;

/// Logistic fit of σ against R.
///
/// `theta` is NaN whenever `|beta| < 1e-9`; `aic` is `-∞` whenever
/// `ss_res <= 0`. Both are sentinels, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub beta: f64,
    pub theta: f64,
    /// 95% interval `[lo, hi]` for β.
    pub beta_ci: [f64; 2],
    /// 95% interval `[lo, hi]` for Θ (NaN bounds for a degenerate fit).
    pub theta_ci: [f64; 2],
    pub r2: f64,
    pub aic: f64,
    pub ss_res: f64,
}

impl FitResult {
    /// True when the slope vanished and Θ is undefined.
    pub fn is_degenerate(&self) -> bool {
        self.theta.is_nan()
    }

    /// True when the residuals vanished and AIC collapsed to `-∞`.
    pub fn is_perfect(&self) -> bool {
        self.aic == f64::NEG_INFINITY
    }
}

/// Model-specific parameters of a null fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NullParams {
    Linear {
        slope: f64,
        intercept: f64,
    },
    PowerLaw {
        amplitude: f64,
        exponent: f64,
        /// Number of R > 0 samples the fit was restricted to.
        n_used: usize,
    },
}

/// Diagnostics of a null-model alternative, same metrics as [`FitResult`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NullModelResult {
    pub model: NullKind,
    pub r2: f64,
    pub aic: f64,
    pub ss_res: f64,
    #[serde(flatten)]
    pub params: NullParams,
}
