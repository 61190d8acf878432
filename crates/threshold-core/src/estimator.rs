// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Logit-Linear Parameter Estimator
// ─────────────────────────────────────────────────────────────────────
//! Closed-form recovery of Θ and β from (R, σ) pairs.
//!
//! `logit(σ) = β·R + b` is solved by OLS, `Θ = -b/β`. Confidence
//! intervals use the Gaussian multiplier 1.96 (no small-n correction),
//! with Var(Θ) from the delta method:
//!
//! ```text
//! Var(Θ) = (b/β²)²·Var(β) + (1/β)²·Var(b) - 2·(b/β³)·Cov(β, b)
//! ```
//!
//! R² and AIC (k = 2) are computed in probability space on the
//! back-transformed curve, not on the linear predictor.

use threshold_physics::{logistic_response_all, logit_all};
use threshold_types::{ensure_same_length, FitResult, ThresholdError, ThresholdResult};

use crate::metrics::{ols, residual_metrics};

/// Gaussian 95% multiplier.
pub const CI_MULTIPLIER: f64 = 1.96;

/// Below this |β| the fit is degenerate and Θ is NaN.
pub const MIN_SLOPE: f64 = 1e-9;

/// Fit σ = 1/(1+exp(-β(R-Θ))) by logit-linear regression.
///
/// Empty or mismatched inputs are errors, and so are non-finite samples
/// (singular design). A constant R is not: it yields `β = 0`, `Θ = NaN`.
pub fn fit_threshold_parameters(r: &[f64], sigma: &[f64]) -> ThresholdResult<FitResult> {
    ensure_same_length(r.len(), sigma.len())?;
    if r.is_empty() {
        return Err(ThresholdError::EmptyInput(
            "at least one sample is required to fit threshold parameters".to_string(),
        ));
    }
    let n = r.len();
    let y = logit_all(sigma);
    let line = ols(r, &y)?;
    let beta = line.slope;
    let intercept = line.intercept;
    let theta = if beta.abs() < MIN_SLOPE {
        f64::NAN
    } else {
        -intercept / beta
    };

    let ss_logit: f64 = r
        .iter()
        .zip(&y)
        .map(|(&ri, &yi)| (yi - line.predict(ri)).powi(2))
        .sum();
    let sigma2 = ss_logit / n.saturating_sub(2).max(1) as f64;

    let (var_beta, var_intercept, cov) = if line.sxx > 0.0 {
        (
            sigma2 / line.sxx,
            sigma2 * (1.0 / n as f64 + line.mean_x.powi(2) / line.sxx),
            -line.mean_x * sigma2 / line.sxx,
        )
    } else {
        (f64::INFINITY, f64::INFINITY, 0.0)
    };
    let beta_std = var_beta.max(0.0).sqrt();

    let theta_std = if beta.abs() < MIN_SLOPE || var_intercept.is_infinite() {
        f64::NAN
    } else {
        let d_beta = intercept / (beta * beta);
        let d_intercept = -1.0 / beta;
        let var_theta = d_beta.powi(2) * var_beta
            + d_intercept.powi(2) * var_intercept
            + 2.0 * d_beta * d_intercept * cov;
        var_theta.max(0.0).sqrt()
    };

    let beta_ci = [beta - CI_MULTIPLIER * beta_std, beta + CI_MULTIPLIER * beta_std];
    let theta_ci = if theta.is_nan() {
        [f64::NAN, f64::NAN]
    } else {
        [theta - CI_MULTIPLIER * theta_std, theta + CI_MULTIPLIER * theta_std]
    };

    let fitted = logistic_response_all(r, theta, beta);
    let metrics = residual_metrics(sigma, &fitted, 2)?;

    if theta.is_nan() {
        log::warn!("fit_threshold_parameters: degenerate slope (β={beta:.3e}), Θ undefined");
    }
    if metrics.aic == f64::NEG_INFINITY {
        log::warn!("fit_threshold_parameters: zero residuals, AIC = -inf");
    }
    log::debug!(
        "fit_threshold_parameters: n={n} β={beta:.4} Θ={theta:.4} R²={:.6}",
        metrics.r2
    );

    Ok(FitResult {
        beta,
        theta,
        beta_ci,
        theta_ci,
        r2: metrics.r2,
        aic: metrics.aic,
        ss_res: metrics.ss_res,
    })
}
