// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Regression Metrics
// ─────────────────────────────────────────────────────────────────────
//! Shared least-squares pieces: simple OLS, residual sums, R², and the
//! fixed-k Gaussian AIC.

use threshold_types::{ensure_same_length, ThresholdError, ThresholdResult};

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Ordinary least squares of `y` on `x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OlsLine {
    /// 0 when `x` is constant.
    pub slope: f64,
    pub intercept: f64,
    /// Σ(x - x̄)².
    pub sxx: f64,
    pub mean_x: f64,
    pub mean_y: f64,
}

impl OlsLine {
    #[inline]
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Closed-form simple regression. A constant `x` yields slope 0.
///
/// Non-finite samples make the normal equations unsolvable and are
/// rejected as a singular design.
pub fn ols(x: &[f64], y: &[f64]) -> ThresholdResult<OlsLine> {
    let mean_x = mean(x);
    let mean_y = mean(y);
    let (sxx, sxy) = x.iter().zip(y).fold((0.0, 0.0), |(sxx, sxy), (&xi, &yi)| {
        let dx = xi - mean_x;
        (sxx + dx * dx, sxy + dx * (yi - mean_y))
    });
    if !(sxx.is_finite() && sxy.is_finite()) {
        return Err(ThresholdError::SingularDesign(format!(
            "non-finite least-squares sums (Sxx={sxx}, Sxy={sxy})"
        )));
    }
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    Ok(OlsLine {
        slope,
        intercept: mean_y - slope * mean_x,
        sxx,
        mean_x,
        mean_y,
    })
}

/// Goodness of fit in the observation space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualMetrics {
    pub ss_res: f64,
    /// `1 - ss_res/ss_tot`, or exactly 1 when the observations are constant.
    pub r2: f64,
    /// `n·ln(ss_res/n) + 2k`, or `-∞` when `ss_res <= 0`.
    pub aic: f64,
}

/// Gaussian AIC with `k` free parameters.
pub fn aic(n: usize, ss_res: f64, k: usize) -> f64 {
    if ss_res <= 0.0 {
        return f64::NEG_INFINITY;
    }
    let n = n as f64;
    n * (ss_res / n).ln() + 2.0 * k as f64
}

pub fn residual_metrics(
    observed: &[f64],
    predicted: &[f64],
    k: usize,
) -> ThresholdResult<ResidualMetrics> {
    ensure_same_length(observed.len(), predicted.len())?;
    if observed.is_empty() {
        return Err(ThresholdError::EmptyInput(
            "residual metrics need at least one sample".to_string(),
        ));
    }
    let ss_res: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p).powi(2))
        .sum();
    let mean_obs = mean(observed);
    let ss_tot: f64 = observed.iter().map(|o| (o - mean_obs).powi(2)).sum();
    let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 1.0 };
    Ok(ResidualMetrics {
        ss_res,
        r2,
        aic: aic(observed.len(), ss_res, k),
    })
}

/// Population standard deviation, `sqrt(Σ(x - x̄)² / n)`; 0 for an empty slice.
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}
