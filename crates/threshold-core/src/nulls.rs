// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Null Model Bank
// ─────────────────────────────────────────────────────────────────────
//! Non-threshold alternatives the logistic fit has to beat.
//!
//! Both nulls use two free parameters, matching the logistic fit, so
//! their AIC values compare directly.

use threshold_types::{
    ensure_same_length, NullKind, NullModelResult, NullParams, ThresholdError, ThresholdResult,
};

use crate::metrics::{ols, residual_metrics};

/// σ is clipped to `[POWER_LAW_FLOOR, 1]` before taking the log.
pub const POWER_LAW_FLOOR: f64 = 1e-6;

/// A named non-threshold alternative.
pub trait NullModel: Send + Sync {
    fn kind(&self) -> NullKind;
    fn evaluate(&self, r: &[f64], sigma: &[f64]) -> ThresholdResult<NullModelResult>;
}

/// `σ ≈ m·R + b` fitted in probability space.
pub struct LinearNull;

impl NullModel for LinearNull {
    fn kind(&self) -> NullKind {
        NullKind::Linear
    }

    fn evaluate(&self, r: &[f64], sigma: &[f64]) -> ThresholdResult<NullModelResult> {
        evaluate_null_model(r, sigma)
    }
}

/// `σ ≈ A·R^k` fitted on the R > 0 samples.
pub struct PowerLawNull;

impl NullModel for PowerLawNull {
    fn kind(&self) -> NullKind {
        NullKind::PowerLaw
    }

    fn evaluate(&self, r: &[f64], sigma: &[f64]) -> ThresholdResult<NullModelResult> {
        evaluate_power_law_null(r, sigma)
    }
}

fn check_pairs(r: &[f64], sigma: &[f64], what: &str) -> ThresholdResult<()> {
    ensure_same_length(r.len(), sigma.len())?;
    if r.is_empty() {
        return Err(ThresholdError::EmptyInput(format!(
            "{what} needs at least one sample"
        )));
    }
    Ok(())
}

/// Linear null. A constant R yields slope 0 and the mean of σ.
pub fn evaluate_null_model(r: &[f64], sigma: &[f64]) -> ThresholdResult<NullModelResult> {
    check_pairs(r, sigma, "linear null")?;
    let line = ols(r, sigma)?;
    let predicted: Vec<f64> = r.iter().map(|&x| line.predict(x)).collect();
    let metrics = residual_metrics(sigma, &predicted, 2)?;
    Ok(NullModelResult {
        model: NullKind::Linear,
        r2: metrics.r2,
        aic: metrics.aic,
        ss_res: metrics.ss_res,
        params: NullParams::Linear {
            slope: line.slope,
            intercept: line.intercept,
        },
    })
}

/// Power-law null, restricted to samples with R > 0.
///
/// Predictions are clipped to `[0, 1]` and the metrics cover only the
/// restricted samples.
pub fn evaluate_power_law_null(r: &[f64], sigma: &[f64]) -> ThresholdResult<NullModelResult> {
    check_pairs(r, sigma, "power-law null")?;
    let (r_pos, sigma_pos): (Vec<f64>, Vec<f64>) = r
        .iter()
        .zip(sigma)
        .filter(|&(&x, _)| x > 0.0)
        .map(|(&x, &s)| (x, s))
        .unzip();
    if r_pos.is_empty() {
        return Err(ThresholdError::NoPositiveSamples);
    }

    let ln_r: Vec<f64> = r_pos.iter().map(|x| x.ln()).collect();
    let ln_sigma: Vec<f64> = sigma_pos
        .iter()
        .map(|s| s.clamp(POWER_LAW_FLOOR, 1.0).ln())
        .collect();
    let line = ols(&ln_r, &ln_sigma)?;
    let exponent = line.slope;
    let amplitude = line.intercept.exp();

    let predicted: Vec<f64> = r_pos
        .iter()
        .map(|&x| (amplitude * x.powf(exponent)).clamp(0.0, 1.0))
        .collect();
    let metrics = residual_metrics(&sigma_pos, &predicted, 2)?;
    Ok(NullModelResult {
        model: NullKind::PowerLaw,
        r2: metrics.r2,
        aic: metrics.aic,
        ss_res: metrics.ss_res,
        params: NullParams::PowerLaw {
            amplitude,
            exponent,
            n_used: r_pos.len(),
        },
    })
}

pub fn null_model_for(kind: NullKind) -> Box<dyn NullModel> {
    match kind {
        NullKind::Linear => Box::new(LinearNull),
        NullKind::PowerLaw => Box::new(PowerLawNull),
    }
}

/// Ordered set of null models evaluated against one dataset.
pub struct NullModelBank {
    models: Vec<Box<dyn NullModel>>,
}

impl Default for NullModelBank {
    fn default() -> Self {
        Self::from_kinds(&[NullKind::Linear, NullKind::PowerLaw])
    }
}

impl NullModelBank {
    pub fn new(models: Vec<Box<dyn NullModel>>) -> Self {
        Self { models }
    }

    pub fn from_kinds(kinds: &[NullKind]) -> Self {
        Self::new(kinds.iter().map(|&k| null_model_for(k)).collect())
    }

    pub fn kinds(&self) -> Vec<NullKind> {
        self.models.iter().map(|m| m.kind()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Evaluate every model; the first error aborts the bank.
    pub fn evaluate(&self, r: &[f64], sigma: &[f64]) -> ThresholdResult<Vec<NullModelResult>> {
        self.models.iter().map(|m| m.evaluate(r, sigma)).collect()
    }
}
