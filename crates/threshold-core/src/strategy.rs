// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Estimator Strategies & Fallback Chain
// ─────────────────────────────────────────────────────────────────────
//! Ordered estimator fallback.
//!
//! Each [`EstimatorStrategy`] either returns a [`FitResult`] or a typed
//! [`FailureReason`]. [`EstimatorChain`] tries strategies in order and
//! reports which one produced the fit together with every failure that
//! preceded it. Default order: Levenberg-damped Gauss-Newton on the
//! probability-space residuals, then the closed-form logit regression.

use thiserror::Error;
use threshold_physics::logistic_response_all;
use threshold_types::{ensure_same_length, FitResult, ThresholdError, ThresholdResult};

use crate::estimator::{fit_threshold_parameters, CI_MULTIPLIER};
use crate::metrics::residual_metrics;

/// Why a single strategy gave up.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FailureReason {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("singular normal equations: {0}")]
    Singular(String),

    #[error("no convergence after {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error("non-finite parameters: {0}")]
    NonFinite(String),

    /// |β| below the degeneracy floor, Θ undefined.
    #[error("zero slope, threshold undefined")]
    ZeroSlope,
}

/// One way of turning (R, σ) samples into threshold parameters.
pub trait EstimatorStrategy: Send + Sync {
    /// Stable tag reported as `logistic_model.method`.
    fn name(&self) -> &'static str;
    fn estimate(&self, r: &[f64], sigma: &[f64]) -> Result<FitResult, FailureReason>;
}

/// Closed-form logit-linear regression.
pub struct LogitLinear;

impl EstimatorStrategy for LogitLinear {
    fn name(&self) -> &'static str {
        "logit_linear"
    }

    fn estimate(&self, r: &[f64], sigma: &[f64]) -> Result<FitResult, FailureReason> {
        let fit = fit_threshold_parameters(r, sigma)
            .map_err(|e| FailureReason::InvalidInput(e.to_string()))?;
        if fit.theta.is_nan() {
            return Err(FailureReason::ZeroSlope);
        }
        Ok(fit)
    }
}

/// Damped Gauss-Newton least squares on `σ - σ̂(R; β, Θ)`.
///
/// Seeded from the closed form. The damping factor starts at 1e-3 and is
/// divided by 10 on an accepted step, multiplied by 10 on a rejected one.
/// Confidence intervals come from `s²·(JᵀJ)⁻¹` at the optimum.
#[derive(Debug, Clone)]
pub struct GaussNewtonLogistic {
    pub max_iterations: usize,
    /// Relative SSR improvement, or relative step size, at which the fit
    /// counts as converged.
    pub tolerance: f64,
}

impl Default for GaussNewtonLogistic {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-10,
        }
    }
}

const LAMBDA_START: f64 = 1e-3;
const LAMBDA_MAX: f64 = 1e10;

/// JᵀJ = [[a, b], [b, c]] and Jᵀe = [g0, g1] for parameters (β, Θ).
struct NormalEquations {
    a: f64,
    b: f64,
    c: f64,
    g0: f64,
    g1: f64,
}

fn ssr(r: &[f64], sigma: &[f64], beta: f64, theta: f64) -> f64 {
    r.iter()
        .zip(sigma)
        .map(|(&x, &s)| {
            let p = 1.0 / (1.0 + (-beta * (x - theta)).exp());
            (s - p).powi(2)
        })
        .sum()
}

fn normal_equations(r: &[f64], sigma: &[f64], beta: f64, theta: f64) -> NormalEquations {
    let mut eq = NormalEquations {
        a: 0.0,
        b: 0.0,
        c: 0.0,
        g0: 0.0,
        g1: 0.0,
    };
    for (&x, &s) in r.iter().zip(sigma) {
        let p = 1.0 / (1.0 + (-beta * (x - theta)).exp());
        let slope = p * (1.0 - p);
        let j_beta = slope * (x - theta);
        let j_theta = -slope * beta;
        let e = s - p;
        eq.a += j_beta * j_beta;
        eq.b += j_beta * j_theta;
        eq.c += j_theta * j_theta;
        eq.g0 += j_beta * e;
        eq.g1 += j_theta * e;
    }
    eq
}

impl GaussNewtonLogistic {
    /// Returns (β, Θ) at the SSR minimum.
    fn refine(
        &self,
        r: &[f64],
        sigma: &[f64],
        beta0: f64,
        theta0: f64,
    ) -> Result<(f64, f64), FailureReason> {
        let (mut beta, mut theta) = (beta0, theta0);
        let mut current = ssr(r, sigma, beta, theta);
        if current == 0.0 {
            return Ok((beta, theta));
        }
        let mut lambda = LAMBDA_START;

        for _ in 0..self.max_iterations {
            let eq = normal_equations(r, sigma, beta, theta);
            let a = eq.a * (1.0 + lambda);
            let c = eq.c * (1.0 + lambda);
            let det = a * c - eq.b * eq.b;
            if !(det.is_finite() && det > 0.0) {
                return Err(FailureReason::Singular(format!(
                    "damped JᵀJ determinant {det:.3e}"
                )));
            }
            let d_beta = (c * eq.g0 - eq.b * eq.g1) / det;
            let d_theta = (a * eq.g1 - eq.b * eq.g0) / det;
            if d_beta.abs() <= self.tolerance * (beta.abs() + self.tolerance)
                && d_theta.abs() <= self.tolerance * (theta.abs() + self.tolerance)
            {
                return Ok((beta, theta));
            }
            let (next_beta, next_theta) = (beta + d_beta, theta + d_theta);
            if !(next_beta.is_finite() && next_theta.is_finite()) {
                return Err(FailureReason::NonFinite(format!(
                    "β={next_beta}, Θ={next_theta}"
                )));
            }

            let candidate = ssr(r, sigma, next_beta, next_theta);
            if candidate < current {
                let improvement = (current - candidate) / current;
                beta = next_beta;
                theta = next_theta;
                current = candidate;
                lambda = (lambda / 10.0).max(f64::MIN_POSITIVE);
                if improvement <= self.tolerance || current == 0.0 {
                    return Ok((beta, theta));
                }
            } else {
                lambda *= 10.0;
                // No descent direction left at any damping: we sit at the minimum.
                if lambda > LAMBDA_MAX {
                    return Ok((beta, theta));
                }
            }
        }
        Err(FailureReason::NotConverged {
            iterations: self.max_iterations,
        })
    }
}

impl EstimatorStrategy for GaussNewtonLogistic {
    fn name(&self) -> &'static str {
        "gauss_newton_logistic"
    }

    fn estimate(&self, r: &[f64], sigma: &[f64]) -> Result<FitResult, FailureReason> {
        let seed = fit_threshold_parameters(r, sigma)
            .map_err(|e| FailureReason::InvalidInput(e.to_string()))?;
        if seed.theta.is_nan() {
            return Err(FailureReason::ZeroSlope);
        }
        let (beta, theta) = self.refine(r, sigma, seed.beta, seed.theta)?;
        if beta.abs() < crate::estimator::MIN_SLOPE {
            return Err(FailureReason::ZeroSlope);
        }

        let eq = normal_equations(r, sigma, beta, theta);
        let det = eq.a * eq.c - eq.b * eq.b;
        if det <= f64::EPSILON * eq.a * eq.c {
            return Err(FailureReason::Singular(format!(
                "JᵀJ determinant {det:.3e} at optimum"
            )));
        }
        let fitted = logistic_response_all(r, theta, beta);
        let metrics = residual_metrics(sigma, &fitted, 2)
            .map_err(|e| FailureReason::InvalidInput(e.to_string()))?;
        let s2 = metrics.ss_res / r.len().saturating_sub(2).max(1) as f64;
        let beta_std = (s2 * eq.c / det).max(0.0).sqrt();
        let theta_std = (s2 * eq.a / det).max(0.0).sqrt();

        log::debug!(
            "gauss_newton_logistic: β {:.4} → {beta:.4}, Θ {:.4} → {theta:.4}",
            seed.beta,
            seed.theta
        );

        Ok(FitResult {
            beta,
            theta,
            beta_ci: [beta - CI_MULTIPLIER * beta_std, beta + CI_MULTIPLIER * beta_std],
            theta_ci: [theta - CI_MULTIPLIER * theta_std, theta + CI_MULTIPLIER * theta_std],
            r2: metrics.r2,
            aic: metrics.aic,
            ss_res: metrics.ss_res,
        })
    }
}

type EstimateFn = Box<dyn Fn(&[f64], &[f64]) -> Result<FitResult, FailureReason> + Send + Sync>;

/// Strategy backed by a caller-supplied function.
pub struct ExternalStrategy {
    name: &'static str,
    estimate_fn: EstimateFn,
}

impl ExternalStrategy {
    pub fn new(
        name: &'static str,
        estimate_fn: impl Fn(&[f64], &[f64]) -> Result<FitResult, FailureReason>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name,
            estimate_fn: Box::new(estimate_fn),
        }
    }
}

impl EstimatorStrategy for ExternalStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn estimate(&self, r: &[f64], sigma: &[f64]) -> Result<FitResult, FailureReason> {
        (self.estimate_fn)(r, sigma)
    }
}

/// A strategy that failed before the chain found a fit.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyFailure {
    pub method: &'static str,
    pub reason: FailureReason,
}

/// Fit produced by the first successful strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainedFit {
    pub fit: FitResult,
    pub method: &'static str,
    pub failures: Vec<StrategyFailure>,
}

pub struct EstimatorChain {
    strategies: Vec<Box<dyn EstimatorStrategy>>,
}

impl Default for EstimatorChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(GaussNewtonLogistic::default()),
            Box::new(LogitLinear),
        ])
    }
}

impl EstimatorChain {
    pub fn new(strategies: Vec<Box<dyn EstimatorStrategy>>) -> Self {
        Self { strategies }
    }

    /// Append a strategy as the new last resort.
    pub fn push(&mut self, strategy: Box<dyn EstimatorStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Try each strategy in order.
    ///
    /// Empty or mismatched input is rejected before any strategy runs.
    pub fn fit(&self, r: &[f64], sigma: &[f64]) -> ThresholdResult<ChainedFit> {
        ensure_same_length(r.len(), sigma.len())?;
        if r.is_empty() {
            return Err(ThresholdError::EmptyInput(
                "estimator chain needs at least one sample".to_string(),
            ));
        }
        let mut failures = Vec::new();
        for strategy in &self.strategies {
            match strategy.estimate(r, sigma) {
                Ok(fit) => {
                    if !failures.is_empty() {
                        log::debug!(
                            "estimator chain: {} succeeded after {} failure(s)",
                            strategy.name(),
                            failures.len()
                        );
                    }
                    return Ok(ChainedFit {
                        fit,
                        method: strategy.name(),
                        failures,
                    });
                }
                Err(reason) => {
                    log::debug!("estimator chain: {} failed: {reason}", strategy.name());
                    failures.push(StrategyFailure {
                        method: strategy.name(),
                        reason,
                    });
                }
            }
        }
        if failures.is_empty() {
            return Err(ThresholdError::Estimation(
                "no estimator strategies configured".to_string(),
            ));
        }
        let detail = failures
            .iter()
            .map(|f| format!("{}: {}", f.method, f.reason))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ThresholdError::Estimation(detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use threshold_physics::linspace;

    fn noisy_logistic(theta: f64, beta: f64, n: usize) -> (Vec<f64>, Vec<f64>) {
        let r = linspace(theta - 1.5, theta + 1.5, n);
        let sigma = r
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let wobble = 0.04 * ((i as f64) * 1.7).sin();
                (1.0 / (1.0 + (-beta * (x - theta)).exp()) + wobble).clamp(0.0, 1.0)
            })
            .collect();
        (r, sigma)
    }

    #[test]
    fn test_gauss_newton_recovers_clean_curve() {
        let r = linspace(-1.0, 2.0, 50);
        let sigma = logistic_response_all(&r, 0.5, 4.0);
        let fit = GaussNewtonLogistic::default().estimate(&r, &sigma).unwrap();
        assert!((fit.theta - 0.5).abs() < 1e-6);
        assert!((fit.beta - 4.0).abs() < 1e-4);
        assert!(fit.r2 > 0.999_999);
    }

    #[test]
    fn test_gauss_newton_never_worse_than_seed() {
        let (r, sigma) = noisy_logistic(0.3, 5.0, 60);
        let seed = fit_threshold_parameters(&r, &sigma).unwrap();
        let refined = GaussNewtonLogistic::default().estimate(&r, &sigma).unwrap();
        assert!(refined.ss_res <= seed.ss_res + 1e-12);
        assert!((refined.theta - 0.3).abs() < 0.1);
        assert!(refined.theta_ci[0] < refined.theta && refined.theta < refined.theta_ci[1]);
        assert!(refined.beta_ci[0] < refined.beta && refined.beta < refined.beta_ci[1]);
    }

    #[test]
    fn test_zero_iterations_do_not_converge() {
        let (r, sigma) = noisy_logistic(0.0, 3.0, 30);
        let strategy = GaussNewtonLogistic {
            max_iterations: 0,
            tolerance: 1e-10,
        };
        assert_eq!(
            strategy.estimate(&r, &sigma).unwrap_err(),
            FailureReason::NotConverged { iterations: 0 }
        );
    }

    #[test]
    fn test_logit_linear_rejects_zero_slope() {
        let err = LogitLinear
            .estimate(&[0.5, 0.5, 0.5], &[0.3, 0.5, 0.7])
            .unwrap_err();
        assert_eq!(err, FailureReason::ZeroSlope);
    }

    #[test]
    fn test_chain_prefers_first_success() {
        let r = linspace(-1.0, 2.0, 50);
        let sigma = logistic_response_all(&r, 0.5, 4.0);
        let chained = EstimatorChain::default().fit(&r, &sigma).unwrap();
        assert_eq!(chained.method, "gauss_newton_logistic");
        assert!(chained.failures.is_empty());
    }

    #[test]
    fn test_chain_falls_back_and_tags_failures() {
        let (r, sigma) = noisy_logistic(0.0, 3.0, 30);
        let chain = EstimatorChain::new(vec![
            Box::new(GaussNewtonLogistic {
                max_iterations: 0,
                tolerance: 1e-10,
            }),
            Box::new(LogitLinear),
        ]);
        let chained = chain.fit(&r, &sigma).unwrap();
        assert_eq!(chained.method, "logit_linear");
        assert_eq!(chained.failures.len(), 1);
        assert_eq!(chained.failures[0].method, "gauss_newton_logistic");
        assert!(matches!(
            chained.failures[0].reason,
            FailureReason::NotConverged { .. }
        ));
    }

    #[test]
    fn test_chain_reports_every_failure() {
        let err = EstimatorChain::default()
            .fit(&[0.5, 0.5, 0.5], &[0.3, 0.5, 0.7])
            .unwrap_err();
        match err {
            ThresholdError::Estimation(msg) => {
                assert!(msg.contains("gauss_newton_logistic"));
                assert!(msg.contains("logit_linear"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_chain_validates_before_strategies() {
        let chain = EstimatorChain::new(vec![Box::new(ExternalStrategy::new(
            "never",
            |_, _| panic!("strategy must not run"),
        ))]);
        assert!(matches!(
            chain.fit(&[1.0, 2.0], &[0.5]),
            Err(ThresholdError::LengthMismatch { left: 2, right: 1 })
        ));
        assert!(matches!(chain.fit(&[], &[]), Err(ThresholdError::EmptyInput(_))));
    }

    #[test]
    fn test_external_strategy_and_push() {
        let mut chain = EstimatorChain::new(Vec::new());
        assert!(matches!(
            chain.fit(&[1.0], &[0.5]),
            Err(ThresholdError::Estimation(_))
        ));
        chain.push(Box::new(ExternalStrategy::new("fixed", |_, _| {
            Ok(FitResult {
                beta: 2.0,
                theta: 0.1,
                beta_ci: [1.0, 3.0],
                theta_ci: [0.0, 0.2],
                r2: 0.9,
                aic: -10.0,
                ss_res: 0.01,
            })
        })));
        assert_eq!(chain.names(), vec!["fixed"]);
        let chained = chain.fit(&[1.0], &[0.5]).unwrap();
        assert_eq!(chained.method, "fixed");
        assert_eq!(chained.fit.theta, 0.1);
    }
}
