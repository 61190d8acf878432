// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Resonance Pipeline
// ─────────────────────────────────────────────────────────────────────
//! simulate → fit → null bank → verdict, as one reusable object.

use std::collections::BTreeMap;

use threshold_physics::{constant_driver, FieldTrace, ThresholdFieldSolver};
use threshold_types::{
    AnalysisConfig, FitResult, ResonanceSummary, SimulationConfig, ThresholdResult,
};

use crate::estimator::fit_threshold_parameters;
use crate::judge::assemble_summary;
use crate::nulls::NullModelBank;
use crate::strategy::EstimatorChain;

/// Method tag for the closed-form fit used when no chain is configured.
pub const CLOSED_FORM_METHOD: &str = "logit_linear";

/// Analysis settings plus an optional estimator fallback chain.
///
/// Without a chain, fits use the closed-form logit regression, which
/// tolerates degenerate inputs (Θ = NaN). With a chain, a run where
/// every strategy fails is an error.
pub struct ResonancePipeline {
    analysis: AnalysisConfig,
    nulls: NullModelBank,
    chain: Option<EstimatorChain>,
}

impl Default for ResonancePipeline {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl ResonancePipeline {
    pub fn new(analysis: AnalysisConfig) -> Self {
        let nulls = NullModelBank::from_kinds(&analysis.nulls);
        Self {
            analysis,
            nulls,
            chain: None,
        }
    }

    pub fn with_chain(mut self, chain: EstimatorChain) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn analysis(&self) -> &AnalysisConfig {
        &self.analysis
    }

    /// Integrate a constant-driver membrane described by `config`.
    pub fn simulate_series(&self, config: &SimulationConfig) -> ThresholdResult<FieldTrace> {
        config.validate()?;
        let solver = ThresholdFieldSolver::from_config(config);
        let drivers = constant_driver(config.driver, config.steps);
        Ok(solver.simulate(&drivers, config.r0, None))
    }

    /// Fit (β, Θ) and report which method produced the fit.
    pub fn fit(&self, r: &[f64], sigma: &[f64]) -> ThresholdResult<(FitResult, &'static str)> {
        match &self.chain {
            Some(chain) => {
                let chained = chain.fit(r, sigma)?;
                for failure in &chained.failures {
                    log::debug!("fit: {} skipped ({})", failure.method, failure.reason);
                }
                Ok((chained.fit, chained.method))
            }
            None => Ok((fit_threshold_parameters(r, sigma)?, CLOSED_FORM_METHOD)),
        }
    }

    /// Fit, evaluate the null bank and assemble the summary for one trace.
    pub fn analyse(&self, trace: &FieldTrace) -> ThresholdResult<ResonanceSummary> {
        self.analysis.validate()?;
        let (fit, method) = self.fit(&trace.r, &trace.sigma)?;
        let nulls = self.nulls.evaluate(&trace.r, &trace.sigma)?;
        let mut summary = assemble_summary(trace, &fit, &nulls, self.analysis.threshold_r)?;
        summary.logistic_model.method = Some(method.to_string());
        log::debug!(
            "analyse: {} samples via {method}, verdict={}",
            trace.r.len(),
            summary.falsification.logistic_beats_all_nulls
        );
        Ok(summary)
    }

    /// Simulate then analyse, tagging the summary with its provenance.
    pub fn run_simulated(&self, config: &SimulationConfig) -> ThresholdResult<ResonanceSummary> {
        let trace = self.simulate_series(config)?;
        let mut summary = self.analyse(&trace)?;
        summary.source = Some(simulation_source(config));
        Ok(summary)
    }
}

fn simulation_source(config: &SimulationConfig) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("origin".to_string(), "simulation".to_string()),
        ("theta".to_string(), config.theta.to_string()),
        ("beta".to_string(), config.beta.to_string()),
        ("steps".to_string(), config.steps.to_string()),
        ("driver".to_string(), config.driver.to_string()),
        ("boundary".to_string(), config.boundary.is_some().to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use threshold_physics::{linspace, logistic_response_all};
    use threshold_types::{BoundaryConfig, NullKind, ThresholdError};

    #[test]
    fn test_simulate_series_lengths() {
        let config = SimulationConfig {
            steps: 40,
            ..Default::default()
        };
        let trace = ResonancePipeline::default().simulate_series(&config).unwrap();
        assert_eq!(trace.r.len(), 41);
        assert_eq!(trace.t.len(), 41);
        assert_eq!(trace.flux.len(), 40);
        assert!(trace.driver.iter().all(|&d| d == 0.9));
        assert!(trace.boundary_flux.is_none());
    }

    #[test]
    fn test_invalid_simulation_config_rejected() {
        let config = SimulationConfig {
            dt: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            ResonancePipeline::default().simulate_series(&config),
            Err(ThresholdError::Config(_))
        ));
    }

    #[test]
    fn test_run_simulated_end_to_end() {
        let pipeline = ResonancePipeline::default();
        let summary = pipeline.run_simulated(&SimulationConfig::default()).unwrap();
        assert!((summary.theta_estimate.value - 1.0).abs() < 0.05);
        assert!((summary.beta_estimate.value - 8.0).abs() < 0.5);
        assert!(summary.falsification.logistic_beats_all_nulls);
        assert_eq!(summary.logistic_model.method.as_deref(), Some("logit_linear"));
        let crossing = summary.threshold_crossing.as_ref().unwrap();
        assert!(crossing.crossed);
        assert!(summary.membrane.is_some());
        let source = summary.source.as_ref().unwrap();
        assert_eq!(source["origin"], "simulation");
    }

    #[test]
    fn test_boundary_run_reports_boundary_stats() {
        let config = SimulationConfig {
            boundary: Some(BoundaryConfig::default()),
            ..Default::default()
        };
        let summary = ResonancePipeline::default().run_simulated(&config).unwrap();
        let membrane = summary.membrane.unwrap();
        assert!(membrane.boundary_flux.is_some());
        let gate = membrane.boundary_gate.unwrap();
        assert!(gate.valley >= 0.0 && gate.peak <= 1.0);
        assert!(summary.threshold_crossing.unwrap().boundary_gate_at_crossing.is_some());
    }

    #[test]
    fn test_chain_tags_method() {
        let r = linspace(-1.0, 2.0, 50);
        let sigma = logistic_response_all(&r, 0.5, 4.0);
        let trace = FieldTrace::from_observations(r, sigma).unwrap();
        let pipeline = ResonancePipeline::default().with_chain(EstimatorChain::default());
        let summary = pipeline.analyse(&trace).unwrap();
        assert_eq!(
            summary.logistic_model.method.as_deref(),
            Some("gauss_newton_logistic")
        );
        assert!((summary.theta_estimate.value - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_trace_without_chain_is_not_an_error() {
        let trace = FieldTrace::from_observations(vec![0.5; 3], vec![0.3, 0.5, 0.7]).unwrap();
        let pipeline = ResonancePipeline::new(AnalysisConfig {
            nulls: vec![NullKind::Linear],
            threshold_r: None,
        });
        let summary = pipeline.analyse(&trace).unwrap();
        assert!(summary.theta_estimate.value.is_nan());
        assert_eq!(summary.beta_estimate.value, 0.0);
    }

    #[test]
    fn test_degenerate_trace_with_chain_fails() {
        let trace = FieldTrace::from_observations(vec![0.5; 3], vec![0.3, 0.5, 0.7]).unwrap();
        let pipeline = ResonancePipeline::default().with_chain(EstimatorChain::default());
        assert!(matches!(
            pipeline.analyse(&trace),
            Err(ThresholdError::Estimation(_))
        ));
    }

    #[test]
    fn test_power_law_failure_propagates() {
        let trace =
            FieldTrace::from_observations(vec![-1.0, -0.5, 0.0], vec![0.1, 0.2, 0.3]).unwrap();
        assert_eq!(
            ResonancePipeline::default().analyse(&trace).unwrap_err(),
            ThresholdError::NoPositiveSamples
        );
    }
}
