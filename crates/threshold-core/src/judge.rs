// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Falsification Judge & Summary Assembly
// ─────────────────────────────────────────────────────────────────────

use std::collections::BTreeMap;

use threshold_physics::FieldTrace;
use threshold_types::{
    Comparison, Estimate, FalsificationVerdict, FitResult, LogisticModel, MembraneBlock,
    NullModelResult, ResonanceSummary, SeriesStats, ThresholdResult,
};

use crate::crossing::threshold_crossing_diagnostics;
use crate::metrics::{mean, population_std};

/// Compare the logistic fit against every null.
///
/// The logistic hypothesis survives only if it beats each null on AIC
/// (strictly) and on R² (ties allowed). With no nulls the verdict is
/// vacuously true.
pub fn judge_falsification(fit: &FitResult, nulls: &[NullModelResult]) -> FalsificationVerdict {
    if nulls.is_empty() {
        log::warn!("judge_falsification: no null models, verdict is vacuous");
    }
    let comparisons: BTreeMap<String, Comparison> = nulls
        .iter()
        .map(|null| {
            let comparison = Comparison {
                delta_aic: null.aic - fit.aic,
                delta_r2: fit.r2 - null.r2,
            };
            if comparison.delta_aic == f64::INFINITY {
                log::warn!(
                    "judge_falsification: ΔAIC vs {} is +inf (perfect logistic fit)",
                    null.model.name()
                );
            }
            (null.model.name().to_string(), comparison)
        })
        .collect();
    let logistic_beats_all_nulls = comparisons.values().all(Comparison::logistic_wins);
    FalsificationVerdict {
        logistic_beats_all_nulls,
        comparisons,
    }
}

/// Membrane statistics, present only when the trace carries ζ or flux.
fn membrane_block(trace: &FieldTrace) -> Option<MembraneBlock> {
    if trace.zeta.is_empty() && trace.flux.is_empty() {
        return None;
    }
    Some(MembraneBlock {
        theta: trace.theta.first().copied(),
        beta: trace.beta.first().copied(),
        zeta_mean: mean(&trace.zeta),
        flux_mean: mean(&trace.flux),
        flux_std: population_std(&trace.flux),
        boundary_flux: trace.boundary_flux.as_deref().and_then(SeriesStats::from_slice),
        boundary_gate: trace.boundary_gate.as_deref().and_then(SeriesStats::from_slice),
    })
}

/// Build the stable summary payload for one run.
///
/// Crossing diagnostics are attached when the trace has a time axis
/// aligned with R. Their reference Θ/β is the simulated Θ(t=0)/β(t=0)
/// when the trace carries those series, and the fitted Θ/β otherwise.
/// `logistic_model.method` and `source` are left for the caller.
pub fn assemble_summary(
    trace: &FieldTrace,
    fit: &FitResult,
    nulls: &[NullModelResult],
    threshold_r: Option<f64>,
) -> ThresholdResult<ResonanceSummary> {
    let falsification = judge_falsification(fit, nulls);
    let null_models = nulls
        .iter()
        .map(|n| (n.model.name().to_string(), *n))
        .collect();

    let threshold_crossing = if !trace.t.is_empty() && trace.t.len() == trace.r.len() {
        let theta = trace.theta.first().copied().unwrap_or(fit.theta);
        let beta = trace.beta.first().copied().unwrap_or(fit.beta);
        Some(threshold_crossing_diagnostics(trace, theta, beta, threshold_r)?)
    } else {
        None
    };

    Ok(ResonanceSummary {
        theta_estimate: Estimate {
            value: fit.theta,
            ci95: fit.theta_ci,
        },
        beta_estimate: Estimate {
            value: fit.beta,
            ci95: fit.beta_ci,
        },
        logistic_model: LogisticModel {
            r2: fit.r2,
            aic: fit.aic,
            ss_res: fit.ss_res,
            method: None,
        },
        null_models,
        falsification,
        membrane: membrane_block(trace),
        threshold_crossing,
        source: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::fit_threshold_parameters;
    use crate::nulls::NullModelBank;
    use threshold_physics::{linspace, logistic_response_all};
    use threshold_types::{NullKind, NullParams};

    fn fit(r2: f64, aic: f64) -> FitResult {
        FitResult {
            beta: 4.0,
            theta: 0.5,
            beta_ci: [3.5, 4.5],
            theta_ci: [0.4, 0.6],
            r2,
            aic,
            ss_res: 0.01,
        }
    }

    fn null(model: NullKind, r2: f64, aic: f64) -> NullModelResult {
        NullModelResult {
            model,
            r2,
            aic,
            ss_res: 0.1,
            params: NullParams::Linear {
                slope: 0.0,
                intercept: 0.0,
            },
        }
    }

    #[test]
    fn test_logistic_beats_both_nulls() {
        let verdict = judge_falsification(
            &fit(0.99, -200.0),
            &[
                null(NullKind::Linear, 0.9, -120.0),
                null(NullKind::PowerLaw, 0.8, -90.0),
            ],
        );
        assert!(verdict.logistic_beats_all_nulls);
        assert!((verdict.comparisons["linear"].delta_aic - 80.0).abs() < 1e-12);
        assert!((verdict.comparisons["power_law"].delta_r2 - 0.19).abs() < 1e-12);
    }

    #[test]
    fn test_single_losing_null_flips_verdict() {
        let verdict = judge_falsification(
            &fit(0.95, -100.0),
            &[
                null(NullKind::Linear, 0.9, -120.0),
                null(NullKind::PowerLaw, 0.8, -90.0),
            ],
        );
        assert!(!verdict.logistic_beats_all_nulls);
        assert!(!verdict.comparisons["linear"].logistic_wins());
        assert!(verdict.comparisons["power_law"].logistic_wins());
    }

    #[test]
    fn test_equal_aic_does_not_win() {
        let verdict = judge_falsification(&fit(0.9, -50.0), &[null(NullKind::Linear, 0.9, -50.0)]);
        assert!(!verdict.logistic_beats_all_nulls);
    }

    #[test]
    fn test_perfect_fit_gives_infinite_delta() {
        let verdict = judge_falsification(
            &fit(1.0, f64::NEG_INFINITY),
            &[null(NullKind::Linear, 0.9, -50.0)],
        );
        assert_eq!(verdict.comparisons["linear"].delta_aic, f64::INFINITY);
        assert!(verdict.logistic_beats_all_nulls);
    }

    #[test]
    fn test_empty_null_set_is_vacuous() {
        let verdict = judge_falsification(&fit(0.5, 10.0), &[]);
        assert!(verdict.logistic_beats_all_nulls);
        assert!(verdict.comparisons.is_empty());
    }

    #[test]
    fn test_clean_logistic_survives_falsification() {
        let r = linspace(-1.0, 2.0, 50);
        let sigma = logistic_response_all(&r, 0.5, 4.0);
        let fitted = fit_threshold_parameters(&r, &sigma).unwrap();
        let nulls = NullModelBank::default().evaluate(&r, &sigma).unwrap();
        let verdict = judge_falsification(&fitted, &nulls);
        assert!(verdict.comparisons.values().all(|c| c.delta_aic > 0.0));
        assert!(verdict.logistic_beats_all_nulls);
    }

    #[test]
    fn test_summary_for_observations_skips_trace_blocks() {
        let r = linspace(-1.0, 2.0, 30);
        let sigma = logistic_response_all(&r, 0.5, 4.0);
        let trace = FieldTrace::from_observations(r.clone(), sigma.clone()).unwrap();
        let fitted = fit_threshold_parameters(&r, &sigma).unwrap();
        let nulls = NullModelBank::default().evaluate(&r, &sigma).unwrap();
        let summary = assemble_summary(&trace, &fitted, &nulls, None).unwrap();
        assert!(summary.membrane.is_none());
        assert!(summary.threshold_crossing.is_none());
        assert_eq!(summary.null_models.len(), 2);
        assert!(summary.null_models.contains_key("power_law"));
        assert_eq!(summary.theta_estimate.value, fitted.theta);
        assert_eq!(summary.logistic_model.method, None);
    }

    #[test]
    fn test_summary_with_times_attaches_crossing() {
        let r = linspace(0.0, 1.0, 11);
        let sigma = logistic_response_all(&r, 0.45, 8.0);
        let t = linspace(0.0, 10.0, 11);
        let trace = FieldTrace::from_observations(r.clone(), sigma.clone())
            .unwrap()
            .with_times(t)
            .unwrap();
        let fitted = fit_threshold_parameters(&r, &sigma).unwrap();
        let summary = assemble_summary(&trace, &fitted, &[], Some(0.45)).unwrap();
        let crossing = summary.threshold_crossing.unwrap();
        assert!(crossing.crossed);
        assert_eq!(crossing.crossing_index, Some(5));
        assert!((crossing.crossing_time.unwrap() - 4.5).abs() < 1e-9);
        assert!(summary.falsification.logistic_beats_all_nulls);
    }

    #[test]
    fn test_crossing_prefers_simulated_theta_over_fit() {
        let trace = FieldTrace {
            t: vec![0.0, 1.0, 2.0, 3.0],
            r: vec![0.0, 0.2, 0.4, 0.6],
            sigma: vec![0.1, 0.3, 0.6, 0.8],
            theta: vec![0.3],
            beta: vec![6.0],
            ..Default::default()
        };
        let crossing = assemble_summary(&trace, &fit(0.9, -10.0), &[], None)
            .unwrap()
            .threshold_crossing
            .unwrap();
        assert_eq!(crossing.threshold_r, 0.3);
        assert_eq!(crossing.beta_at_crossing, Some(6.0));
        assert_eq!(crossing.crossing_index, Some(2));
    }

    #[test]
    fn test_crossing_falls_back_to_fitted_theta() {
        let r = vec![0.0, 0.2, 0.4, 0.6];
        let sigma = vec![0.1, 0.3, 0.6, 0.8];
        let trace = FieldTrace::from_observations(r, sigma)
            .unwrap()
            .with_times(vec![0.0, 1.0, 2.0, 3.0])
            .unwrap();
        let crossing = assemble_summary(&trace, &fit(0.9, -10.0), &[], None)
            .unwrap()
            .threshold_crossing
            .unwrap();
        assert_eq!(crossing.threshold_r, 0.5);
        assert_eq!(crossing.beta_at_crossing, Some(4.0));
        assert_eq!(crossing.crossing_index, Some(3));
    }

    #[test]
    fn test_summary_json_keys() {
        let r = linspace(-1.0, 2.0, 20);
        let sigma = logistic_response_all(&r, 0.5, 4.0);
        let trace = FieldTrace::from_observations(r.clone(), sigma.clone()).unwrap();
        let fitted = fit_threshold_parameters(&r, &sigma).unwrap();
        let nulls = NullModelBank::default().evaluate(&r, &sigma).unwrap();
        let json = assemble_summary(&trace, &fitted, &nulls, None).unwrap().to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for key in [
            "theta_estimate",
            "beta_estimate",
            "logistic_model",
            "null_models",
            "falsification",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(value["null_models"]["linear"]["slope"].is_number());
    }
}
