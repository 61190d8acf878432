// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Threshold Crossing Diagnostics
// ─────────────────────────────────────────────────────────────────────
//! Locate the first sample where R reaches the threshold.
//!
//! When no explicit reference is given and the trace carries a full Θ(t)
//! series, the scan follows the drifting threshold. Between the last
//! sub-threshold sample and the crossing sample, t, R, Θ, β, ζ and the
//! meta gate are linearly interpolated and σ is re-evaluated at the
//! interpolated R. Boundary flux and gate are read at the nearest sample
//! index instead.

use threshold_physics::{logistic_response, FieldTrace};
use threshold_types::{ensure_same_length, CrossingDiagnostic, ThresholdError, ThresholdResult};

#[inline]
fn lerp(a: f64, b: f64, fraction: f64) -> f64 {
    a + fraction * (b - a)
}

/// Value at `idx`, interpolated from `prev` when requested.
///
/// Past the end of the series the last sample is used.
fn interpolated_at(
    series: &[f64],
    prev: usize,
    idx: usize,
    fraction: Option<f64>,
) -> Option<f64> {
    let last = series.len().checked_sub(1)?;
    match fraction {
        Some(f) if idx <= last => Some(lerp(series[prev], series[idx], f)),
        _ if idx <= last => Some(series[idx]),
        _ => Some(series[last]),
    }
}

/// Crossing diagnostics for one trace.
///
/// `theta` and `beta` are the static reference values; `threshold_r`
/// overrides Θ as the reference level and disables the dynamic Θ(t) scan.
pub fn threshold_crossing_diagnostics(
    trace: &FieldTrace,
    theta: f64,
    beta: f64,
    threshold_r: Option<f64>,
) -> ThresholdResult<CrossingDiagnostic> {
    let r = &trace.r;
    if r.is_empty() {
        return Err(ThresholdError::EmptyInput(
            "crossing diagnostics need at least one R sample".to_string(),
        ));
    }
    if trace.t.is_empty() {
        return Err(ThresholdError::MissingSeries("t".to_string()));
    }
    ensure_same_length(r.len(), trace.t.len())?;

    let dynamic_theta = threshold_r.is_none() && trace.theta.len() == r.len();
    let dynamic_beta = trace.beta.len() == r.len();
    let threshold_default = threshold_r.unwrap_or(theta);
    let theta_at = |i: usize| {
        if dynamic_theta {
            trace.theta[i]
        } else {
            threshold_default
        }
    };
    let beta_at = |i: usize| if dynamic_beta { trace.beta[i] } else { beta };

    let Some(idx) = (0..r.len()).find(|&i| r[i] - theta_at(i) >= 0.0) else {
        return Ok(CrossingDiagnostic {
            crossed: false,
            threshold_r: threshold_default,
            ..Default::default()
        });
    };

    let prev = idx.saturating_sub(1);
    let diff_prev = r[prev] - theta_at(prev);
    let diff_curr = r[idx] - theta_at(idx);
    let fraction = (idx > 0 && diff_prev != diff_curr)
        .then(|| (diff_prev / (diff_prev - diff_curr)).clamp(0.0, 1.0));
    let at = |series: &[f64]| match fraction {
        Some(f) => lerp(series[prev], series[idx], f),
        None => series[idx],
    };

    let crossing_time = at(&trace.t[..]);
    let crossing_r = at(&r[..]);
    let theta_cross = match fraction {
        Some(f) => lerp(theta_at(prev), theta_at(idx), f),
        None => theta_at(idx),
    };
    let beta_cross = match fraction {
        Some(f) => lerp(beta_at(prev), beta_at(idx), f),
        None => beta_at(idx),
    };
    let reference = if dynamic_theta {
        theta_cross
    } else {
        threshold_default
    };

    let zeta_at_crossing = if idx < trace.zeta.len() {
        Some(match fraction {
            Some(f) => lerp(trace.zeta[prev], trace.zeta[idx], f),
            None => trace.zeta[idx],
        })
    } else {
        None
    };
    // Flux-like series are one shorter: entry k-1 drives sample k.
    let driver_at_crossing = match trace.driver.len() {
        0 => None,
        len if idx > 0 => Some(trace.driver[(idx - 1).min(len - 1)]),
        _ => None,
    };
    let boundary_flux_at_crossing = trace
        .boundary_flux
        .as_deref()
        .and_then(|s| s.get(prev.min(s.len().checked_sub(1)?)).copied());
    let boundary_gate_at_crossing = trace
        .boundary_gate
        .as_deref()
        .and_then(|s| s.get(idx.min(s.len().checked_sub(1)?)).copied());
    let meta_gate_at_crossing = trace
        .meta_gate
        .as_deref()
        .and_then(|s| interpolated_at(s, prev, idx, fraction));

    Ok(CrossingDiagnostic {
        crossed: true,
        threshold_r: reference,
        crossing_index: Some(idx),
        crossing_time: Some(crossing_time),
        crossing_r: Some(crossing_r),
        crossing_sigma: Some(logistic_response(crossing_r, reference, beta_cross)),
        overshoot: Some(r[idx] - theta_at(idx)),
        theta_at_crossing: Some(theta_cross),
        beta_at_crossing: Some(beta_cross),
        zeta_at_crossing,
        driver_at_crossing,
        boundary_flux_at_crossing,
        boundary_gate_at_crossing,
        meta_gate_at_crossing,
        interpolated: fraction.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use threshold_physics::{constant_driver, linspace, RobinBoundary, ThresholdFieldSolver};

    fn ramp_trace() -> FieldTrace {
        FieldTrace {
            t: vec![0.0, 1.0, 2.0, 3.0],
            r: vec![0.0, 0.4, 0.8, 1.2],
            sigma: vec![0.1, 0.2, 0.6, 0.9],
            zeta: vec![1.0, 1.2, 1.4, 1.6],
            flux: vec![0.4, 0.4, 0.4],
            driver: vec![0.5, 0.6, 0.7],
            ..Default::default()
        }
    }

    #[test]
    fn test_interpolates_between_bracketing_samples() {
        let diag = threshold_crossing_diagnostics(&ramp_trace(), 0.6, 4.0, None).unwrap();
        assert!(diag.crossed);
        assert!(diag.interpolated);
        assert_eq!(diag.crossing_index, Some(2));
        assert!((diag.crossing_time.unwrap() - 1.5).abs() < 1e-9);
        assert!((diag.crossing_r.unwrap() - 0.6).abs() < 1e-9);
        assert!((diag.crossing_sigma.unwrap() - 0.5).abs() < 1e-9);
        assert!((diag.zeta_at_crossing.unwrap() - 1.3).abs() < 1e-9);
        assert!((diag.overshoot.unwrap() - 0.2).abs() < 1e-9);
        assert_eq!(diag.driver_at_crossing, Some(0.6));
        assert_eq!(diag.threshold_r, 0.6);
    }

    #[test]
    fn test_monotone_ramp_lands_on_threshold() {
        let r = linspace(0.0, 1.0, 11);
        let t = linspace(0.0, 5.0, 11);
        let sigma = vec![0.5; r.len()];
        let trace = FieldTrace::from_observations(r.clone(), sigma)
            .unwrap()
            .with_times(t.clone())
            .unwrap();
        for &theta in &[0.13, 0.43, 0.77, 0.999] {
            let diag = threshold_crossing_diagnostics(&trace, theta, 6.0, None).unwrap();
            assert!(diag.crossed);
            let idx = diag.crossing_index.unwrap();
            assert!(r[idx] >= theta && r[idx - 1] < theta, "Θ {theta}: index {idx}");
            assert!((diag.crossing_r.unwrap() - theta).abs() < 1e-9, "Θ {theta}");
            let time = diag.crossing_time.unwrap();
            assert!(time >= t[idx - 1] && time <= t[idx]);
            assert!((diag.crossing_sigma.unwrap() - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_threshold_on_a_sample_picks_that_sample() {
        let trace = FieldTrace::from_observations(
            vec![0.0, 0.25, 0.5, 0.75, 1.0],
            vec![0.1, 0.3, 0.5, 0.7, 0.9],
        )
        .unwrap()
        .with_times(vec![0.0, 1.0, 2.0, 3.0, 4.0])
        .unwrap();
        let diag = threshold_crossing_diagnostics(&trace, 0.5, 4.0, None).unwrap();
        assert_eq!(diag.crossing_index, Some(2));
        // The bracket collapses onto the crossing sample itself.
        assert_eq!(diag.crossing_r, Some(0.5));
        assert_eq!(diag.crossing_time, Some(2.0));
        assert_eq!(diag.overshoot, Some(0.0));
        assert_eq!(diag.crossing_sigma, Some(0.5));
    }

    #[test]
    fn test_explicit_threshold_overrides_theta() {
        let diag = threshold_crossing_diagnostics(&ramp_trace(), 0.6, 4.0, Some(1.0)).unwrap();
        assert_eq!(diag.crossing_index, Some(3));
        assert!((diag.crossing_time.unwrap() - 2.5).abs() < 1e-9);
        assert!((diag.crossing_r.unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(diag.threshold_r, 1.0);
    }

    #[test]
    fn test_first_sample_already_above() {
        let diag = threshold_crossing_diagnostics(&ramp_trace(), -0.5, 4.0, None).unwrap();
        assert_eq!(diag.crossing_index, Some(0));
        assert!(!diag.interpolated);
        assert_eq!(diag.crossing_time, Some(0.0));
        assert_eq!(diag.driver_at_crossing, None);
        assert_eq!(diag.zeta_at_crossing, Some(1.0));
    }

    #[test]
    fn test_never_crossed() {
        let diag = threshold_crossing_diagnostics(&ramp_trace(), 5.0, 4.0, None).unwrap();
        assert!(!diag.crossed);
        assert_eq!(diag.threshold_r, 5.0);
        assert_eq!(diag.crossing_index, None);
        assert_eq!(diag.crossing_sigma, None);
        assert!(!diag.interpolated);
    }

    #[test]
    fn test_dynamic_theta_trace_is_followed() {
        let mut trace = ramp_trace();
        trace.theta = vec![1.0, 1.0, 0.6, 0.6];
        trace.beta = vec![2.0, 2.0, 6.0, 6.0];
        let diag = threshold_crossing_diagnostics(&trace, 5.0, 4.0, None).unwrap();
        // diffs: -1.0, -0.6, 0.2 → crossing at 2, fraction 0.6/0.8.
        assert_eq!(diag.crossing_index, Some(2));
        let f = 0.75;
        assert!((diag.crossing_r.unwrap() - (0.4 + f * 0.4)).abs() < 1e-9);
        let theta_cross = 1.0 + f * (0.6 - 1.0);
        assert!((diag.theta_at_crossing.unwrap() - theta_cross).abs() < 1e-9);
        assert!((diag.threshold_r - theta_cross).abs() < 1e-9);
        assert!((diag.beta_at_crossing.unwrap() - 5.0).abs() < 1e-9);
        let expected = logistic_response(0.7, theta_cross, 5.0);
        assert!((diag.crossing_sigma.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_boundary_series_use_nearest_index() {
        let mut trace = ramp_trace();
        trace.boundary_flux = Some(vec![0.01, 0.02, 0.03]);
        trace.boundary_gate = Some(vec![0.1, 0.2, 0.3]);
        trace.meta_gate = Some(vec![0.0, 0.2, 0.4, 0.6]);
        let diag = threshold_crossing_diagnostics(&trace, 0.6, 4.0, None).unwrap();
        assert_eq!(diag.boundary_flux_at_crossing, Some(0.02));
        assert_eq!(diag.boundary_gate_at_crossing, Some(0.3));
        assert!((diag.meta_gate_at_crossing.unwrap() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_missing_or_mismatched_times_rejected() {
        let mut trace = ramp_trace();
        trace.t.clear();
        assert_eq!(
            threshold_crossing_diagnostics(&trace, 0.5, 4.0, None).unwrap_err(),
            ThresholdError::MissingSeries("t".to_string())
        );
        trace.t = vec![0.0, 1.0];
        assert!(matches!(
            threshold_crossing_diagnostics(&trace, 0.5, 4.0, None),
            Err(ThresholdError::LengthMismatch { .. })
        ));
        assert!(matches!(
            threshold_crossing_diagnostics(&FieldTrace::default(), 0.5, 4.0, None),
            Err(ThresholdError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_simulated_trace_crosses_theta() {
        let solver = ThresholdFieldSolver::builder(0.5, 6.0)
            .dt(0.05)
            .boundary(RobinBoundary::new(0.5))
            .build();
        let trace = solver.simulate(&constant_driver(1.0, 200), 0.0, None);
        let diag = threshold_crossing_diagnostics(&trace, 0.5, 6.0, None).unwrap();
        assert!(diag.crossed);
        let idx = diag.crossing_index.unwrap();
        assert!(trace.r[idx] >= 0.5 && trace.r[idx - 1] < 0.5);
        let t = diag.crossing_time.unwrap();
        assert!(t >= trace.t[idx - 1] && t <= trace.t[idx]);
        assert!(diag.boundary_gate_at_crossing.is_some());
        assert!(diag.boundary_flux_at_crossing.is_some());
    }
}
