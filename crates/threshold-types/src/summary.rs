// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Summary Payload
// ─────────────────────────────────────────────────────────────────────
//! The nested payload emitted once per analysed trajectory:
//!
//! ```text
//! { theta_estimate, beta_estimate, logistic_model, null_models,
//!   falsification, membrane, threshold_crossing [, source] }
//! ```
//!
//! NaN and infinite values serialise as JSON `null` through `serde_json`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fit::NullModelResult;

/// Point estimate with its 95% interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub value: f64,
    pub ci95: [f64; 2],
}

/// Goodness-of-fit of the logistic hypothesis in probability space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub r2: f64,
    pub aic: f64,
    pub ss_res: f64,
    /// Estimator strategy that produced the fit, when a chain was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// Logistic fit against one null model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// `null.aic - fit.aic`; positive favours the logistic fit.
    pub delta_aic: f64,
    /// `fit.r2 - null.r2`.
    pub delta_r2: f64,
}

impl Comparison {
    pub fn logistic_wins(&self) -> bool {
        self.delta_aic > 0.0 && self.delta_r2 >= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FalsificationVerdict {
    pub logistic_beats_all_nulls: bool,
    pub comparisons: BTreeMap<String, Comparison>,
}

/// Population statistics of one trace channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub mean: f64,
    pub std: f64,
    pub peak: f64,
    pub valley: f64,
}

impl SeriesStats {
    /// `None` for an empty channel.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let peak = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let valley = values.iter().copied().fold(f64::INFINITY, f64::min);
        Some(Self {
            mean,
            std: var.sqrt(),
            peak,
            valley,
        })
    }
}

/// Membrane-side block of the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembraneBlock {
    /// Θ the trace started from (None for ingested data).
    pub theta: Option<f64>,
    pub beta: Option<f64>,
    pub zeta_mean: f64,
    pub flux_mean: f64,
    pub flux_std: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary_flux: Option<SeriesStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary_gate: Option<SeriesStats>,
}

/// First point at which R reaches a reference threshold.
///
/// Every numeric field is `None` when the trajectory never crosses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CrossingDiagnostic {
    pub crossed: bool,
    /// Reference the trajectory was scanned against (Θ at the crossing when
    /// it follows a drifting threshold).
    #[serde(rename = "threshold_R")]
    pub threshold_r: f64,
    pub crossing_index: Option<usize>,
    pub crossing_time: Option<f64>,
    #[serde(rename = "crossing_R")]
    pub crossing_r: Option<f64>,
    pub crossing_sigma: Option<f64>,
    /// `R - Θ` at the crossing sample itself.
    pub overshoot: Option<f64>,
    pub theta_at_crossing: Option<f64>,
    pub beta_at_crossing: Option<f64>,
    pub zeta_at_crossing: Option<f64>,
    pub driver_at_crossing: Option<f64>,
    pub boundary_flux_at_crossing: Option<f64>,
    pub boundary_gate_at_crossing: Option<f64>,
    pub meta_gate_at_crossing: Option<f64>,
    pub interpolated: bool,
}

/// Full verdict payload consumed by report layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResonanceSummary {
    pub theta_estimate: Estimate,
    pub beta_estimate: Estimate,
    pub logistic_model: LogisticModel,
    pub null_models: BTreeMap<String, NullModelResult>,
    pub falsification: FalsificationVerdict,
    pub membrane: Option<MembraneBlock>,
    pub threshold_crossing: Option<CrossingDiagnostic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<BTreeMap<String, String>>,
}

impl ResonanceSummary {
    /// Serialise to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            log::error!("summary serialisation failed: {e}");
            String::from("{}")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_stats_population() {
        let stats = SeriesStats::from_slice(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((stats.mean - 2.5).abs() < 1e-12);
        assert!((stats.std - 1.25f64.sqrt()).abs() < 1e-12);
        assert_eq!(stats.peak, 4.0);
        assert_eq!(stats.valley, 1.0);
    }

    #[test]
    fn test_series_stats_empty() {
        assert!(SeriesStats::from_slice(&[]).is_none());
    }

    #[test]
    fn test_comparison_tie_on_r2_still_wins() {
        let c = Comparison {
            delta_aic: 3.0,
            delta_r2: 0.0,
        };
        assert!(c.logistic_wins());
        let c = Comparison {
            delta_aic: 0.0,
            delta_r2: 0.5,
        };
        assert!(!c.logistic_wins());
    }

    #[test]
    fn test_crossing_renames_r_key() {
        let diag = CrossingDiagnostic {
            crossed: true,
            crossing_r: Some(0.4),
            ..Default::default()
        };
        let value = serde_json::to_value(&diag).unwrap();
        assert_eq!(value["crossing_R"], 0.4);
        assert!(value["crossing_time"].is_null());
    }
}
