// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Cohort Batch Runner
// ─────────────────────────────────────────────────────────────────────
//! Run many simulate/ingest jobs through one pipeline and keep a ledger.
//!
//! Each run appends a compact [`CohortRecord`]; [`BatchRunner::cohort_summary`]
//! aggregates the ledger into verdict tallies and parameter statistics.
//! Runs execute from `&self`, so one runner can be shared across threads.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use threshold_physics::FieldTrace;
use threshold_types::{ResonanceSummary, SimulationConfig, ThresholdResult};

use crate::pipeline::ResonancePipeline;

/// One unit of batch work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchInput {
    Simulate {
        label: String,
        config: SimulationConfig,
    },
    Ingest {
        label: String,
        trace: FieldTrace,
    },
}

impl BatchInput {
    pub fn label(&self) -> &str {
        match self {
            BatchInput::Simulate { label, .. } | BatchInput::Ingest { label, .. } => label,
        }
    }

    fn origin(&self) -> &'static str {
        match self {
            BatchInput::Simulate { .. } => "simulation",
            BatchInput::Ingest { .. } => "ingest",
        }
    }
}

/// Ledger entry for a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRecord {
    pub label: String,
    pub origin: String,
    pub theta: f64,
    pub beta: f64,
    pub r2: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub logistic_beats_all_nulls: bool,
    pub delta_aic: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crossed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crossing_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zeta_mean: Option<f64>,
}

impl CohortRecord {
    fn from_summary(input: &BatchInput, summary: &ResonanceSummary) -> Self {
        let crossing = summary.threshold_crossing.as_ref();
        Self {
            label: input.label().to_string(),
            origin: input.origin().to_string(),
            theta: summary.theta_estimate.value,
            beta: summary.beta_estimate.value,
            r2: summary.logistic_model.r2,
            method: summary.logistic_model.method.clone(),
            logistic_beats_all_nulls: summary.falsification.logistic_beats_all_nulls,
            delta_aic: summary
                .falsification
                .comparisons
                .iter()
                .map(|(name, c)| (name.clone(), c.delta_aic))
                .collect(),
            crossed: crossing.map(|c| c.crossed),
            crossing_time: crossing.and_then(|c| c.crossing_time),
            zeta_mean: summary.membrane.as_ref().map(|m| m.zeta_mean),
        }
    }
}

/// Order statistics over the finite values of one ledger column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CohortStats {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl CohortStats {
    /// Non-finite values (degenerate fits, perfect-fit ΔAIC) are skipped.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut finite: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }
        finite.sort_by(f64::total_cmp);
        let n = finite.len();
        let median = if n % 2 == 1 {
            finite[n / 2]
        } else {
            0.5 * (finite[n / 2 - 1] + finite[n / 2])
        };
        Some(Self {
            mean: finite.iter().sum::<f64>() / n as f64,
            median,
            min: finite[0],
            max: finite[n - 1],
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    pub count: usize,
    /// Runs where the logistic fit beat every null.
    pub supported: usize,
    pub rejected: usize,
    pub theta: Option<CohortStats>,
    pub beta: Option<CohortStats>,
    pub r2: Option<CohortStats>,
    /// Per null model.
    pub delta_aic: BTreeMap<String, CohortStats>,
    pub zeta_mean: Option<CohortStats>,
    pub crossed_count: usize,
    /// Fraction of runs with crossing diagnostics that crossed; `None` if
    /// no run had a time axis.
    pub crossed_fraction: Option<f64>,
}

impl CohortSummary {
    pub fn from_records(records: &[CohortRecord]) -> Self {
        let supported = records.iter().filter(|r| r.logistic_beats_all_nulls).count();
        let mut delta_columns: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for record in records {
            for (name, &delta) in &record.delta_aic {
                delta_columns.entry(name.clone()).or_default().push(delta);
            }
        }
        let diagnosed: Vec<bool> = records.iter().filter_map(|r| r.crossed).collect();
        let crossed_count = diagnosed.iter().filter(|&&c| c).count();
        Self {
            count: records.len(),
            supported,
            rejected: records.len() - supported,
            theta: CohortStats::from_values(records.iter().map(|r| r.theta)),
            beta: CohortStats::from_values(records.iter().map(|r| r.beta)),
            r2: CohortStats::from_values(records.iter().map(|r| r.r2)),
            delta_aic: delta_columns
                .into_iter()
                .filter_map(|(name, values)| CohortStats::from_values(values).map(|s| (name, s)))
                .collect(),
            zeta_mean: CohortStats::from_values(records.iter().filter_map(|r| r.zeta_mean)),
            crossed_count,
            crossed_fraction: (!diagnosed.is_empty())
                .then(|| crossed_count as f64 / diagnosed.len() as f64),
        }
    }
}

/// Pipeline plus a thread-safe run ledger.
pub struct BatchRunner {
    pipeline: ResonancePipeline,
    ledger: Mutex<Vec<CohortRecord>>,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new(ResonancePipeline::default())
    }
}

impl BatchRunner {
    pub fn new(pipeline: ResonancePipeline) -> Self {
        Self {
            pipeline,
            ledger: Mutex::new(Vec::new()),
        }
    }

    pub fn pipeline(&self) -> &ResonancePipeline {
        &self.pipeline
    }

    /// Run one input and record it. Failed runs are not recorded.
    pub fn execute(&self, input: &BatchInput) -> ThresholdResult<ResonanceSummary> {
        let mut summary = match input {
            BatchInput::Simulate { config, .. } => self.pipeline.run_simulated(config)?,
            BatchInput::Ingest { trace, .. } => self.pipeline.analyse(trace)?,
        };
        summary
            .source
            .get_or_insert_with(BTreeMap::new)
            .insert("label".to_string(), input.label().to_string());

        let record = CohortRecord::from_summary(input, &summary);
        log::info!(
            "{} [{}]: Θ={:.4} β={:.4} R²={:.4} ΔAIC={:?} supported={}",
            record.label,
            record.origin,
            record.theta,
            record.beta,
            record.r2,
            record.delta_aic,
            record.logistic_beats_all_nulls
        );
        self.ledger.lock().push(record);
        Ok(summary)
    }

    /// Run every input in order; one result per input.
    pub fn execute_all(&self, inputs: &[BatchInput]) -> Vec<ThresholdResult<ResonanceSummary>> {
        inputs
            .iter()
            .map(|input| {
                let result = self.execute(input);
                if let Err(e) = &result {
                    log::warn!("{}: run failed: {e}", input.label());
                }
                result
            })
            .collect()
    }

    /// Snapshot of the ledger.
    pub fn records(&self) -> Vec<CohortRecord> {
        self.ledger.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.ledger.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.lock().is_empty()
    }

    pub fn clear(&self) {
        self.ledger.lock().clear();
    }

    pub fn cohort_summary(&self) -> CohortSummary {
        CohortSummary::from_records(&self.ledger.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use threshold_physics::{linspace, logistic_response_all};
    use threshold_types::{BoundaryConfig, ThresholdError};

    fn simulate(label: &str, theta: f64) -> BatchInput {
        BatchInput::Simulate {
            label: label.to_string(),
            config: SimulationConfig {
                theta,
                steps: 120,
                ..Default::default()
            },
        }
    }

    fn ingest(label: &str) -> BatchInput {
        let r = linspace(-1.0, 2.0, 40);
        let sigma = logistic_response_all(&r, 0.5, 4.0);
        BatchInput::Ingest {
            label: label.to_string(),
            trace: FieldTrace::from_observations(r, sigma).unwrap(),
        }
    }

    #[test]
    fn test_execute_records_run() {
        let runner = BatchRunner::default();
        let summary = runner.execute(&simulate("baseline", 1.0)).unwrap();
        assert_eq!(summary.source.as_ref().unwrap()["label"], "baseline");
        let records = runner.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].origin, "simulation");
        assert!((records[0].theta - 1.0).abs() < 0.05);
        assert_eq!(records[0].crossed, Some(true));
        assert!(records[0].delta_aic.contains_key("linear"));
    }

    #[test]
    fn test_failed_run_not_recorded() {
        let runner = BatchRunner::default();
        let bad = BatchInput::Simulate {
            label: "bad".to_string(),
            config: SimulationConfig {
                steps: 0,
                ..Default::default()
            },
        };
        let results = runner.execute_all(&[bad, ingest("obs")]);
        assert!(matches!(results[0], Err(ThresholdError::Config(_))));
        assert!(results[1].is_ok());
        assert_eq!(runner.len(), 1);
        assert_eq!(runner.records()[0].crossed, None);
    }

    #[test]
    fn test_cohort_summary_aggregates() {
        let runner = BatchRunner::default();
        for (i, theta) in [0.8, 1.0, 1.2].iter().enumerate() {
            runner.execute(&simulate(&format!("run-{i}"), *theta)).unwrap();
        }
        runner.execute(&ingest("obs")).unwrap();
        let cohort = runner.cohort_summary();
        assert_eq!(cohort.count, 4);
        assert_eq!(cohort.supported + cohort.rejected, 4);
        let theta = cohort.theta.unwrap();
        assert!(theta.min < theta.median && theta.median < theta.max);
        assert_eq!(cohort.crossed_count, 3);
        assert_eq!(cohort.crossed_fraction, Some(1.0));
        assert!(cohort.zeta_mean.is_some());
        assert!(cohort.delta_aic.contains_key("power_law"));
    }

    #[test]
    fn test_cohort_stats_skip_non_finite() {
        let stats = CohortStats::from_values([1.0, f64::NAN, 3.0, f64::INFINITY, 2.0]).unwrap();
        assert_eq!(stats.median, 2.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert!((stats.mean - 2.0).abs() < 1e-12);
        assert!(CohortStats::from_values([f64::NAN]).is_none());
    }

    #[test]
    fn test_empty_cohort() {
        let cohort = BatchRunner::default().cohort_summary();
        assert_eq!(cohort.count, 0);
        assert!(cohort.theta.is_none());
        assert_eq!(cohort.crossed_fraction, None);
    }

    #[test]
    fn test_runner_shared_across_threads() {
        let runner = BatchRunner::default();
        std::thread::scope(|scope| {
            for i in 0..4 {
                let runner = &runner;
                scope.spawn(move || {
                    let input = BatchInput::Simulate {
                        label: format!("thread-{i}"),
                        config: SimulationConfig {
                            steps: 80,
                            boundary: (i % 2 == 0).then(BoundaryConfig::default),
                            ..Default::default()
                        },
                    };
                    runner.execute(&input).unwrap();
                });
            }
        });
        assert_eq!(runner.len(), 4);
        runner.clear();
        assert!(runner.is_empty());
    }

    #[test]
    fn test_batch_input_from_json() {
        let input: BatchInput =
            serde_json::from_str(r#"{"kind": "simulate", "label": "j", "config": {"steps": 30}}"#)
                .unwrap();
        assert_eq!(input.label(), "j");
        match input {
            BatchInput::Simulate { config, .. } => assert_eq!(config.steps, 30),
            other => panic!("unexpected input: {other:?}"),
        }
    }
}
