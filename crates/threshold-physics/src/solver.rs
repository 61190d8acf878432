// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Threshold Field Solver
// ─────────────────────────────────────────────────────────────────────
//! Fixed-step explicit Euler integrator for the membrane equation:
//!
//!   dR/dt = J(t) + C(t) + B(R, σ, J) - ζ(R)·(R - σ(R)),   σ = 1/(1+e^{-β(R-Θ)})
//!
//! J is the driver, C an optional coupling term, B an optional Robin
//! leakage. No stability guard is applied: a non-positive `dt` or
//! non-finite input propagates NaN/Inf through the arithmetic.
//!
//! The solver is immutable. Everything that evolves between steps
//! (impedance memory, meaning field, adaptive Θ/β) lives in [`FieldState`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use threshold_types::{
    ensure_same_length, SeriesStats, SimulationConfig, ThresholdError, ThresholdResult,
};

use crate::adaptive::{AdaptiveThresholdController, ControllerState};
use crate::coupling::{CouplingInput, CouplingKernel, SilentKernel};
use crate::impedance::{ImpedanceModel, ImpedanceState, RobinBoundary, StaticBlend, UnitImpedance};
use crate::logistic::logistic_response;

/// Snapshot of the membrane between two steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldState {
    pub t: f64,
    pub r: f64,
    pub sigma: f64,
    pub zeta: f64,
    pub theta: f64,
    pub beta: f64,
    /// Auxiliary meaning field, present when coupling is active.
    pub meaning: Option<f64>,
    pub impedance: ImpedanceState,
    /// Adaptive (Θ, β), present when a controller is attached.
    pub controller: Option<ControllerState>,
}

/// Flux-like quantities produced by one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub flux: f64,
    pub driver: f64,
    pub coupling: Option<f64>,
    pub boundary_flux: Option<f64>,
    /// Boundary gate at the pre-step R.
    pub boundary_gate: Option<f64>,
    pub meta_gate: Option<f64>,
    pub theta_shift: Option<f64>,
    pub beta_shift: Option<f64>,
}

/// Time-aligned arrays from a simulation, or observed (R, σ) pairs.
///
/// State arrays (`t`, `R`, `sigma`, `zeta`, `theta`, `beta`, `meaning`,
/// `meta_gate`) hold `steps + 1` samples; flux-like arrays hold `steps`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldTrace {
    pub t: Vec<f64>,
    #[serde(rename = "R")]
    pub r: Vec<f64>,
    pub sigma: Vec<f64>,
    pub zeta: Vec<f64>,
    pub flux: Vec<f64>,
    pub driver: Vec<f64>,
    pub theta: Vec<f64>,
    pub beta: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meaning: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupling: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundary_flux: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundary_gate: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_gate: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theta_shift: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta_shift: Option<Vec<f64>>,
}

impl FieldTrace {
    /// Wrap observed (R, σ) pairs for the ingest path.
    pub fn from_observations(r: Vec<f64>, sigma: Vec<f64>) -> ThresholdResult<Self> {
        ensure_same_length(r.len(), sigma.len())?;
        Ok(Self {
            r,
            sigma,
            ..Default::default()
        })
    }

    /// Attach sample times so crossing diagnostics can run on observations.
    pub fn with_times(mut self, t: Vec<f64>) -> ThresholdResult<Self> {
        ensure_same_length(self.r.len(), t.len())?;
        self.t = t;
        Ok(self)
    }

    /// Number of integration steps (flux samples).
    pub fn steps(&self) -> usize {
        self.flux.len()
    }

    /// Deserialise; parse failures are reported as `ThresholdError::Config`.
    pub fn from_json(json: &str) -> ThresholdResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ThresholdError::Config(format!("trace JSON parse error: {e}")))
    }
}

/// Builder for [`ThresholdFieldSolver`].
pub struct SolverBuilder {
    theta: f64,
    beta: f64,
    dt: f64,
    impedance: Option<Arc<dyn ImpedanceModel>>,
    coupling: Option<Arc<dyn CouplingKernel>>,
    boundary: Option<RobinBoundary>,
    controller: Option<AdaptiveThresholdController>,
}

impl SolverBuilder {
    /// Euler step. Default: 0.1.
    pub fn dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn impedance(self, model: impl ImpedanceModel + 'static) -> Self {
        self.impedance_arc(Arc::new(model))
    }

    pub fn impedance_arc(mut self, model: Arc<dyn ImpedanceModel>) -> Self {
        self.impedance = Some(model);
        self
    }

    pub fn coupling(mut self, kernel: impl CouplingKernel + 'static) -> Self {
        self.coupling = Some(Arc::new(kernel));
        self
    }

    pub fn boundary(mut self, boundary: RobinBoundary) -> Self {
        self.boundary = Some(boundary);
        self
    }

    /// Attach adaptive Θ/β. The controller's baselines replace the solver's Θ/β.
    pub fn controller(mut self, controller: AdaptiveThresholdController) -> Self {
        self.theta = controller.theta_baseline;
        self.beta = controller.beta_baseline;
        self.controller = Some(controller);
        self
    }

    pub fn build(self) -> ThresholdFieldSolver {
        let impedance: Arc<dyn ImpedanceModel> = match (self.impedance, self.boundary) {
            (Some(model), _) => model,
            (None, Some(boundary)) => Arc::new(boundary),
            (None, None) => Arc::new(UnitImpedance),
        };
        ThresholdFieldSolver {
            theta: self.theta,
            beta: self.beta,
            dt: self.dt,
            impedance,
            coupling: self.coupling,
            boundary: self.boundary,
            controller: self.controller,
        }
    }
}

/// Discrete membrane integrator.
pub struct ThresholdFieldSolver {
    theta: f64,
    beta: f64,
    dt: f64,
    impedance: Arc<dyn ImpedanceModel>,
    coupling: Option<Arc<dyn CouplingKernel>>,
    boundary: Option<RobinBoundary>,
    controller: Option<AdaptiveThresholdController>,
}

impl ThresholdFieldSolver {
    pub fn builder(theta: f64, beta: f64) -> SolverBuilder {
        SolverBuilder {
            theta,
            beta,
            dt: 0.1,
            impedance: None,
            coupling: None,
            boundary: None,
            controller: None,
        }
    }

    /// Unit impedance, no coupling, no boundary.
    pub fn new(theta: f64, beta: f64, dt: f64) -> Self {
        Self::builder(theta, beta).dt(dt).build()
    }

    /// Static-blend impedance around Θ, plus a Robin boundary when configured.
    ///
    /// The configuration is not validated here.
    pub fn from_config(config: &SimulationConfig) -> Self {
        let blend = StaticBlend {
            theta: config.theta,
            resonant_gain: config.resonant_gain,
            damped_gain: config.damped_gain,
            switch_width: config.switch_width,
        };
        let mut builder = Self::builder(config.theta, config.beta)
            .dt(config.dt)
            .impedance(blend);
        if let Some(boundary) = &config.boundary {
            builder = builder.boundary(RobinBoundary::from_config(config.theta, boundary));
        }
        builder.build()
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn impedance_model(&self) -> &dyn ImpedanceModel {
        self.impedance.as_ref()
    }

    pub fn boundary(&self) -> Option<&RobinBoundary> {
        self.boundary.as_ref()
    }

    pub fn controller(&self) -> Option<&AdaptiveThresholdController> {
        self.controller.as_ref()
    }

    fn meaning_active(&self, meaning0: Option<f64>) -> bool {
        self.coupling.is_some() || meaning0.is_some()
    }

    /// State at `t = 0`. The impedance model consumes R0 as its first sample.
    pub fn initial_state(&self, r0: f64, meaning0: Option<f64>) -> FieldState {
        let controller = self.controller.as_ref().map(|c| c.baseline_state());
        let (theta, beta) = controller
            .map(|c| (c.theta, c.beta))
            .unwrap_or((self.theta, self.beta));
        let (impedance, zeta) = self
            .impedance
            .evaluate(self.impedance.baseline_state(), r0, self.dt);
        FieldState {
            t: 0.0,
            r: r0,
            sigma: logistic_response(r0, theta, beta),
            zeta,
            theta,
            beta,
            meaning: self
                .meaning_active(meaning0)
                .then(|| meaning0.unwrap_or(0.0)),
            impedance,
            controller,
        }
    }

    /// Advance one Euler step under `driver`.
    pub fn step(&self, state: &FieldState, driver: f64) -> (FieldState, StepRecord) {
        let dt = self.dt;
        let r = state.r;
        let sigma = state.sigma;
        let zeta = state.zeta;

        let (boundary_flux, boundary_gate) = match &self.boundary {
            Some(b) => (Some(b.flux_value(r, sigma, driver)), Some(b.gate_value(r))),
            None => (None, None),
        };

        let (meaning, coupling) = match state.meaning {
            Some(m) => {
                let input = CouplingInput {
                    r,
                    sigma,
                    driver,
                    meaning: m,
                    zeta,
                    t: state.t,
                    dt,
                };
                let out = match &self.coupling {
                    Some(kernel) => kernel.couple(&input),
                    None => SilentKernel.couple(&input),
                };
                (Some(m + dt * out.meaning_drift), Some(out.coupling))
            }
            None => (None, None),
        };

        let flux = driver + coupling.unwrap_or(0.0) + boundary_flux.unwrap_or(0.0)
            - zeta * (r - sigma);
        let r_next = r + dt * flux;
        let (impedance, zeta_next) = self.impedance.evaluate(state.impedance, r_next, dt);

        let mut theta = state.theta;
        let mut beta = state.beta;
        let mut controller = state.controller;
        let mut report = None;
        if let Some(ctrl) = &self.controller {
            let current = state.controller.unwrap_or(ControllerState { theta, beta });
            let sigma_pre = logistic_response(r_next, theta, beta);
            let (next, rep) = ctrl.update(&current, r_next, sigma_pre, driver, zeta, dt);
            theta = next.theta;
            beta = next.beta;
            controller = Some(next);
            report = Some(rep);
        }

        let next = FieldState {
            t: state.t + dt,
            r: r_next,
            sigma: logistic_response(r_next, theta, beta),
            zeta: zeta_next,
            theta,
            beta,
            meaning,
            impedance,
            controller,
        };
        let record = StepRecord {
            flux,
            driver,
            coupling,
            boundary_flux,
            boundary_gate,
            meta_gate: report.map(|r| r.meta_gate),
            theta_shift: report.map(|r| r.theta_shift),
            beta_shift: report.map(|r| r.beta_shift),
        };
        (next, record)
    }

    /// Run the whole driver sequence from `r0`.
    pub fn simulate(&self, drivers: &[f64], r0: f64, meaning0: Option<f64>) -> FieldTrace {
        let steps = drivers.len();
        let mut state = self.initial_state(r0, meaning0);
        let mut trace = FieldTrace {
            t: Vec::with_capacity(steps + 1),
            r: Vec::with_capacity(steps + 1),
            sigma: Vec::with_capacity(steps + 1),
            zeta: Vec::with_capacity(steps + 1),
            flux: Vec::with_capacity(steps),
            driver: Vec::with_capacity(steps),
            theta: Vec::with_capacity(steps + 1),
            beta: Vec::with_capacity(steps + 1),
            meaning: state.meaning.map(|_| Vec::with_capacity(steps + 1)),
            coupling: state.meaning.map(|_| Vec::with_capacity(steps)),
            boundary_flux: self.boundary.map(|_| Vec::with_capacity(steps)),
            boundary_gate: self.boundary.map(|_| Vec::with_capacity(steps)),
            meta_gate: self.controller.map(|_| Vec::with_capacity(steps + 1)),
            theta_shift: self.controller.map(|_| Vec::with_capacity(steps)),
            beta_shift: self.controller.map(|_| Vec::with_capacity(steps)),
        };

        push_state(&mut trace, &state);
        if let (Some(ctrl), Some(gates), Some(cs)) =
            (&self.controller, trace.meta_gate.as_mut(), state.controller.as_ref())
        {
            gates.push(ctrl.meta_gate(cs, state.r));
        }

        for (k, &driver) in drivers.iter().enumerate() {
            let (mut next, record) = self.step(&state, driver);
            next.t = (k + 1) as f64 * self.dt;
            push_record(&mut trace, &record);
            push_state(&mut trace, &next);
            state = next;
        }

        if !state.r.is_finite() {
            log::warn!(
                "simulate: R diverged to {} after {steps} steps (dt={})",
                state.r,
                self.dt
            );
        }
        log::debug!(
            "simulate: {steps} steps, impedance={}, R_final={:.6}",
            self.impedance.name(),
            state.r
        );
        trace
    }
}

fn push_state(trace: &mut FieldTrace, state: &FieldState) {
    trace.t.push(state.t);
    trace.r.push(state.r);
    trace.sigma.push(state.sigma);
    trace.zeta.push(state.zeta);
    trace.theta.push(state.theta);
    trace.beta.push(state.beta);
    if let (Some(series), Some(m)) = (trace.meaning.as_mut(), state.meaning) {
        series.push(m);
    }
}

fn push_record(trace: &mut FieldTrace, record: &StepRecord) {
    trace.flux.push(record.flux);
    trace.driver.push(record.driver);
    let optional = [
        (&mut trace.coupling, record.coupling),
        (&mut trace.boundary_flux, record.boundary_flux),
        (&mut trace.boundary_gate, record.boundary_gate),
        (&mut trace.meta_gate, record.meta_gate),
        (&mut trace.theta_shift, record.theta_shift),
        (&mut trace.beta_shift, record.beta_shift),
    ];
    for (series, value) in optional {
        if let (Some(series), Some(value)) = (series.as_mut(), value) {
            series.push(value);
        }
    }
}

/// Scalar aggregates of a trace, for quick provenance checks and fit seeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembraneSummary {
    #[serde(rename = "R_final")]
    pub r_final: f64,
    pub sigma_peak: f64,
    pub sigma_valley: f64,
    pub zeta_mean: f64,
    pub flux_mean: f64,
    pub flux_std: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theta_final: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theta: Option<SeriesStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta_final: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<SeriesStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meaning: Option<SeriesStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupling: Option<SeriesStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundary_flux: Option<SeriesStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundary_gate: Option<SeriesStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_gate: Option<SeriesStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theta_shift: Option<SeriesStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta_shift: Option<SeriesStats>,
}

/// Summarise a trace. Empty channels report NaN (R, σ) or zero (ζ, flux).
pub fn export_summary(trace: &FieldTrace) -> MembraneSummary {
    let flux = SeriesStats::from_slice(&trace.flux);
    let sigma = SeriesStats::from_slice(&trace.sigma);
    let optional = |series: &Option<Vec<f64>>| series.as_deref().and_then(SeriesStats::from_slice);

    MembraneSummary {
        r_final: trace.r.last().copied().unwrap_or(f64::NAN),
        sigma_peak: sigma.map_or(f64::NAN, |s| s.peak),
        sigma_valley: sigma.map_or(f64::NAN, |s| s.valley),
        zeta_mean: SeriesStats::from_slice(&trace.zeta).map_or(0.0, |s| s.mean),
        flux_mean: flux.map_or(0.0, |s| s.mean),
        flux_std: flux.map_or(0.0, |s| s.std),
        theta_final: trace.theta.last().copied(),
        theta: SeriesStats::from_slice(&trace.theta),
        beta_final: trace.beta.last().copied(),
        beta: SeriesStats::from_slice(&trace.beta),
        meaning: optional(&trace.meaning),
        coupling: optional(&trace.coupling),
        boundary_flux: optional(&trace.boundary_flux),
        boundary_gate: optional(&trace.boundary_gate),
        meta_gate: optional(&trace.meta_gate),
        theta_shift: optional(&trace.theta_shift),
        beta_shift: optional(&trace.beta_shift),
    }
}
