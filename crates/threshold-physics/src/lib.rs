// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Membrane Physics
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Threshold-field physics: logistic core, impedance strategies,
//! coupling kernels, the Euler field solver, adaptive Θ/β control,
//! and the recursive potential cascade.

pub mod adaptive;
pub mod cascade;
pub mod coherence;
pub mod coupling;
pub mod driver;
pub mod impedance;
pub mod logistic;
pub mod solver;

pub use adaptive::{AdaptiveThresholdController, ControllerReport, ControllerState};
pub use cascade::{CascadeBeat, CascadeState, CascadeSummary, PotentialCascade};
pub use coherence::{mandala_coherence, CoherenceGate, MandalaCoherence};
pub use coupling::{
    CouplingInput, CouplingKernel, CouplingOutput, ExternalKernel, SemanticResonanceKernel,
    SilentKernel,
};
pub use driver::{build_driver, constant_driver, linspace, DriverConfig};
pub use impedance::{
    smooth_impedance_profile, HystereticMotif, ImpedanceModel, ImpedanceState, MotifSummary,
    MotifTrace, RobinBoundary, StaticBlend, UnitImpedance,
};
pub use logistic::{logistic_impedance_gate, logistic_response, logistic_response_all, logit, logit_all};
pub use solver::{export_summary, FieldState, FieldTrace, MembraneSummary, StepRecord, ThresholdFieldSolver};
