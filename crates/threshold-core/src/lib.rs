// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Estimation & Falsification Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Recover (Θ, β) from observed or simulated (R, σ) pairs and test the
//! logistic threshold hypothesis against non-threshold nulls.
//!
//! # Error Model
//!
//! 1. **Hard input problems are errors**: empty or mismatched sequences,
//!    a power-law null with no R > 0, a missing time axis for crossing
//!    diagnostics, invalid configuration.
//!
//! 2. **Numeric degeneracy is not**: a constant R fits to `β = 0`,
//!    `Θ = NaN`; a perfect fit reports `AIC = -∞` and therefore
//!    `ΔAIC = +∞` against every null. Both are logged at `warn`.
//!
//! 3. **Estimator fallback is explicit**: [`EstimatorChain`] reports the
//!    strategy that produced the fit and why each earlier one failed.

pub mod batch;
pub mod crossing;
pub mod estimator;
pub mod judge;
pub mod metrics;
pub mod nulls;
pub mod pipeline;
pub mod strategy;

pub use batch::{BatchInput, BatchRunner, CohortRecord, CohortStats, CohortSummary};
pub use crossing::threshold_crossing_diagnostics;
pub use estimator::fit_threshold_parameters;
pub use judge::{assemble_summary, judge_falsification};
pub use nulls::{
    evaluate_null_model, evaluate_power_law_null, null_model_for, LinearNull, NullModel,
    NullModelBank, PowerLawNull,
};
pub use pipeline::ResonancePipeline;
pub use strategy::{
    ChainedFit, EstimatorChain, EstimatorStrategy, ExternalStrategy, FailureReason,
    GaussNewtonLogistic, LogitLinear, StrategyFailure,
};
