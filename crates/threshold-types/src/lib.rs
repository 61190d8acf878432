// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Error hierarchy, configuration, and payload types shared by the
//! threshold-field solver and the falsification pipeline.

pub mod config;
pub mod error;
pub mod fit;
pub mod summary;

pub use config::{AnalysisConfig, BoundaryConfig, NullKind, SimulationConfig};
pub use error::{ensure_same_length, ThresholdError, ThresholdResult};
pub use fit::{FitResult, NullModelResult, NullParams};
pub use summary::{
    Comparison, CrossingDiagnostic, Estimate, FalsificationVerdict, LogisticModel, MembraneBlock,
    ResonanceSummary, SeriesStats,
};
