// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Configuration
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{ThresholdError, ThresholdResult};

/// Robin boundary parameters.
///
/// The boundary gate is `σ(beta_robin · (R - Θ))`; the threshold itself is
/// taken from the simulation it is attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Steepness of the boundary gate. Default: 4.8.
    pub beta_robin: f64,
    /// Impedance with the gate closed. Default: 0.65.
    pub zeta_floor: f64,
    /// Impedance with the gate fully open. Default: 1.35.
    pub zeta_ceiling: f64,
    /// Weight of the (σ - R) leakage gap. Default: 0.35.
    pub logistic_weight: f64,
    /// Weight of the (driver - R) leakage gap. Default: 0.15.
    pub driver_weight: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            beta_robin: 4.8,
            zeta_floor: 0.65,
            zeta_ceiling: 1.35,
            logistic_weight: 0.35,
            driver_weight: 0.15,
        }
    }
}

impl BoundaryConfig {
    pub fn validate(&self) -> ThresholdResult<()> {
        for (name, value) in [
            ("beta_robin", self.beta_robin),
            ("zeta_floor", self.zeta_floor),
            ("zeta_ceiling", self.zeta_ceiling),
            ("logistic_weight", self.logistic_weight),
            ("driver_weight", self.driver_weight),
        ] {
            if !value.is_finite() {
                return Err(ThresholdError::Config(format!(
                    "boundary.{name} must be finite, got {value}"
                )));
            }
        }
        if self.zeta_ceiling < self.zeta_floor {
            return Err(ThresholdError::Config(format!(
                "boundary.zeta_ceiling ({}) must be >= zeta_floor ({})",
                self.zeta_ceiling, self.zeta_floor
            )));
        }
        Ok(())
    }
}

/// Parameters for a constant-driver membrane simulation.
///
/// The integrator itself never validates its inputs; callers run
/// [`SimulationConfig::validate`] before simulating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Critical threshold Θ. Default: 1.0.
    pub theta: f64,
    /// Logistic steepness β. Default: 8.0.
    pub beta: f64,
    /// Number of driver timesteps. Default: 240.
    pub steps: usize,
    /// Euler step size. Default: 0.05.
    pub dt: f64,
    /// Constant driver current applied at every step. Default: 0.9.
    pub driver: f64,
    /// Initial order parameter R(0). Default: 0.2.
    pub r0: f64,
    /// Impedance below Θ. Default: 0.6.
    pub resonant_gain: f64,
    /// Impedance above Θ. Default: 1.4.
    pub damped_gain: f64,
    /// Width of the impedance switch. Default: 0.35.
    pub switch_width: f64,
    /// Optional Robin boundary leakage.
    pub boundary: Option<BoundaryConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            theta: 1.0,
            beta: 8.0,
            steps: 240,
            dt: 0.05,
            driver: 0.9,
            r0: 0.2,
            resonant_gain: 0.6,
            damped_gain: 1.4,
            switch_width: 0.35,
            boundary: None,
        }
    }
}

impl SimulationConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> ThresholdResult<()> {
        for (name, value) in [
            ("theta", self.theta),
            ("beta", self.beta),
            ("driver", self.driver),
            ("r0", self.r0),
            ("resonant_gain", self.resonant_gain),
            ("damped_gain", self.damped_gain),
        ] {
            if !value.is_finite() {
                return Err(ThresholdError::Config(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(ThresholdError::Config(format!(
                "dt must be > 0, got {}",
                self.dt
            )));
        }
        if self.steps == 0 {
            return Err(ThresholdError::Config("steps must be >= 1".to_string()));
        }
        if !(self.switch_width > 0.0 && self.switch_width.is_finite()) {
            return Err(ThresholdError::Config(format!(
                "switch_width must be > 0, got {}",
                self.switch_width
            )));
        }
        if let Some(boundary) = &self.boundary {
            boundary.validate()?;
        }
        Ok(())
    }

    /// Load from JSON string.
    pub fn from_json(json: &str) -> ThresholdResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ThresholdError::Config(format!("JSON parse error: {e}")))
    }
}

/// Named null-model alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullKind {
    /// Affine `σ = m·R + b` in probability space.
    Linear,
    /// `σ = A·R^k` on the R > 0 samples.
    PowerLaw,
}

impl NullKind {
    pub fn name(&self) -> &'static str {
        match self {
            NullKind::Linear => "linear",
            NullKind::PowerLaw => "power_law",
        }
    }
}

/// Settings for the fit → null bank → verdict pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Null models the logistic fit must beat. Default: linear + power law.
    pub nulls: Vec<NullKind>,
    /// Reference R for crossing diagnostics. `None` uses Θ.
    pub threshold_r: Option<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            nulls: vec![NullKind::Linear, NullKind::PowerLaw],
            threshold_r: None,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> ThresholdResult<()> {
        if let Some(threshold) = self.threshold_r {
            if !threshold.is_finite() {
                return Err(ThresholdError::Config(format!(
                    "threshold_r must be finite, got {threshold}"
                )));
            }
        }
        let mut seen = self.nulls.clone();
        seen.sort();
        seen.dedup();
        if seen.len() != self.nulls.len() {
            return Err(ThresholdError::Config(
                "nulls must not repeat a model".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> ThresholdResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ThresholdError::Config(format!("JSON parse error: {e}")))
    }
}
