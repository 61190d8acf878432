// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Coupling Kernels
// ─────────────────────────────────────────────────────────────────────
//! Optional auxiliary "meaning" field injected into the flux equation.
//!
//! A kernel sees the current membrane state and returns the drift of the
//! meaning field together with an additive coupling term. The solver owns
//! the meaning value; kernels are pure.

use crate::logistic::logistic_response;

/// Membrane state handed to a kernel at one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CouplingInput {
    pub r: f64,
    pub sigma: f64,
    pub driver: f64,
    pub meaning: f64,
    pub zeta: f64,
    pub t: f64,
    pub dt: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CouplingOutput {
    /// d(meaning)/dt.
    pub meaning_drift: f64,
    /// Additive flux contribution.
    pub coupling: f64,
}

/// Trait for coupling kernels.
pub trait CouplingKernel: Send + Sync {
    fn couple(&self, input: &CouplingInput) -> CouplingOutput;
}

/// Zero drift and zero coupling. Tracks meaning without moving it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentKernel;

impl CouplingKernel for SilentKernel {
    fn couple(&self, _input: &CouplingInput) -> CouplingOutput {
        CouplingOutput::default()
    }
}

/// Semantic pressure that switches on as R nears Θ.
///
/// ```text
/// g        = σ(β(R - Θ))
/// drift    = relax·(g(σ - m) + (1 - g)·w_d(driver - m)) + w_ζ(ζ - 1)
/// coupling = bias·g·(m - R) + (1 - bias)(σ - m)
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemanticResonanceKernel {
    pub theta: f64,
    pub beta: f64,
    pub meaning_relaxation: f64,
    pub resonance_bias: f64,
    pub driver_weight: f64,
    pub impedance_weight: f64,
}

impl SemanticResonanceKernel {
    /// Defaults: relaxation 1.1, bias 0.6, driver weight 0.35, impedance weight 0.25.
    pub fn new(theta: f64, beta: f64) -> Self {
        Self {
            theta,
            beta,
            meaning_relaxation: 1.1,
            resonance_bias: 0.6,
            driver_weight: 0.35,
            impedance_weight: 0.25,
        }
    }
}

impl CouplingKernel for SemanticResonanceKernel {
    fn couple(&self, input: &CouplingInput) -> CouplingOutput {
        let gate = logistic_response(input.r, self.theta, self.beta);
        let alignment = input.sigma - input.meaning;
        let driver_pull = input.driver - input.meaning;

        let meaning_drift = self.meaning_relaxation
            * (gate * alignment + (1.0 - gate) * self.driver_weight * driver_pull)
            + self.impedance_weight * (input.zeta - 1.0);
        let coupling = self.resonance_bias * gate * (input.meaning - input.r)
            + (1.0 - self.resonance_bias) * alignment;

        CouplingOutput {
            meaning_drift,
            coupling,
        }
    }
}

type CoupleFn = Box<dyn Fn(&CouplingInput) -> CouplingOutput + Send + Sync>;

/// Kernel backed by a caller-supplied closure.
pub struct ExternalKernel {
    couple_fn: CoupleFn,
}

impl ExternalKernel {
    pub fn new(
        couple_fn: impl Fn(&CouplingInput) -> CouplingOutput + Send + Sync + 'static,
    ) -> Self {
        Self {
            couple_fn: Box::new(couple_fn),
        }
    }
}

impl CouplingKernel for ExternalKernel {
    fn couple(&self, input: &CouplingInput) -> CouplingOutput {
        (self.couple_fn)(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(r: f64, meaning: f64) -> CouplingInput {
        CouplingInput {
            r,
            sigma: 0.5,
            driver: 0.9,
            meaning,
            zeta: 1.0,
            t: 0.0,
            dt: 0.05,
        }
    }

    #[test]
    fn test_silent_kernel() {
        let out = SilentKernel.couple(&input(0.3, 0.2));
        assert_eq!(out, CouplingOutput::default());
    }

    #[test]
    fn test_semantic_kernel_at_threshold() {
        let kernel = SemanticResonanceKernel::new(0.3, 6.0);
        let out = kernel.couple(&input(0.3, 0.2));
        // g = 0.5, alignment = 0.3, driver pull = 0.7, ζ - 1 = 0
        let drift = 1.1 * (0.5 * 0.3 + 0.5 * 0.35 * 0.7);
        let coupling = 0.6 * 0.5 * (0.2 - 0.3) + 0.4 * 0.3;
        assert!((out.meaning_drift - drift).abs() < 1e-12);
        assert!((out.coupling - coupling).abs() < 1e-12);
    }

    #[test]
    fn test_semantic_kernel_impedance_push() {
        let kernel = SemanticResonanceKernel::new(0.3, 6.0);
        let base = kernel.couple(&input(0.3, 0.2));
        let stiff = kernel.couple(&CouplingInput {
            zeta: 1.4,
            ..input(0.3, 0.2)
        });
        assert!((stiff.meaning_drift - base.meaning_drift - 0.25 * 0.4).abs() < 1e-12);
        assert_eq!(stiff.coupling, base.coupling);
    }

    #[test]
    fn test_external_kernel() {
        let kernel = ExternalKernel::new(|i| CouplingOutput {
            meaning_drift: i.t,
            coupling: 0.42,
        });
        let out = kernel.couple(&CouplingInput {
            t: 3.0,
            ..input(0.0, 0.0)
        });
        assert_eq!(out.meaning_drift, 3.0);
        assert!((out.coupling - 0.42).abs() < 1e-9);
    }
}
