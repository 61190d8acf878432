// ─────────────────────────────────────────────────────────────────────
// Threshold Field Kernel — Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all threshold-field failures.
///
/// Only hard input problems surface here. Numeric degeneracy (zero-slope
/// fits, perfect fits) is reported through NaN / ±∞ sentinels instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
    /// An input sequence had no samples.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Paired sequences disagree in length.
    #[error("length mismatch: {left} vs {right} samples")]
    LengthMismatch { left: usize, right: usize },

    /// Power-law null needs at least one sample with R > 0.
    #[error("power-law null requires at least one sample with R > 0")]
    NoPositiveSamples,

    /// A least-squares design could not be solved (non-finite samples).
    #[error("singular design: {0}")]
    SingularDesign(String),

    /// Every estimator strategy in a fallback chain failed.
    #[error("estimation failed: {0}")]
    Estimation(String),

    /// A required trace array is absent or empty.
    #[error("missing series: {0}")]
    MissingSeries(String),

    /// Configuration or JSON payload error.
    #[error("config error: {0}")]
    Config(String),
}

pub type ThresholdResult<T> = Result<T, ThresholdError>;

/// Reject paired sequences of unequal length.
pub fn ensure_same_length(left: usize, right: usize) -> ThresholdResult<()> {
    if left != right {
        return Err(ThresholdError::LengthMismatch { left, right });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch_message() {
        let err = ensure_same_length(3, 5).unwrap_err();
        assert_eq!(err, ThresholdError::LengthMismatch { left: 3, right: 5 });
        assert_eq!(err.to_string(), "length mismatch: 3 vs 5 samples");
    }

    #[test]
    fn test_equal_lengths_pass() {
        assert!(ensure_same_length(4, 4).is_ok());
    }
}
