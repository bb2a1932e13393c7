//! inference::critical — reference distributions for Wald-type inference.
//!
//! Purpose
//! -------
//! Provide two-sided critical values and p-values for a single coefficient
//! from either a Student-t distribution (small-sample exact under Gaussian
//! errors) or the standard normal (asymptotic). Both distributions come from
//! `statrs`.
//!
//! Conventions
//! -----------
//! - Degrees of freedom are passed as `f64` and ignored by the normal
//!   reference.
//! - Test statistics may be infinite (zero standard error); their p-value is
//!   exactly 0.
use crate::inference::errors::{InferenceError, InferenceResult};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

/// Reference distribution used for confidence intervals and p-values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CriticalDistribution {
    /// Student-t with the residual degrees of freedom.
    #[default]
    StudentT,
    /// Standard normal.
    Normal,
}

impl CriticalDistribution {
    /// Two-sided critical value `c` with `Pr(|T| ≤ c) = confidence_level`.
    ///
    /// # Errors
    /// - `InvalidConfidenceLevel` unless `0 < confidence_level < 1`.
    /// - `InvalidDegreesOfFreedom` for a non-finite or non-positive `dof`
    ///   under the Student-t reference.
    pub fn critical_value(&self, confidence_level: f64, dof: f64) -> InferenceResult<f64> {
        if !(confidence_level > 0.0 && confidence_level < 1.0) {
            return Err(InferenceError::InvalidConfidenceLevel { level: confidence_level });
        }
        let quantile = 0.5 * (1.0 + confidence_level);
        match self {
            CriticalDistribution::StudentT => Ok(students_t(dof)?.inverse_cdf(quantile)),
            CriticalDistribution::Normal => Ok(standard_normal()?.inverse_cdf(quantile)),
        }
    }

    /// Two-sided p-value `Pr(|T| ≥ |statistic|)`, clamped to `[0, 1]`.
    pub fn two_sided_p_value(&self, statistic: f64, dof: f64) -> InferenceResult<f64> {
        if statistic.is_infinite() {
            return Ok(0.0);
        }
        let tail = match self {
            CriticalDistribution::StudentT => students_t(dof)?.sf(statistic.abs()),
            CriticalDistribution::Normal => standard_normal()?.sf(statistic.abs()),
        };
        Ok((2.0 * tail).clamp(0.0, 1.0))
    }
}

/// Wald statistic `(estimate − null_value)/std_error`.
///
/// A zero standard error gives `±∞` when the estimate differs from the null
/// and `0` when it coincides.
pub fn t_statistic(estimate: f64, null_value: f64, std_error: f64) -> f64 {
    let diff = estimate - null_value;
    if std_error > 0.0 {
        diff / std_error
    } else if diff == 0.0 {
        0.0
    } else {
        diff.signum() * f64::INFINITY
    }
}

fn students_t(dof: f64) -> InferenceResult<StudentsT> {
    if !dof.is_finite() || dof <= 0.0 {
        return Err(InferenceError::InvalidDegreesOfFreedom { dof });
    }
    StudentsT::new(0.0, 1.0, dof).map_err(|e| InferenceError::Distribution(e.to_string()))
}

fn standard_normal() -> InferenceResult<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| InferenceError::Distribution(e.to_string()))
}
