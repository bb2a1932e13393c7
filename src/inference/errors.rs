//! Unified error handling for inference routines.
//!
//! This module defines `InferenceError`, the central error type used by the
//! robust (sandwich) covariance estimators and by the critical-value and
//! p-value helpers. It groups numerical degeneracies of the design matrix
//! together with invalid distribution settings. An alias
//! `InferenceResult<T>` standardizes the return type across inference code.

/// Unified error type for inference routines.
///
/// Covers singular or mismatched designs, invalid confidence levels or
/// degrees of freedom, and failures surfaced by `statrs` when constructing
/// reference distributions.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    // ---- Robust covariance ----
    /// The cross-product matrix `XᵀX` is not positive definite.
    SingularDesign,

    /// Design rows, residuals and `(XᵀX)⁻¹` disagree on their dimensions.
    DimensionMismatch { expected: usize, actual: usize },

    // ---- Reference distributions ----
    /// Confidence level must lie strictly inside (0, 1).
    InvalidConfidenceLevel { level: f64 },

    /// Degrees of freedom must be finite and > 0.
    InvalidDegreesOfFreedom { dof: f64 },

    /// Error reported by `statrs` when building a distribution.
    Distribution(String),
}

pub type InferenceResult<T> = Result<T, InferenceError>;

impl std::error::Error for InferenceError {}

impl std::fmt::Display for InferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Robust covariance ----
            InferenceError::SingularDesign => {
                write!(f, "Inference Error: Design cross-product matrix is not positive definite")
            }
            InferenceError::DimensionMismatch { expected, actual } => write!(
                f,
                "Inference Error: Dimension mismatch (expected {expected}, got {actual})"
            ),

            // ---- Reference distributions ----
            InferenceError::InvalidConfidenceLevel { level } => write!(
                f,
                "Inference Error: Confidence level must lie in (0, 1), got {level}"
            ),
            InferenceError::InvalidDegreesOfFreedom { dof } => write!(
                f,
                "Inference Error: Degrees of freedom must be finite and > 0, got {dof}"
            ),
            InferenceError::Distribution(msg) => write!(f, "Inference Error: {msg}"),
        }
    }
}
