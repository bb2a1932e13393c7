//! Errors for network-elasticity models (data validation, option checks,
//! identification, lifecycle and estimation failures).
//!
//! This module defines the model error type, [`ElasticityError`], shared by
//! the baseline and regime-switching estimators. It implements
//! `Display`/`Error`, exposes a coarse [`ErrorKind`] for callers that only
//! need to branch on the failure class, and converts to `PyErr` when the
//! `python-bindings` feature is enabled.
//!
//! ## Conventions
//! - **Indices are 0-based** (match Rust/NumPy).
//! - Regime ids are **1-based** (`1..=k`), as exposed to users.
//! - All validation errors are raised before any numerical work starts.
//! - Failures from covariance / distribution code are wrapped in
//!   [`ElasticityError::Inference`] and classified as invalid input.
use crate::inference::InferenceError;
#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

/// Crate-wide result alias for elasticity operations.
pub type ElasticityResult<T> = Result<T, ElasticityError>;

/// Which of the two paired input series an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Series {
    Usage,
    Value,
}

impl std::fmt::Display for Series {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Series::Usage => write!(f, "usage"),
            Series::Value => write!(f, "value"),
        }
    }
}

/// Coarse classification of [`ElasticityError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Shape, positivity, length or configuration violations.
    InvalidInput,
    /// Not enough observations for the requested regime count.
    UnderIdentifiedModel,
    /// Prediction or classification requested before a successful fit.
    NotFitted,
    /// Regime id outside `1..=k`.
    InvalidRegime,
    /// A regime collapsed during estimation.
    DegenerateRegime,
}

/// Unified error type for elasticity modeling.
#[derive(Debug, Clone, PartialEq)]
pub enum ElasticityError {
    // ---- Input/data validation ----
    /// `usage` and `value` (or timestamps) have different lengths.
    LengthMismatch { usage: usize, value: usize },

    /// Fewer observations than the regression needs.
    TooFewObservations { required: usize, actual: usize },

    /// A data point is NaN/±inf.
    NonFiniteData { series: Series, index: usize, value: f64 },

    /// A data point is ≤ 0 (the models operate on logarithms).
    NonPositiveData { series: Series, index: usize, value: f64 },

    /// Timestamps must be strictly increasing.
    UnorderedTimestamps { index: usize },

    /// The operation needs timestamped data.
    MissingTimestamps,

    /// `ln(usage)` is constant, so the slope is not identified.
    NoUsageVariation,

    // ---- Options validation ----
    /// Confidence level must lie in (0, 1).
    InvalidConfidenceLevel { level: f64 },

    /// `k_regimes` must be in `2..=RegimeId::MAX`.
    InvalidRegimeCount { k: usize },

    /// EM tolerance must be finite and > 0.
    InvalidTolerance { tol: f64 },

    /// EM iteration cap must be ≥ 1.
    InvalidMaxIter { max_iter: usize },

    /// Minimum regime mass must be finite and ≥ 0.
    InvalidRegimeMass { mass: f64 },

    /// Train/test split leaves too few observations on one side.
    InsufficientSplit { train: usize, test: usize },

    // ---- Identification ----
    /// Series too short for the requested number of regimes.
    UnderIdentifiedModel { n: usize, k: usize, required: usize },

    // ---- Lifecycle ----
    /// Model hasn't been fitted yet.
    ModelNotFitted,

    /// Regime id outside `1..=k`.
    InvalidRegime { regime: usize, k: usize },

    // ---- Estimation ----
    /// A regime's smoothed mass vanished or its weighted design is singular.
    DegenerateRegime { regime: usize, mass: f64 },

    /// Covariance / distribution failure.
    Inference(InferenceError),
}

impl ElasticityError {
    /// Failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ElasticityError::UnderIdentifiedModel { .. } => ErrorKind::UnderIdentifiedModel,
            ElasticityError::ModelNotFitted => ErrorKind::NotFitted,
            ElasticityError::InvalidRegime { .. } => ErrorKind::InvalidRegime,
            ElasticityError::DegenerateRegime { .. } => ErrorKind::DegenerateRegime,
            _ => ErrorKind::InvalidInput,
        }
    }
}

impl std::error::Error for ElasticityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ElasticityError::Inference(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for ElasticityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Input/data validation ----
            ElasticityError::LengthMismatch { usage, value } => write!(
                f,
                "Input series must have equal length (usage has {usage}, value has {value})."
            ),
            ElasticityError::TooFewObservations { required, actual } => write!(
                f,
                "At least {required} observations are required, got {actual}."
            ),
            ElasticityError::NonFiniteData { series, index, value } => {
                write!(f, "Non-finite {series} at index {index}: {value}")
            }
            ElasticityError::NonPositiveData { series, index, value } => write!(
                f,
                "Non-positive {series} at index {index}: {value} (must be > 0)"
            ),
            ElasticityError::UnorderedTimestamps { index } => {
                write!(f, "Timestamps must be strictly increasing (violated at index {index}).")
            }
            ElasticityError::MissingTimestamps => {
                write!(f, "This operation requires timestamps; attach them with with_timestamps.")
            }
            ElasticityError::NoUsageVariation => {
                write!(f, "ln(usage) is constant; the elasticity is not identified.")
            }

            // ---- Options validation ----
            ElasticityError::InvalidConfidenceLevel { level } => {
                write!(f, "Confidence level must lie in (0, 1), got {level}.")
            }
            ElasticityError::InvalidRegimeCount { k } => {
                write!(f, "k_regimes must be between 2 and {}, got {k}.", u8::MAX)
            }
            ElasticityError::InvalidTolerance { tol } => {
                write!(f, "EM tolerance must be finite and > 0, got {tol}.")
            }
            ElasticityError::InvalidMaxIter { max_iter } => {
                write!(f, "EM max_iter must be >= 1, got {max_iter}.")
            }
            ElasticityError::InvalidRegimeMass { mass } => {
                write!(f, "Minimum regime mass must be finite and >= 0, got {mass}.")
            }
            ElasticityError::InsufficientSplit { train, test } => write!(
                f,
                "Train/test split too small (train {train}, test {test}); need >= 30 and >= 2."
            ),

            // ---- Identification ----
            ElasticityError::UnderIdentifiedModel { n, k, required } => write!(
                f,
                "{k} regimes need at least {required} observations, got {n}."
            ),

            // ---- Lifecycle ----
            ElasticityError::ModelNotFitted => write!(f, "Model hasn't been fitted yet."),
            ElasticityError::InvalidRegime { regime, k } => {
                write!(f, "Regime {regime} is out of range; valid ids are 1..={k}.")
            }

            // ---- Estimation ----
            ElasticityError::DegenerateRegime { regime, mass } => write!(
                f,
                "Regime {regime} degenerated during estimation (smoothed mass {mass})."
            ),
            ElasticityError::Inference(err) => write!(f, "{err}"),
        }
    }
}

impl From<InferenceError> for ElasticityError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::InvalidConfidenceLevel { level } => {
                ElasticityError::InvalidConfidenceLevel { level }
            }
            other => ElasticityError::Inference(other),
        }
    }
}

/// Convert an [`ElasticityError`] into a Python `ValueError` with the error message.
///
/// This is used at the Rust↔Python boundary to surface domain errors cleanly.
#[cfg(feature = "python-bindings")]
impl From<ElasticityError> for PyErr {
    fn from(err: ElasticityError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
