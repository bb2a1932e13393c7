//! inference — coefficient covariance, critical values and p-values.
//!
//! Purpose
//! -------
//! Provide post-estimation uncertainty quantification for linear regressions
//! fitted by the elasticity models. This module turns a design matrix, its
//! residuals and `(XᵀX)⁻¹` into a coefficient covariance (classical or
//! heteroskedasticity-consistent), and supplies the reference distributions
//! used to build confidence intervals and two-sided tests.
//!
//! Key behaviors
//! -------------
//! - Define a unified error and result type, [`InferenceError`] and
//!   [`InferenceResult`], for inference-specific failures (leverage
//!   degeneracies, singular designs, invalid distribution settings).
//! - Select the covariance estimator with [`CovarianceType`] and compute it
//!   through [`coefficient_covariance`]; hat-matrix diagonals are exposed via
//!   [`leverages`].
//! - Select the reference distribution with [`CriticalDistribution`] and
//!   obtain critical values, p-values and Wald statistics
//!   ([`t_statistic`]).
//!
//! Conventions
//! -----------
//! - Design matrices are `n×p` with rows as observations.
//! - All functions are pure: no logging, no global state, and no `unsafe`
//!   code paths. Failures are reported via [`InferenceResult`] only.
//!
//! Testing notes
//! -------------
//! - Unit tests cover hand-computable leverages and covariances, HC-family
//!   ordering, the leverage-one guard, textbook critical values and boundary
//!   p-values.
//! - Model-level tests exercise the full path from data to confidence
//!   interval and classification.

pub mod critical;
pub mod errors;
pub mod robust;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::critical::{CriticalDistribution, t_statistic};
pub use self::errors::{InferenceError, InferenceResult};
pub use self::robust::{CovarianceType, coefficient_covariance, leverages};
