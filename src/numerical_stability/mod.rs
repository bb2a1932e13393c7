//! numerical_stability — log-space helpers and shared numeric floors.
//!
//! Purpose
//! -------
//! Collect the small numerically robust primitives used by the estimators:
//! a max-shifted log-sum-exp, the Gaussian log-density used by the regime
//! filter, and probability/variance floors. Centralizing them keeps the
//! tolerances consistent across the baseline and regime-switching models.
//!
//! Key behaviors
//! -------------
//! - Evaluate `ln Σ exp(v_i)` without overflow or underflow
//!   (`log_sum_exp`).
//! - Evaluate the zero-mean Gaussian log-density (`log_normal_density`).
//! - Keep probability rows strictly positive and normalized
//!   (`floor_and_normalize`).
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are finite except where documented (`-∞` is a valid log-weight).
//! - Variances handed to `log_normal_density` are already floored at
//!   [`VARIANCE_FLOOR`] by the caller.
//!
//! Conventions
//! -----------
//! - Pure functions on slices and scalars; no I/O, no logging, no global
//!   state.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`transformations`] compare each helper against its
//!   naïve formula on safe inputs and exercise the degenerate branches.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    GENERAL_TOL, PROBABILITY_FLOOR, VARIANCE_FLOOR, floor_and_normalize, log_normal_density,
    log_sum_exp,
};
