//! models — baseline and regime-switching elasticity estimators.
//!
//! Purpose
//! -------
//! Collect the user-facing estimators of the network-value elasticity on
//! top of `elasticity::core`: a global log-log OLS with robust inference and
//! a k-regime Markov-switching regression estimated by EM, plus a
//! chronological out-of-sample check of the baseline and a start-versus-end
//! performance summary of timestamped series.
//!
//! Key behaviors
//! -------------
//! - [`BaselineElasticityModel`] fits `ln V = α + β ln U + ε` and classifies
//!   the β confidence interval against unit elasticity.
//! - [`RegimeSwitchingElasticityModel`] estimates regime-specific `(α, β, σ²)`
//!   and the transition matrix, with the E-step in [`hamilton`] and the
//!   initialization / M-step in [`em`].
//! - [`evaluate_out_of_sample`] fits the baseline on a leading block and
//!   scores predictions on the trailing block.
//! - [`summarize_performance`] compares windowed means at both ends of a
//!   timestamped series and annualizes the value return.
//!
//! Conventions
//! -----------
//! - Models own immutable options and cache the last successful fit; a
//!   failed `fit` leaves an earlier result untouched.
//! - Fit records ([`BaselineFit`], [`RegimeFit`], [`OutOfSampleReport`],
//!   [`PerformanceSummary`]) are immutable values implementing
//!   `serde::Serialize`.
//! - Fits emit one `tracing` event; non-converged EM runs emit a warning.
//!
//! Testing notes
//! -------------
//! - [`hamilton`] is checked against brute-force path enumeration.
//! - [`em`] covers initialization, monotone likelihood and degenerate
//!   regimes; [`regime_switching`] covers relabeling and the public API.
//! - The full pipeline on simulated two-regime data lives in
//!   `tests/integration_elasticity_pipeline.rs`.

pub mod baseline;
pub mod em;
pub mod evaluation;
pub mod hamilton;
pub mod performance;
pub mod regime_switching;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::baseline::{BaselineElasticityModel, BaselineFit};
pub use self::evaluation::{OutOfSampleReport, evaluate_out_of_sample};
pub use self::performance::{PerformanceSummary, summarize_performance};
pub use self::regime_switching::{RegimeFit, RegimeSwitchingElasticityModel};
