//! core — shared data, options, regime vocabulary and regression kernels.
//!
//! Purpose
//! -------
//! Collect the building blocks both elasticity estimators rely on: the
//! validated input container, immutable option structs, the typed regime
//! vocabulary, the sustainability rule and the least-squares kernels.
//! Higher-level models in `elasticity::models` build on top of these.
//!
//! Key behaviors
//! -------------
//! - [`ElasticityData`] validates paired usage/value series and caches logs.
//! - [`BaselineOptions`], [`RegimeOptions`], [`EmTolerances`] and
//!   [`RegimeOrdering`] carry configuration.
//! - [`RegimeId`], [`RegimeMap`], [`RegimeParams`] and [`TransitionMatrix`]
//!   describe regime-switching results.
//! - [`ConfidenceInterval`], [`Classification`] and [`HypothesisTest`]
//!   describe inference on the elasticity.
//! - [`least_squares`] solves (weighted) normal equations with `nalgebra`.
//!
//! Conventions
//! -----------
//! - Indexing of observations is 0-based; regime ids are 1-based.
//! - This module does no logging. Error conditions are reported via
//!   `ElasticityResult` / `InferenceResult`.

pub mod classification;
pub mod data;
pub mod least_squares;
pub mod options;
pub mod regime;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::classification::{
    Classification, ConfidenceInterval, HypothesisTest, UNIT_ELASTICITY,
};
pub use self::data::ElasticityData;
pub use self::least_squares::LeastSquaresFit;
pub use self::options::{BaselineOptions, EmTolerances, RegimeOptions, RegimeOrdering};
pub use self::regime::{RegimeId, RegimeMap, RegimeParams, TransitionMatrix};
