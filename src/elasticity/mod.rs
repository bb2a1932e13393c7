//! elasticity — network-value elasticity estimation: data, models, errors.
//!
//! Purpose
//! -------
//! Estimate the elasticity β in `value ∝ usage^β` for a network, first as a
//! single global log-log regression and then as a Markov-switching
//! regression whose β moves between latent regimes. The estimate is
//! classified as sustainable (β credibly above 1), unsustainable (credibly
//! below 1) or borderline.
//!
//! Key behaviors
//! -------------
//! - [`core`] holds the validated input container [`ElasticityData`], option
//!   structs, the regime vocabulary ([`RegimeId`], [`RegimeMap`],
//!   [`TransitionMatrix`]) and the least-squares kernels.
//! - [`models`] exposes [`BaselineElasticityModel`],
//!   [`RegimeSwitchingElasticityModel`], [`evaluate_out_of_sample`] and
//!   [`summarize_performance`].
//! - [`errors`] defines [`ElasticityError`] with a coarse [`ErrorKind`] so
//!   callers can branch on the failure category.
//!
//! Invariants & assumptions
//! ------------------------
//! - Both series are finite, strictly positive and of equal length; this is
//!   checked once in [`ElasticityData::new`] and again for prediction inputs.
//! - All estimation happens on natural logarithms of the inputs.
//! - Regime ids are 1-based and, after fitting, ordered by β.
//!
//! Conventions
//! -----------
//! - Observation indices are 0-based; regime ids are 1-based.
//! - Errors are returned as [`ElasticityResult`]; inference failures from
//!   `crate::inference` are wrapped as [`ElasticityError::Inference`].
//!
//! Downstream usage
//! ----------------
//! ```ignore
//! use network_elasticity::elasticity::prelude::*;
//!
//! let data = ElasticityData::from_slices(&usage, &value)?;
//! let mut baseline = BaselineElasticityModel::default();
//! let fit = baseline.fit(&data)?;
//! println!("beta = {:.3} ({})", fit.beta, fit.classification);
//!
//! let mut regimes = RegimeSwitchingElasticityModel::new(RegimeOptions::new(2, true)?);
//! let fit = regimes.fit(&data)?;
//! println!("{:?}", fit.betas());
//! ```
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests next to the code.
//! - Integration tests simulate a two-regime series with a seeded RNG and
//!   run both estimators end to end.

pub mod core;
pub mod errors;
pub mod models;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::core::{
    BaselineOptions, Classification, ConfidenceInterval, ElasticityData, EmTolerances,
    HypothesisTest, RegimeId, RegimeMap, RegimeOptions, RegimeOrdering, RegimeParams,
    TransitionMatrix, UNIT_ELASTICITY,
};

pub use self::errors::{ElasticityError, ElasticityResult, ErrorKind, Series};

pub use self::models::{
    BaselineElasticityModel, BaselineFit, OutOfSampleReport, PerformanceSummary, RegimeFit,
    RegimeSwitchingElasticityModel, evaluate_out_of_sample, summarize_performance,
};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use network_elasticity::elasticity::prelude::*;
//
// to import the estimator surface in a single line.

pub mod prelude {
    pub use super::{
        BaselineElasticityModel, BaselineFit, BaselineOptions, Classification,
        ConfidenceInterval, ElasticityData, ElasticityError, ElasticityResult, EmTolerances,
        ErrorKind, RegimeFit, RegimeId, RegimeOptions, RegimeOrdering,
        RegimeSwitchingElasticityModel, evaluate_out_of_sample, summarize_performance,
    };
    pub use crate::inference::{CovarianceType, CriticalDistribution};
}
