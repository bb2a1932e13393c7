//! Elasticity options — configuration for baseline and regime-switching fits.
//!
//! Purpose
//! -------
//! Collect every configuration knob of the two estimators in explicit,
//! immutable structs that are validated once at construction. Models receive
//! options at construction time and never consult global state.
//!
//! Key behaviors
//! -------------
//! - [`BaselineOptions`]: confidence level, coefficient covariance estimator
//!   and critical-value distribution for the log-log regression.
//! - [`EmTolerances`]: EM stopping rule (log-likelihood tolerance, iteration
//!   cap, optional wall-clock budget).
//! - [`RegimeOrdering`]: canonical labeling of regimes after estimation.
//! - [`RegimeOptions`]: number of regimes, switching flags, tolerances,
//!   ordering and the degenerate-regime threshold.
//!
//! Invariants & assumptions
//! ------------------------
//! - `0 < confidence_level < 1`.
//! - `2 <= k_regimes <= RegimeId::MAX`.
//! - `tolerance` finite and > 0; `max_iter >= 1`; `min_regime_mass` finite
//!   and >= 0.
//!
//! Testing notes
//! -------------
//! - Unit tests check defaults, each validation failure and the free
//!   parameter count used by the information criteria.
use crate::{
    elasticity::{
        core::regime::RegimeId,
        errors::{ElasticityError, ElasticityResult},
    },
    inference::{CovarianceType, CriticalDistribution},
};
use std::time::Duration;

/// BaselineOptions — configuration of the global log-log regression.
///
/// Defaults: 95% confidence, HC3 covariance, Student-t critical values with
/// `n − 2` degrees of freedom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineOptions {
    /// Confidence level of the β interval, in (0, 1).
    pub confidence_level: f64,
    /// Coefficient covariance estimator used for every reported standard error.
    pub covariance_type: CovarianceType,
    /// Reference distribution for critical values and p-values.
    pub critical_distribution: CriticalDistribution,
}

impl BaselineOptions {
    /// Construct validated options.
    ///
    /// # Errors
    /// - `InvalidConfidenceLevel` unless `0 < confidence_level < 1`.
    pub fn new(
        confidence_level: f64, covariance_type: CovarianceType,
        critical_distribution: CriticalDistribution,
    ) -> ElasticityResult<Self> {
        validate_confidence_level(confidence_level)?;
        Ok(BaselineOptions { confidence_level, covariance_type, critical_distribution })
    }

    /// Default options at a different confidence level.
    pub fn with_confidence_level(confidence_level: f64) -> ElasticityResult<Self> {
        let defaults = Self::default();
        Self::new(confidence_level, defaults.covariance_type, defaults.critical_distribution)
    }
}

impl Default for BaselineOptions {
    fn default() -> Self {
        BaselineOptions {
            confidence_level: 0.95,
            covariance_type: CovarianceType::default(),
            critical_distribution: CriticalDistribution::default(),
        }
    }
}

/// EmTolerances — stopping rule for the EM loop.
///
/// The loop stops as converged once `|ΔlogL| < tolerance`. Hitting
/// `max_iter`, or exceeding `time_budget` when set, stops it as not
/// converged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmTolerances {
    pub tolerance: f64,
    pub max_iter: usize,
    pub time_budget: Option<Duration>,
}

impl EmTolerances {
    pub const DEFAULT_TOLERANCE: f64 = 1e-8;
    pub const DEFAULT_MAX_ITER: usize = 500;

    /// Construct validated tolerances; `None` selects the default.
    ///
    /// # Errors
    /// - `InvalidTolerance` unless the tolerance is finite and > 0.
    /// - `InvalidMaxIter` when `max_iter == 0`.
    pub fn new(tolerance: Option<f64>, max_iter: Option<usize>) -> ElasticityResult<Self> {
        let tolerance = tolerance.unwrap_or(Self::DEFAULT_TOLERANCE);
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(ElasticityError::InvalidTolerance { tol: tolerance });
        }
        let max_iter = max_iter.unwrap_or(Self::DEFAULT_MAX_ITER);
        if max_iter == 0 {
            return Err(ElasticityError::InvalidMaxIter { max_iter });
        }
        Ok(EmTolerances { tolerance, max_iter, time_budget: None })
    }

    /// Cap the wall-clock time spent in the EM loop.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }
}

impl Default for EmTolerances {
    fn default() -> Self {
        EmTolerances {
            tolerance: Self::DEFAULT_TOLERANCE,
            max_iter: Self::DEFAULT_MAX_ITER,
            time_budget: None,
        }
    }
}

/// Canonical order of regime labels after estimation, by elasticity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegimeOrdering {
    /// Regime 1 has the smallest β.
    #[default]
    AscendingBeta,
    /// Regime 1 has the largest β.
    DescendingBeta,
}

/// RegimeOptions — configuration of the Markov-switching regression.
///
/// Constructed with [`RegimeOptions::new`] and refined with the `with_*`
/// builders. Defaults: two regimes, shared variance, switching intercept,
/// ascending-β labels, default [`EmTolerances`], minimum regime mass 1e-3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeOptions {
    pub k_regimes: usize,
    /// Separate residual variance per regime.
    pub switching_variance: bool,
    /// Separate intercept per regime; `false` shares one α across regimes.
    pub switching_intercept: bool,
    pub tolerances: EmTolerances,
    pub ordering: RegimeOrdering,
    /// Smallest smoothed mass `Σ_t ξ_{t,i}` a regime may carry before the
    /// fit fails as degenerate.
    pub min_regime_mass: f64,
}

impl RegimeOptions {
    /// Regimes share one residual variance unless asked otherwise.
    pub const DEFAULT_SWITCHING_VARIANCE: bool = false;
    pub const DEFAULT_SWITCHING_INTERCEPT: bool = true;
    pub const DEFAULT_MIN_REGIME_MASS: f64 = 1e-3;
    /// Observations required per regime.
    pub const OBSERVATIONS_PER_REGIME: usize = 10;

    /// # Errors
    /// - `InvalidRegimeCount` unless `2 <= k_regimes <= RegimeId::MAX`.
    pub fn new(k_regimes: usize, switching_variance: bool) -> ElasticityResult<Self> {
        if !(2..=RegimeId::MAX).contains(&k_regimes) {
            return Err(ElasticityError::InvalidRegimeCount { k: k_regimes });
        }
        Ok(RegimeOptions {
            k_regimes,
            switching_variance,
            switching_intercept: Self::DEFAULT_SWITCHING_INTERCEPT,
            tolerances: EmTolerances::default(),
            ordering: RegimeOrdering::default(),
            min_regime_mass: Self::DEFAULT_MIN_REGIME_MASS,
        })
    }

    pub fn with_switching_intercept(mut self, switching_intercept: bool) -> Self {
        self.switching_intercept = switching_intercept;
        self
    }

    pub fn with_tolerances(mut self, tolerances: EmTolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    pub fn with_ordering(mut self, ordering: RegimeOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// # Errors
    /// - `InvalidRegimeMass` unless `mass` is finite and >= 0.
    pub fn with_min_regime_mass(mut self, mass: f64) -> ElasticityResult<Self> {
        if !mass.is_finite() || mass < 0.0 {
            return Err(ElasticityError::InvalidRegimeMass { mass });
        }
        self.min_regime_mass = mass;
        Ok(self)
    }

    /// Minimum series length, `10 · k`.
    pub fn min_observations(&self) -> usize {
        Self::OBSERVATIONS_PER_REGIME * self.k_regimes
    }

    /// Free parameters: `k(k−1)` transitions, the intercepts, `k` slopes and
    /// the variances.
    pub fn n_parameters(&self) -> usize {
        let k = self.k_regimes;
        let intercepts = if self.switching_intercept { k } else { 1 };
        let variances = if self.switching_variance { k } else { 1 };
        k * (k - 1) + intercepts + k + variances
    }
}

impl Default for RegimeOptions {
    fn default() -> Self {
        RegimeOptions {
            k_regimes: 2,
            switching_variance: Self::DEFAULT_SWITCHING_VARIANCE,
            switching_intercept: Self::DEFAULT_SWITCHING_INTERCEPT,
            tolerances: EmTolerances::default(),
            ordering: RegimeOrdering::default(),
            min_regime_mass: Self::DEFAULT_MIN_REGIME_MASS,
        }
    }
}

pub(crate) fn validate_confidence_level(level: f64) -> ElasticityResult<()> {
    if !(level > 0.0 && level < 1.0) {
        return Err(ElasticityError::InvalidConfidenceLevel { level });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Documented defaults of every options struct.
    // - Validation failures for confidence level, regime count, tolerances
    //   and regime mass.
    // - The free parameter count for each switching configuration.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Defaults match the documented configuration.
    //
    // Expect
    // ------
    // - Baseline: 0.95 / HC3 / Student-t.
    // - Regime: k = 2, shared variance, switching intercept, 1e-8 / 500,
    //   no time budget, ascending ordering, mass 1e-3.
    fn defaults_match_documentation() {
        // Arrange
        let base = BaselineOptions::default();
        let regime = RegimeOptions::default();

        // Act / Assert
        assert_eq!(base.confidence_level, 0.95);
        assert_eq!(base.covariance_type, CovarianceType::HC3);
        assert_eq!(base.critical_distribution, CriticalDistribution::StudentT);
        assert_eq!(regime.k_regimes, 2);
        assert!(!regime.switching_variance);
        assert!(regime.switching_intercept);
        assert_eq!(regime.tolerances.tolerance, 1e-8);
        assert_eq!(regime.tolerances.max_iter, 500);
        assert!(regime.tolerances.time_budget.is_none());
        assert_eq!(regime.ordering, RegimeOrdering::AscendingBeta);
        assert_eq!(regime.min_regime_mass, 1e-3);
        assert_eq!(RegimeOptions::new(2, false).unwrap(), regime);
        assert!(!RegimeOptions::DEFAULT_SWITCHING_VARIANCE);
        assert!(RegimeOptions::DEFAULT_SWITCHING_INTERCEPT);
    }

    #[test]
    // Purpose
    // -------
    // Out-of-range settings are rejected with the matching variant.
    //
    // Expect
    // ------
    // - confidence 1.0 / 0.0 / NaN, k = 1, tolerance 0, max_iter 0 and a
    //   negative mass all fail.
    fn invalid_settings_are_rejected() {
        // Act / Assert
        for level in [0.0, 1.0, f64::NAN] {
            assert!(matches!(
                BaselineOptions::with_confidence_level(level),
                Err(ElasticityError::InvalidConfidenceLevel { .. })
            ));
        }
        assert_eq!(RegimeOptions::new(1, false), Err(ElasticityError::InvalidRegimeCount { k: 1 }));
        assert_eq!(
            EmTolerances::new(Some(0.0), None),
            Err(ElasticityError::InvalidTolerance { tol: 0.0 })
        );
        assert_eq!(
            EmTolerances::new(None, Some(0)),
            Err(ElasticityError::InvalidMaxIter { max_iter: 0 })
        );
        assert!(matches!(
            RegimeOptions::default().with_min_regime_mass(-1.0),
            Err(ElasticityError::InvalidRegimeMass { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // The parameter count follows `k(k−1) + intercepts + k + variances`.
    //
    // Given
    // -----
    // - k = 2 and k = 3 under each combination of switching flags.
    //
    // Expect
    // ------
    // - k=2 shared σ²: 2 + 2 + 2 + 1 = 7; switching σ²: 8.
    // - k=3 shared α, switching σ²: 6 + 1 + 3 + 3 = 13.
    fn parameter_count_follows_switching_flags() {
        // Arrange
        let two = RegimeOptions::new(2, false).unwrap();
        let two_sv = RegimeOptions::new(2, true).unwrap();
        let three = RegimeOptions::new(3, true).unwrap().with_switching_intercept(false);

        // Act / Assert
        assert_eq!(two.n_parameters(), 7);
        assert_eq!(two_sv.n_parameters(), 8);
        assert_eq!(three.n_parameters(), 13);
        assert_eq!(three.min_observations(), 30);
    }
}
