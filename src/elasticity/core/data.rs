//! Paired usage/value containers for elasticity models.
//!
//! Purpose
//! -------
//! Provide a single validated container, [`ElasticityData`], for the paired
//! series both estimators consume: a usage metric (e.g. active addresses or
//! users) and a value metric (e.g. market capitalization), optionally tagged
//! with integer timestamps. All input checks live here so the estimators can
//! assume clean, strictly positive data.
//!
//! Key behaviors
//! -------------
//! - Validate equal lengths, a minimum sample size, finiteness and strict
//!   positivity, reporting the offending series and index.
//! - Validate optional timestamps (same length, strictly increasing).
//! - Cache `ln(usage)` and `ln(value)` once at construction.
//! - Decide whether `ln(usage)` varies enough to identify a slope, relative
//!   to the level of the series ([`ElasticityData::has_usage_variation`]).
//!
//! Invariants & assumptions
//! ------------------------
//! - `usage.len() == value.len() >= ElasticityData::MIN_OBSERVATIONS`.
//! - Every entry of both series is finite and `> 0`, so the cached logs are
//!   finite.
//! - Observation order is meaningful for the regime-switching model (it is a
//!   temporal filter) and irrelevant for the baseline regression.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the happy path, each validation failure, timestamp
//!   ordering and the usage-variation check.
use crate::{
    elasticity::errors::{ElasticityError, ElasticityResult, Series},
    numerical_stability::transformations::GENERAL_TOL,
};
use ndarray::{Array1, ArrayView1};

/// `ElasticityData` — validated `(timestamp?, usage, value)` observations.
///
/// Fields are private; use the accessors. The log-transformed series are
/// computed once and shared by every fit on the same data.
#[derive(Debug, Clone, PartialEq)]
pub struct ElasticityData {
    usage: Array1<f64>,
    value: Array1<f64>,
    timestamps: Option<Array1<i64>>,
    log_usage: Array1<f64>,
    log_value: Array1<f64>,
}

impl ElasticityData {
    /// Smallest sample for a two-parameter regression with a residual
    /// variance.
    pub const MIN_OBSERVATIONS: usize = 3;

    /// Construct validated data from owned arrays.
    ///
    /// Errors
    /// ------
    /// - `LengthMismatch` when the series differ in length (checked first,
    ///   before any element is inspected).
    /// - `TooFewObservations` when `n < 3`.
    /// - `NonFiniteData` / `NonPositiveData` naming the series (usage is
    ///   scanned before value) and the first offending index.
    ///
    /// Examples
    /// --------
    /// ```rust
    /// # use ndarray::array;
    /// # use network_elasticity::elasticity::ElasticityData;
    /// let data = ElasticityData::new(array![1.0, 2.0, 4.0], array![3.0, 5.0, 9.0]).unwrap();
    /// assert_eq!(data.len(), 3);
    /// ```
    pub fn new(usage: Array1<f64>, value: Array1<f64>) -> ElasticityResult<Self> {
        if usage.len() != value.len() {
            return Err(ElasticityError::LengthMismatch { usage: usage.len(), value: value.len() });
        }
        if usage.len() < Self::MIN_OBSERVATIONS {
            return Err(ElasticityError::TooFewObservations {
                required: Self::MIN_OBSERVATIONS,
                actual: usage.len(),
            });
        }
        validate_positive(Series::Usage, usage.view())?;
        validate_positive(Series::Value, value.view())?;

        let log_usage = usage.mapv(f64::ln);
        let log_value = value.mapv(f64::ln);
        Ok(ElasticityData { usage, value, timestamps: None, log_usage, log_value })
    }

    /// Convenience constructor from slices.
    pub fn from_slices(usage: &[f64], value: &[f64]) -> ElasticityResult<Self> {
        Self::new(Array1::from(usage.to_vec()), Array1::from(value.to_vec()))
    }

    /// Attach integer timestamps in Unix seconds, as read by
    /// [`summarize_performance`](crate::elasticity::models::summarize_performance).
    ///
    /// Errors
    /// ------
    /// - `LengthMismatch` when `timestamps.len() != self.len()` (reported in
    ///   the `value` slot).
    /// - `UnorderedTimestamps` at the first index that does not strictly
    ///   increase.
    pub fn with_timestamps(mut self, timestamps: Array1<i64>) -> ElasticityResult<Self> {
        if timestamps.len() != self.len() {
            return Err(ElasticityError::LengthMismatch {
                usage: self.len(),
                value: timestamps.len(),
            });
        }
        if let Some(index) = timestamps.windows(2).into_iter().position(|w| w[1] <= w[0]) {
            return Err(ElasticityError::UnorderedTimestamps { index: index + 1 });
        }
        self.timestamps = Some(timestamps);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.usage.len()
    }

    /// Always `false` for validated data; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.usage.is_empty()
    }

    pub fn usage(&self) -> &Array1<f64> {
        &self.usage
    }

    pub fn value(&self) -> &Array1<f64> {
        &self.value
    }

    pub fn timestamps(&self) -> Option<&Array1<i64>> {
        self.timestamps.as_ref()
    }

    /// `ln(usage)`, cached.
    pub fn log_usage(&self) -> &Array1<f64> {
        &self.log_usage
    }

    /// `ln(value)`, cached.
    pub fn log_value(&self) -> &Array1<f64> {
        &self.log_value
    }

    /// Centered sum of squares of `ln(usage)`.
    ///
    /// Zero (up to rounding) means the slope of the log-log regression is not
    /// identified.
    pub fn log_usage_variation(&self) -> f64 {
        let mean = self.log_usage.mean().unwrap_or(0.0);
        self.log_usage.iter().map(|&x| (x - mean) * (x - mean)).sum()
    }

    /// Whether `ln(usage)` spreads beyond the rounding noise of its level.
    ///
    /// The root-mean-square deviation is compared with `GENERAL_TOL` times the
    /// magnitude of the mean log usage (at least 1), so a narrow band around
    /// a large usage level still identifies the slope.
    pub fn has_usage_variation(&self) -> bool {
        let n = self.len() as f64;
        let level = self.log_usage.mean().unwrap_or(0.0).abs().max(1.0);
        let noise = GENERAL_TOL * level;
        self.log_usage_variation() > n * noise * noise
    }
}

/// Check that every entry of `values` is finite and strictly positive.
///
/// Shared by data construction and by `predict` on new usage levels.
pub(crate) fn validate_positive(series: Series, values: ArrayView1<f64>) -> ElasticityResult<()> {
    for (index, &value) in values.iter().enumerate() {
        if !value.is_finite() {
            return Err(ElasticityError::NonFiniteData { series, index, value });
        }
        if value <= 0.0 {
            return Err(ElasticityError::NonPositiveData { series, index, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - `ElasticityData::new` happy path and cached logarithms.
    // - Each validation failure, including the order in which checks run.
    // - Timestamp validation.
    // - The usage-variation check on constant and narrow-band series.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Valid series construct and cache their logarithms.
    //
    // Given
    // -----
    // - usage = [1, e, e²], value = [2, 3, 4].
    //
    // Expect
    // ------
    // - `log_usage` = [0, 1, 2]; length 3.
    fn new_accepts_positive_series_and_caches_logs() {
        // Arrange
        let e = std::f64::consts::E;
        let usage = array![1.0, e, e * e];
        let value = array![2.0, 3.0, 4.0];

        // Act
        let data = ElasticityData::new(usage, value).unwrap();

        // Assert
        assert_eq!(data.len(), 3);
        assert!(!data.is_empty());
        for (got, want) in data.log_usage().iter().zip([0.0, 1.0, 2.0]) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
        assert_relative_eq!(data.log_value()[0], 2.0_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // A length mismatch is reported before element checks run.
    //
    // Given
    // -----
    // - Series of lengths 3 and 4, where usage also contains a NaN.
    //
    // Expect
    // ------
    // - `LengthMismatch { usage: 3, value: 4 }`, not `NonFiniteData`.
    fn length_mismatch_is_checked_first() {
        // Arrange
        let usage = array![1.0, f64::NAN, 3.0];
        let value = array![1.0, 2.0, 3.0, 4.0];

        // Act
        let err = ElasticityData::new(usage, value).unwrap_err();

        // Assert
        assert_eq!(err, ElasticityError::LengthMismatch { usage: 3, value: 4 });
    }

    #[test]
    // Purpose
    // -------
    // Short, non-finite and non-positive inputs are rejected with details.
    //
    // Expect
    // ------
    // - Two points: `TooFewObservations`.
    // - Infinite usage at index 1: `NonFiniteData { Usage, 1, .. }`.
    // - Zero value at index 2: `NonPositiveData { Value, 2, .. }`.
    fn invalid_values_name_series_and_index() {
        // Act
        let short = ElasticityData::from_slices(&[1.0, 2.0], &[1.0, 2.0]).unwrap_err();
        let inf = ElasticityData::from_slices(&[1.0, f64::INFINITY, 3.0], &[1.0, 2.0, 3.0])
            .unwrap_err();
        let zero = ElasticityData::from_slices(&[1.0, 2.0, 3.0], &[1.0, 2.0, 0.0]).unwrap_err();

        // Assert
        assert_eq!(short, ElasticityError::TooFewObservations { required: 3, actual: 2 });
        assert!(matches!(
            inf,
            ElasticityError::NonFiniteData { series: Series::Usage, index: 1, .. }
        ));
        assert!(matches!(
            zero,
            ElasticityError::NonPositiveData { series: Series::Value, index: 2, .. }
        ));
    }

    #[test]
    // Purpose
    // -------
    // Timestamps must match in length and strictly increase.
    //
    // Expect
    // ------
    // - [10, 20, 20] fails at index 2; [10, 20, 30] is accepted.
    fn timestamps_must_strictly_increase() {
        // Arrange
        let data = ElasticityData::from_slices(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();

        // Act
        let bad = data.clone().with_timestamps(array![10, 20, 20]).unwrap_err();
        let good = data.with_timestamps(array![10, 20, 30]).unwrap();

        // Assert
        assert_eq!(bad, ElasticityError::UnorderedTimestamps { index: 2 });
        assert_eq!(good.timestamps().map(|t| t[2]), Some(30));
    }

    #[test]
    // Purpose
    // -------
    // The variation check is relative to the level of ln(usage).
    //
    // Given
    // -----
    // - Constant usage 5 on four points.
    // - Usage cycling through 1e6 − 1, 1e6, 1e6 + 1 (ln spread ≈ 1e-6).
    // - Usage [1, 2, 4].
    //
    // Expect
    // ------
    // - Constant: no variation. Narrow band and [1, 2, 4]: variation.
    fn usage_variation_is_relative_to_level() {
        // Arrange
        let constant = ElasticityData::from_slices(&[5.0; 4], &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let band: Vec<f64> = (0..9).map(|t| 1e6 + (t % 3) as f64 - 1.0).collect();
        let narrow = ElasticityData::from_slices(&band, &band).unwrap();
        let wide = ElasticityData::from_slices(&[1.0, 2.0, 4.0], &[1.0, 2.0, 3.0]).unwrap();

        // Act / Assert
        assert!(!constant.has_usage_variation());
        assert!(narrow.log_usage_variation() < GENERAL_TOL);
        assert!(narrow.has_usage_variation());
        assert!(wide.has_usage_variation());
    }
}
