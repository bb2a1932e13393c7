//! Out-of-sample evaluation of the baseline elasticity regression.
//!
//! The series is split chronologically; the baseline model is fitted on the
//! leading block and used to predict `ln(value)` on the trailing block.
//! Accuracy is reported on the log scale.
use crate::elasticity::{
    core::{data::ElasticityData, options::BaselineOptions},
    errors::{ElasticityError, ElasticityResult},
    models::baseline::estimate_baseline,
};
use ndarray::{ArrayView1, s};
use serde::Serialize;
use tracing::debug;

/// Smallest accepted training block.
pub const MIN_TRAIN_SIZE: usize = 30;
/// Smallest accepted test block (one change for the direction metric).
pub const MIN_TEST_SIZE: usize = 2;

/// Accuracy of a train/test baseline fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutOfSampleReport {
    pub train_size: usize,
    pub test_size: usize,
    /// Elasticity estimated on the training block.
    pub beta_train: f64,
    /// In-sample R² on the training block.
    pub r2_train: f64,
    /// `1 − SS_res/SS_tot` on the test block, 0 when the test response is flat.
    pub r2_test: f64,
    pub rmse: f64,
    pub mae: f64,
    /// Mean absolute percentage error of log values, in percent. Observations
    /// with `ln(value) = 0` are skipped.
    pub mape: f64,
    /// Share of consecutive test changes whose sign was predicted correctly.
    pub direction_accuracy: f64,
}

/// Fit on the first `floor(n · train_ratio)` observations and score the rest.
///
/// Errors
/// ------
/// - `InsufficientSplit` unless `0 < train_ratio < 1`, the training block
///   holds at least [`MIN_TRAIN_SIZE`] and the test block at least
///   [`MIN_TEST_SIZE`] observations.
/// - Any baseline fitting error on the training block.
pub fn evaluate_out_of_sample(
    data: &ElasticityData, train_ratio: f64, options: &BaselineOptions,
) -> ElasticityResult<OutOfSampleReport> {
    let n = data.len();
    let train_size = if train_ratio > 0.0 && train_ratio < 1.0 {
        (n as f64 * train_ratio).floor() as usize
    } else {
        0
    };
    let test_size = n - train_size.min(n);
    if train_size < MIN_TRAIN_SIZE || test_size < MIN_TEST_SIZE {
        return Err(ElasticityError::InsufficientSplit { train: train_size, test: test_size });
    }

    let train = ElasticityData::new(
        data.usage().slice(s![..train_size]).to_owned(),
        data.value().slice(s![..train_size]).to_owned(),
    )?;
    let fit = estimate_baseline(&train, options)?;

    let actual = data.log_value().slice(s![train_size..]);
    let predicted = fit.predict_log(data.usage().slice(s![train_size..]));
    let residuals = &actual - &predicted;

    let rmse = (residuals.dot(&residuals) / test_size as f64).sqrt();
    let mae = residuals.iter().map(|e| e.abs()).sum::<f64>() / test_size as f64;
    let r2_test = out_of_sample_r_squared(actual, residuals.view());
    let mape = mean_absolute_percentage_error(actual, residuals.view());
    let direction_accuracy = direction_accuracy(actual, predicted.view());

    debug!(train_size, test_size, r2_test, rmse, "out-of-sample evaluation");
    Ok(OutOfSampleReport {
        train_size,
        test_size,
        beta_train: fit.beta,
        r2_train: fit.r_squared,
        r2_test,
        rmse,
        mae,
        mape,
        direction_accuracy,
    })
}

fn out_of_sample_r_squared(actual: ArrayView1<f64>, residuals: ArrayView1<f64>) -> f64 {
    let mean = actual.mean().unwrap_or(0.0);
    let ss_tot: f64 = actual.iter().map(|&v| (v - mean) * (v - mean)).sum();
    if ss_tot > 0.0 {
        1.0 - residuals.dot(&residuals) / ss_tot
    } else {
        0.0
    }
}

fn mean_absolute_percentage_error(actual: ArrayView1<f64>, residuals: ArrayView1<f64>) -> f64 {
    let (sum, count) = actual
        .iter()
        .zip(residuals.iter())
        .filter(|(y, _)| **y != 0.0)
        .fold((0.0, 0usize), |(s, c), (y, e)| (s + (e / y).abs(), c + 1));
    if count == 0 {
        0.0
    } else {
        100.0 * sum / count as f64
    }
}

fn direction_accuracy(actual: ArrayView1<f64>, predicted: ArrayView1<f64>) -> f64 {
    let changes = actual.len().saturating_sub(1);
    if changes == 0 {
        return 0.0;
    }
    let hits = (1..actual.len())
        .filter(|&t| (actual[t] - actual[t - 1] > 0.0) == (predicted[t] - predicted[t - 1] > 0.0))
        .count();
    hits as f64 / changes as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover the split validation, perfect predictions on
    // noise-free data, and the direction metric on a hand-built sequence.
    // -------------------------------------------------------------------------

    fn power_law(n: usize) -> ElasticityData {
        let usage: Vec<f64> = (0..n).map(|t| (6.0 + 0.05 * t as f64).exp()).collect();
        let value: Vec<f64> = usage.iter().map(|u| 1.5_f64.exp() * u.powf(1.3)).collect();
        ElasticityData::from_slices(&usage, &value).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Noise-free data are predicted perfectly out of sample.
    //
    // Given
    // -----
    // - 60 points of exp(1.5) · usage^1.3, train ratio 0.7.
    //
    // Expect
    // ------
    // - 42 / 18 split, r2_test ≈ 1, rmse ≈ 0, direction accuracy 1.
    fn noise_free_series_is_predicted_exactly() {
        // Arrange
        let data = power_law(60);

        // Act
        let report = evaluate_out_of_sample(&data, 0.7, &BaselineOptions::default()).unwrap();

        // Assert
        assert_eq!(report.train_size, 42);
        assert_eq!(report.test_size, 18);
        assert_relative_eq!(report.beta_train, 1.3, epsilon = 1e-6);
        assert_relative_eq!(report.r2_test, 1.0, epsilon = 1e-6);
        assert!(report.rmse < 1e-6);
        assert!(report.mape < 1e-6);
        assert_eq!(report.direction_accuracy, 1.0);
    }

    #[test]
    // Purpose
    // -------
    // Splits with too little data on either side are rejected.
    //
    // Expect
    // ------
    // - 40 points at 0.5 (train 20): `InsufficientSplit`.
    // - Ratios 0 and 1: `InsufficientSplit`.
    // - 31 points at 0.99 (test 1): `InsufficientSplit`.
    // - 32 points at 0.95 (train 30, test 2): accepted.
    fn small_splits_are_rejected() {
        // Arrange
        let forty = power_law(40);
        let short_test = power_law(31);
        let opts = BaselineOptions::default();

        // Act / Assert
        assert_eq!(
            evaluate_out_of_sample(&forty, 0.5, &opts),
            Err(ElasticityError::InsufficientSplit { train: 20, test: 20 })
        );
        assert!(evaluate_out_of_sample(&forty, 0.0, &opts).is_err());
        assert!(evaluate_out_of_sample(&forty, 1.0, &opts).is_err());
        assert_eq!(
            evaluate_out_of_sample(&short_test, 0.99, &opts),
            Err(ElasticityError::InsufficientSplit { train: 30, test: 1 })
        );
        let minimal = evaluate_out_of_sample(&power_law(32), 0.95, &opts).unwrap();
        assert_eq!((minimal.train_size, minimal.test_size), (30, 2));
    }

    #[test]
    // Purpose
    // -------
    // Direction accuracy counts matching signs of consecutive changes.
    //
    // Given
    // -----
    // - actual [1, 2, 1, 3], predicted [1, 3, 4, 5].
    //
    // Expect
    // ------
    // - Changes agree at steps 1 and 3 only: 2/3.
    fn direction_accuracy_counts_matching_signs() {
        // Arrange
        let actual = ndarray::array![1.0, 2.0, 1.0, 3.0];
        let predicted = ndarray::array![1.0, 3.0, 4.0, 5.0];

        // Act
        let acc = direction_accuracy(actual.view(), predicted.view());

        // Assert
        assert_relative_eq!(acc, 2.0 / 3.0, epsilon = 1e-12);
    }
}
