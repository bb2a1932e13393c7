//! Performance summary of a timestamped usage/value series.
//!
//! Compares the mean of the first and last [`PERFORMANCE_WINDOW`]
//! observations to report the total value return, the usage growth and the
//! value return annualized over the calendar span of the series.
//!
//! Timestamps are read as Unix seconds; a year is 365.25 days.
use crate::elasticity::{
    core::data::ElasticityData,
    errors::{ElasticityError, ElasticityResult},
};
use ndarray::{ArrayView1, s};
use serde::Serialize;
use tracing::debug;

/// Observations averaged at each end of the series.
pub const PERFORMANCE_WINDOW: usize = 30;
/// Seconds in a 365.25-day year.
pub const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;

/// Start-versus-end comparison of a timestamped series. Returns are in
/// percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub window: usize,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    /// Calendar span between the first and last timestamp.
    pub years: f64,
    /// `(mean_last − mean_first)/mean_first · 100` of value.
    pub value_return: f64,
    /// `((1 + value_return/100)^(1/years) − 1) · 100`.
    pub annualized_return: f64,
    /// Same as `value_return`, for usage.
    pub usage_growth: f64,
}

/// Summarize value and usage performance between the two ends of `data`.
///
/// Errors
/// ------
/// - `MissingTimestamps` when `data` carries no timestamps.
/// - `TooFewObservations` unless both end windows fit without overlapping
///   (`2 · PERFORMANCE_WINDOW` points).
pub fn summarize_performance(data: &ElasticityData) -> ElasticityResult<PerformanceSummary> {
    let timestamps = data.timestamps().ok_or(ElasticityError::MissingTimestamps)?;
    let required = 2 * PERFORMANCE_WINDOW;
    let n = data.len();
    if n < required {
        return Err(ElasticityError::TooFewObservations { required, actual: n });
    }

    let start_timestamp = timestamps[0];
    let end_timestamp = timestamps[n - 1];
    // Strictly increasing timestamps keep the span positive.
    let years = (end_timestamp - start_timestamp) as f64 / SECONDS_PER_YEAR;

    let value_return = window_change(data.value().view());
    let usage_growth = window_change(data.usage().view());
    let annualized_return = ((1.0 + value_return / 100.0).powf(1.0 / years) - 1.0) * 100.0;

    debug!(years, value_return, annualized_return, usage_growth, "performance summary");
    Ok(PerformanceSummary {
        window: PERFORMANCE_WINDOW,
        start_timestamp,
        end_timestamp,
        years,
        value_return,
        annualized_return,
        usage_growth,
    })
}

/// Percent change from the mean of the first window to the mean of the last.
///
/// The series is positive, so the first mean is too.
fn window_change(series: ArrayView1<f64>) -> f64 {
    let n = series.len();
    let first = series.slice(s![..PERFORMANCE_WINDOW]).mean().unwrap_or(f64::NAN);
    let last = series.slice(s![n - PERFORMANCE_WINDOW..]).mean().unwrap_or(f64::NAN);
    (last - first) / first * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array1;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover the windowed returns and their annualization, the
    // observations ignored between the windows, and the input checks.
    // -------------------------------------------------------------------------

    const DAY: i64 = 86_400;

    fn daily(usage: Vec<f64>, value: Vec<f64>) -> ElasticityData {
        let n = usage.len() as i64;
        ElasticityData::new(Array1::from(usage), Array1::from(value))
            .unwrap()
            .with_timestamps(Array1::from_iter((0..n).map(|t| 1_600_000_000 + t * DAY)))
            .unwrap()
    }

    fn step_series(n: usize, before: f64, after: f64) -> Vec<f64> {
        (0..n).map(|t| if t < n / 2 { before } else { after }).collect()
    }

    #[test]
    // Purpose
    // -------
    // Windowed means give the total return and growth, annualized over the
    // calendar span.
    //
    // Given
    // -----
    // - 60 daily points; usage steps 100 → 150 and value 1000 → 2000 halfway.
    //
    // Expect
    // ------
    // - value_return 100 %, usage_growth 50 %.
    // - years = 59 / 365.25, annualized = (2^(1/years) − 1) · 100.
    fn step_series_returns_and_annualization() {
        // Arrange
        let data = daily(step_series(60, 100.0, 150.0), step_series(60, 1000.0, 2000.0));

        // Act
        let summary = summarize_performance(&data).unwrap();

        // Assert
        let years = 59.0 / 365.25;
        assert_eq!(summary.window, 30);
        assert_eq!(summary.end_timestamp - summary.start_timestamp, 59 * DAY);
        assert_relative_eq!(summary.years, years, epsilon = 1e-12);
        assert_relative_eq!(summary.value_return, 100.0, epsilon = 1e-9);
        assert_relative_eq!(summary.usage_growth, 50.0, epsilon = 1e-9);
        let annualized = (2.0_f64.powf(1.0 / years) - 1.0) * 100.0;
        assert_relative_eq!(summary.annualized_return, annualized, max_relative = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Only the two end windows enter the comparison.
    //
    // Given
    // -----
    // - 100 points: value 10 in the first 30, 1e6 in the middle 40 and 5 in
    //   the last 30 (a 50 % loss); usage flat.
    //
    // Expect
    // ------
    // - value_return −50 %, usage_growth 0 %, annualized return negative and
    //   above −100 %.
    fn middle_observations_are_ignored() {
        // Arrange
        let value: Vec<f64> = (0..100)
            .map(|t| if t < 30 { 10.0 } else if t < 70 { 1e6 } else { 5.0 })
            .collect();
        let data = daily(vec![7.0; 100], value);

        // Act
        let summary = summarize_performance(&data).unwrap();

        // Assert
        assert_relative_eq!(summary.value_return, -50.0, epsilon = 1e-9);
        assert_relative_eq!(summary.usage_growth, 0.0, epsilon = 1e-12);
        assert!(summary.annualized_return < 0.0 && summary.annualized_return > -100.0);
    }

    #[test]
    // Purpose
    // -------
    // The summary needs timestamps and two non-overlapping windows.
    //
    // Expect
    // ------
    // - 60 points without timestamps: `MissingTimestamps`.
    // - 59 timestamped points: `TooFewObservations { required: 60, actual: 59 }`.
    fn requires_timestamps_and_two_windows() {
        // Arrange
        let untimed = ElasticityData::from_slices(&[2.0; 60], &[3.0; 60]).unwrap();
        let short = daily(vec![2.0; 59], vec![3.0; 59]);

        // Act / Assert
        assert_eq!(summarize_performance(&untimed), Err(ElasticityError::MissingTimestamps));
        assert_eq!(
            summarize_performance(&short),
            Err(ElasticityError::TooFewObservations { required: 60, actual: 59 })
        );
    }
}
