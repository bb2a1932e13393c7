//! Numerical stability utilities.
//!
//! Provides log-space helpers for probability recursions that are prone to
//! underflow in naïve form, together with the small floors shared by the
//! estimators.
//!
//! # Provided items
//! - [`PROBABILITY_FLOOR`]: smallest probability kept in transition matrices
//!   and initial distributions (default 1e-12).
//! - [`VARIANCE_FLOOR`]: smallest residual variance accepted by the
//!   regime-switching M-step (default 1e-10).
//! - [`GENERAL_TOL`]: generic tolerance for "numerically one/zero" checks.
//! - [`log_sum_exp(values)`]: stable `ln(Σ exp(v_i))` with a max shift.
//! - [`log_normal_density(residual, variance)`]: Gaussian log-density of a
//!   residual with zero mean.
//! - [`floor_and_normalize(row)`]: clamp a probability row at
//!   [`PROBABILITY_FLOOR`] and rescale it to sum to one.
//!
//! # Rationale
//! Products of per-observation likelihoods underflow `f64` after a few
//! hundred steps; all filtering is therefore carried out on logarithms and
//! renormalized with [`log_sum_exp`].

/// Lower bound for probabilities stored in transition matrices and initial
/// regime distributions.
///
/// Keeps `ln(p)` finite so that log-space recursions never see `-∞` coming
/// from an estimated parameter.
pub const PROBABILITY_FLOOR: f64 = 1e-12;

/// Lower bound for residual variances in the regime-switching model.
///
/// A regime that fits its weighted observations exactly would otherwise
/// drive the Gaussian density to infinity.
pub const VARIANCE_FLOOR: f64 = 1e-10;

/// Generic tolerance for comparisons against 0 and 1.
pub const GENERAL_TOL: f64 = 1e-10;

const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Numerically stable `ln(Σ_i exp(v_i))`.
///
/// Shifts every term by the maximum before exponentiating, so the largest
/// term contributes exactly `exp(0) = 1` and nothing overflows.
///
/// - An empty slice or a slice of `-∞` returns `-∞`.
/// - A `+∞` entry returns `+∞`.
///
/// # Parameters
/// - `values`: log-scale terms.
///
/// # Returns
/// - `ln(Σ exp(v_i))` as `f64`.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = values.iter().map(|&v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Log-density of `N(0, variance)` evaluated at `residual`.
///
/// # Parameters
/// - `residual`: observed deviation from the regression line.
/// - `variance`: strictly positive variance.
///
/// # Returns
/// - `-½ (ln 2π + ln σ² + e²/σ²)`.
#[inline]
pub fn log_normal_density(residual: f64, variance: f64) -> f64 {
    -0.5 * (LN_2PI + variance.ln() + residual * residual / variance)
}

/// Clamp every entry of a probability row at [`PROBABILITY_FLOOR`] and
/// rescale the row so it sums to one.
///
/// Non-finite entries are treated as zero mass before flooring. A row with
/// no usable mass becomes uniform.
pub fn floor_and_normalize(row: &mut [f64]) {
    for p in row.iter_mut() {
        if !p.is_finite() || *p < PROBABILITY_FLOOR {
            *p = PROBABILITY_FLOOR;
        }
    }
    let total: f64 = row.iter().sum();
    if total > 0.0 && total.is_finite() {
        row.iter_mut().for_each(|p| *p /= total);
    } else {
        let uniform = 1.0 / row.len() as f64;
        row.iter_mut().for_each(|p| *p = uniform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Agreement of `log_sum_exp` with the naïve formula on a safe grid and
    //   its behavior in the underflow regime and on degenerate inputs.
    // - `log_normal_density` against the closed-form Gaussian density.
    // - Mass conservation and flooring in `floor_and_normalize`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Check `log_sum_exp` against `ln(Σ exp(v))` where the naïve form is safe.
    //
    // Given
    // -----
    // - Moderate log-values in [-3, 2].
    //
    // Expect
    // ------
    // - Both computations agree to 1e-12.
    fn log_sum_exp_matches_naive_formula_on_safe_inputs() {
        // Arrange
        let values = [-3.0, -0.5, 0.0, 1.25, 2.0];
        let naive: f64 = values.iter().map(|v: &f64| v.exp()).sum::<f64>().ln();

        // Act
        let stable = log_sum_exp(&values);

        // Assert
        assert_relative_eq!(stable, naive, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Ensure `log_sum_exp` stays finite where `exp` underflows to zero.
    //
    // Given
    // -----
    // - Two equal log-values of -2000 (exp(-2000) == 0 in f64).
    //
    // Expect
    // ------
    // - Result equals -2000 + ln 2.
    fn log_sum_exp_survives_underflow_regime() {
        // Arrange
        let values = [-2000.0, -2000.0];

        // Act
        let stable = log_sum_exp(&values);

        // Assert
        assert_relative_eq!(stable, -2000.0 + 2f64.ln(), epsilon = 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // Verify the degenerate branches of `log_sum_exp`.
    //
    // Given
    // -----
    // - An empty slice and a slice containing only -∞.
    //
    // Expect
    // ------
    // - Both return -∞ without producing NaN.
    fn log_sum_exp_degenerate_inputs_return_negative_infinity() {
        assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
        assert_eq!(log_sum_exp(&[f64::NEG_INFINITY, f64::NEG_INFINITY]), f64::NEG_INFINITY);
    }

    #[test]
    // Purpose
    // -------
    // Compare `log_normal_density` with the textbook density.
    //
    // Given
    // -----
    // - residual = 0.3, variance = 0.04.
    //
    // Expect
    // ------
    // - exp(log-density) equals (2πσ²)^(-1/2) exp(-e²/(2σ²)).
    fn log_normal_density_matches_closed_form() {
        // Arrange
        let (e, v) = (0.3_f64, 0.04_f64);
        let expected = (-(e * e) / (2.0 * v)).exp() / (2.0 * std::f64::consts::PI * v).sqrt();

        // Act
        let density = log_normal_density(e, v).exp();

        // Assert
        assert_relative_eq!(density, expected, max_relative = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Check that `floor_and_normalize` floors zeros and conserves mass.
    //
    // Given
    // -----
    // - A row with an exact zero and a NaN entry.
    // - A row with no usable mass at all.
    //
    // Expect
    // ------
    // - Every entry ≥ PROBABILITY_FLOOR and each row sums to one.
    // - The empty row becomes uniform.
    fn floor_and_normalize_floors_and_conserves_mass() {
        // Arrange
        let mut row = [0.7, 0.0, f64::NAN];
        let mut empty = [0.0, 0.0];

        // Act
        floor_and_normalize(&mut row);
        floor_and_normalize(&mut empty);

        // Assert
        assert!(row.iter().all(|&p| p >= PROBABILITY_FLOOR * 0.5));
        assert_relative_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(empty[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(empty[1], 0.5, epsilon = 1e-12);
    }
}
