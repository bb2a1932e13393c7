//! inference::robust — heteroskedasticity-consistent coefficient covariance.
//!
//! Purpose
//! -------
//! Turn a fitted linear regression (design matrix, residuals and the inverse
//! cross-product `(XᵀX)⁻¹`) into a coefficient covariance matrix. The classical
//! homoskedastic estimator and the White / MacKinnon–White family of sandwich
//! estimators (HC0–HC3) are supported.
//!
//! Key behaviors
//! -------------
//! - [`leverages`] computes the hat-matrix diagonal `h_ii = x_iᵀ (XᵀX)⁻¹ x_i`
//!   without forming the full `n×n` hat matrix.
//! - [`coefficient_covariance`] builds `(XᵀX)⁻¹ XᵀΩX (XᵀX)⁻¹` with
//!   `Ω = diag(ω_i)`, where the weights depend on [`CovarianceType`]:
//!   - `HC0`: `ω_i = e_i²`
//!   - `HC1`: `ω_i = e_i² · n/(n−p)`
//!   - `HC2`: `ω_i = e_i²/(1−h_ii)`
//!   - `HC3`: `ω_i = e_i²/(1−h_ii)²`
//!   - `Classical`: `s²(XᵀX)⁻¹` with `s² = SSR/(n−p)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `design` is `n×p` with `n > p`, `residuals` has length `n` and
//!   `xtx_inv` is the `p×p` inverse of `XᵀX` for the same design.
//! - The returned matrix is symmetrized explicitly.
//! - Under HC2/HC3 an observation with `1 − h_ii ≤ GENERAL_TOL` gets weight
//!   zero. Such a point is interpolated by the fit, so its OLS residual is
//!   zero and it carries no information about the error variance.
use crate::{
    inference::errors::{InferenceError, InferenceResult},
    numerical_stability::transformations::GENERAL_TOL,
};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::Serialize;

/// Coefficient covariance estimator.
///
/// `HC3` is the default: it is the most conservative of the family in small
/// samples and is what the research pipeline this crate supports reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CovarianceType {
    /// Homoskedastic `s²(XᵀX)⁻¹`.
    Classical,
    /// White (1980) estimator.
    HC0,
    /// HC0 with an `n/(n−p)` degrees-of-freedom correction.
    HC1,
    /// Leverage-corrected weights `e²/(1−h)`.
    HC2,
    /// Jackknife-like weights `e²/(1−h)²`.
    #[default]
    HC3,
}

impl CovarianceType {
    /// Per-observation sandwich weights `ω_i`.
    ///
    /// Not meaningful for `Classical`, which scales `(XᵀX)⁻¹` directly.
    fn observation_weights(
        &self, design: &Array2<f64>, residuals: ArrayView1<f64>, xtx_inv: &Array2<f64>,
    ) -> Array1<f64> {
        let (n, p) = design.dim();
        let squared = residuals.mapv(|e| e * e);
        match self {
            CovarianceType::Classical | CovarianceType::HC0 => squared,
            CovarianceType::HC1 => squared * (n as f64 / (n - p) as f64),
            CovarianceType::HC2 | CovarianceType::HC3 => {
                let power = if *self == CovarianceType::HC2 { 1 } else { 2 };
                let hat = leverages(design, xtx_inv);
                let mut weights = Array1::zeros(n);
                for (w, (&e2, &h)) in weights.iter_mut().zip(squared.iter().zip(hat.iter())) {
                    let complement = 1.0 - h;
                    // Leverage one: the residual is zero by construction.
                    if complement > GENERAL_TOL {
                        *w = e2 / complement.powi(power);
                    }
                }
                weights
            }
        }
    }
}

/// Diagonal of the hat matrix `X (XᵀX)⁻¹ Xᵀ`.
///
/// The values sum to `p` (the trace of a projection) up to rounding.
pub fn leverages(design: &Array2<f64>, xtx_inv: &Array2<f64>) -> Array1<f64> {
    let projected = design.dot(xtx_inv);
    (&projected * design).sum_axis(Axis(1))
}

/// coefficient_covariance — classical or sandwich covariance of OLS coefficients.
///
/// Parameters
/// ----------
/// - `design`: `&Array2<f64>`
///   `n×p` design matrix (rows are observations).
/// - `residuals`: `ArrayView1<f64>`
///   OLS residuals `e = y − Xb`, length `n`.
/// - `xtx_inv`: `&Array2<f64>`
///   Inverse cross-product `(XᵀX)⁻¹`, `p×p`.
/// - `cov_type`: `CovarianceType`
///   Estimator to use.
///
/// Returns
/// -------
/// `InferenceResult<Array2<f64>>`
///   Symmetric `p×p` covariance of the coefficient vector.
///
/// Errors
/// ------
/// - `DimensionMismatch` when the inputs disagree on `n` or `p`.
/// - `InvalidDegreesOfFreedom` when `n ≤ p`.
pub fn coefficient_covariance(
    design: &Array2<f64>, residuals: ArrayView1<f64>, xtx_inv: &Array2<f64>,
    cov_type: CovarianceType,
) -> InferenceResult<Array2<f64>> {
    let (n, p) = design.dim();
    if residuals.len() != n {
        return Err(InferenceError::DimensionMismatch { expected: n, actual: residuals.len() });
    }
    if xtx_inv.dim() != (p, p) {
        return Err(InferenceError::DimensionMismatch { expected: p, actual: xtx_inv.nrows() });
    }
    if n <= p {
        return Err(InferenceError::InvalidDegreesOfFreedom { dof: n as f64 - p as f64 });
    }

    let cov = match cov_type {
        CovarianceType::Classical => {
            let s2 = residuals.dot(&residuals) / (n - p) as f64;
            xtx_inv * s2
        }
        _ => {
            let omega = cov_type.observation_weights(design, residuals, xtx_inv);
            let weighted = design * &omega.view().insert_axis(Axis(1));
            let meat = design.t().dot(&weighted);
            xtx_inv.dot(&meat).dot(xtx_inv)
        }
    };
    Ok(symmetrize(cov))
}

fn symmetrize(mut cov: Array2<f64>) -> Array2<f64> {
    let p = cov.nrows();
    for i in 0..p {
        for j in (i + 1)..p {
            let avg = 0.5 * (cov[[i, j]] + cov[[j, i]]);
            cov[[i, j]] = avg;
            cov[[j, i]] = avg;
        }
    }
    cov
}
