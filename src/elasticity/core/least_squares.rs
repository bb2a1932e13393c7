//! (Weighted) least squares through the normal equations.
//!
//! Purpose
//! -------
//! Solve `min_b Σ_t w_t (y_t − x_tᵀ b)²` for the small designs used by the
//! elasticity models (two columns for a single regression, `k + 1` columns
//! for the shared-intercept regime M-step). The cross-product `XᵀWX` is
//! assembled with `ndarray` and factorized with a `nalgebra` Cholesky
//! decomposition; no general inverse is formed except when a coefficient
//! covariance is requested.
//!
//! Invariants & assumptions
//! ------------------------
//! - Designs are `n×p` with rows as observations; weights are non-negative.
//! - A cross-product that is not numerically positive definite is reported
//!   as `None` (or `SingularDesign` for plain OLS) and never inverted.
use crate::inference::{InferenceError, InferenceResult};
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use ndarray::{Array1, Array2, ArrayView1, Axis};

/// OLS solution together with `(XᵀX)⁻¹`, as needed by the covariance
/// estimators.
#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresFit {
    pub coefficients: Array1<f64>,
    pub xtx_inv: Array2<f64>,
    pub fitted: Array1<f64>,
    pub residuals: Array1<f64>,
}

/// Design matrix `[1, x]` for a log-log regression.
pub fn intercept_slope_design(x: ArrayView1<f64>) -> Array2<f64> {
    Array2::from_shape_fn((x.len(), 2), |(t, j)| if j == 0 { 1.0 } else { x[t] })
}

/// Affine map `x = center + scale · z` taking a regressor to zero mean and
/// unit (population) variance.
///
/// Fitting `[1, z]` instead of `[1, x]` keeps the cross-product well
/// conditioned when `ln(usage)` moves in a narrow band around a large level;
/// [`Self::coefficients`] and [`Self::covariance`] map the results back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressorScaling {
    pub center: f64,
    pub scale: f64,
}

impl RegressorScaling {
    /// Scaling of `x`, or `None` when `x` is empty or has no spread.
    pub fn of(x: ArrayView1<f64>) -> Option<Self> {
        let center = x.mean()?;
        let ss: f64 = x.iter().map(|&v| (v - center) * (v - center)).sum();
        let scale = (ss / x.len() as f64).sqrt();
        (scale > 0.0 && scale.is_finite()).then_some(RegressorScaling { center, scale })
    }

    pub fn apply(&self, x: ArrayView1<f64>) -> Array1<f64> {
        x.mapv(|v| (v - self.center) / self.scale)
    }

    /// `(intercept, slope)` on the original regressor from the fit on `z`.
    pub fn coefficients(&self, standardized: ArrayView1<f64>) -> (f64, f64) {
        let slope = standardized[1] / self.scale;
        (standardized[0] - self.center * slope, slope)
    }

    /// `T C Tᵀ` with `T = [[1, −center/scale], [0, 1/scale]]`.
    pub fn covariance(&self, standardized: &Array2<f64>) -> Array2<f64> {
        let m = self.center / self.scale;
        let s = 1.0 / self.scale;
        let (c00, c01, c11) = (standardized[[0, 0]], standardized[[0, 1]], standardized[[1, 1]]);
        let off = s * (c01 - m * c11);
        ndarray::array![[c00 - 2.0 * m * c01 + m * m * c11, off], [off, s * s * c11]]
    }
}

/// Ordinary least squares of `y` on `design`.
///
/// # Errors
/// - `SingularDesign` when `XᵀX` is not positive definite.
/// - `DimensionMismatch` when `y` and `design` disagree on `n`.
pub fn ordinary_least_squares(
    design: &Array2<f64>, y: ArrayView1<f64>,
) -> InferenceResult<LeastSquaresFit> {
    if y.len() != design.nrows() {
        return Err(InferenceError::DimensionMismatch { expected: design.nrows(), actual: y.len() });
    }
    let xtx = design.t().dot(design);
    let xty = design.t().dot(&y);
    let chol = factorize(&xtx).ok_or(InferenceError::SingularDesign)?;

    let solution = chol.solve(&DVector::from_iterator(xty.len(), xty.iter().copied()));
    let coefficients = Array1::from_iter(solution.iter().copied());
    let inverse = chol.inverse();
    let p = xtx.nrows();
    let xtx_inv = Array2::from_shape_fn((p, p), |(i, j)| inverse[(i, j)]);
    if !all_finite(coefficients.view()) || xtx_inv.iter().any(|v| !v.is_finite()) {
        return Err(InferenceError::SingularDesign);
    }

    let fitted = design.dot(&coefficients);
    let residuals = &y - &fitted;
    Ok(LeastSquaresFit { coefficients, xtx_inv, fitted, residuals })
}

/// Weighted least squares coefficients, or `None` when `XᵀWX` is not
/// positive definite.
pub fn weighted_least_squares(
    design: &Array2<f64>, y: ArrayView1<f64>, weights: ArrayView1<f64>,
) -> Option<Array1<f64>> {
    let weighted = design * &weights.insert_axis(Axis(1));
    let xtwx = weighted.t().dot(design);
    let xtwy = weighted.t().dot(&y);
    solve_spd(&xtwx, xtwy.view())
}

/// Solve `A b = rhs` for symmetric positive definite `A` via Cholesky.
pub fn solve_spd(a: &Array2<f64>, rhs: ArrayView1<f64>) -> Option<Array1<f64>> {
    let chol = factorize(a)?;
    let solution = chol.solve(&DVector::from_iterator(rhs.len(), rhs.iter().copied()));
    let out = Array1::from_iter(solution.iter().copied());
    all_finite(out.view()).then_some(out)
}

/// Smallest admissible squared Cholesky pivot relative to the largest
/// diagonal entry of the matrix being factorized.
const RELATIVE_PIVOT_TOL: f64 = 1e-12;

/// Cholesky factor of `a`, rejecting matrices that are only positive
/// definite through rounding.
fn factorize(a: &Array2<f64>) -> Option<Cholesky<f64, Dyn>> {
    let scale = a.diag().iter().fold(0.0_f64, |acc, &d| acc.max(d.abs()));
    if !(scale > 0.0 && scale.is_finite()) {
        return None;
    }
    let chol = to_dmatrix(a).cholesky()?;
    let l = chol.l();
    let min_pivot = (0..l.nrows()).map(|i| l[(i, i)] * l[(i, i)]).fold(f64::INFINITY, f64::min);
    (min_pivot > RELATIVE_PIVOT_TOL * scale).then_some(chol)
}

fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

fn all_finite(v: ArrayView1<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}
