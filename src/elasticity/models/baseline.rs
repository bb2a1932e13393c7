//! Baseline network-elasticity model: global log-log OLS with robust inference.
//!
//! Fits `ln(value_t) = α + β ln(usage_t) + ε_t` by ordinary least squares and
//! reports β with a heteroskedasticity-consistent standard error (HC3 by
//! default), a confidence interval built from the same covariance, two Wald
//! tests (β = 0 and the unit-elasticity test β = 1), the classical R² and the
//! sustainability classification of the interval.
//!
//! Fit quality (R²) is always computed from the classical decomposition; only
//! the inference side depends on the covariance estimator.
use crate::{
    elasticity::{
        core::{
            classification::{Classification, ConfidenceInterval, HypothesisTest, UNIT_ELASTICITY},
            data::{ElasticityData, validate_positive},
            least_squares::{RegressorScaling, intercept_slope_design, ordinary_least_squares},
            options::BaselineOptions,
            regime::{serialize_rows, serialize_vector},
        },
        errors::{ElasticityError, ElasticityResult, Series},
    },
    inference::{CovarianceType, CriticalDistribution, coefficient_covariance, t_statistic},
    numerical_stability::transformations::GENERAL_TOL,
};
use ndarray::{Array1, Array2, ArrayView1};
use serde::Serialize;
use tracing::debug;

/// Immutable record of a baseline fit.
///
/// Field names are stable: `alpha, beta, r_squared, std_error, p_value,
/// confidence_interval, n, classification` form the published record; the
/// remaining fields carry diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineFit {
    /// Intercept α on the log scale.
    pub alpha: f64,
    /// Elasticity β.
    pub beta: f64,
    /// Classical `1 − SS_res/SS_tot`, clamped to `[0, 1]`.
    pub r_squared: f64,
    /// Standard error of β under `covariance_type`.
    pub std_error: f64,
    /// Standard error of α under `covariance_type`.
    pub alpha_std_error: f64,
    /// Two-sided p-value of `H₀: β = 0`.
    pub p_value: f64,
    pub confidence_interval: ConfidenceInterval,
    pub n: usize,
    pub classification: Classification,
    /// Two-sided test of `H₀: β = 1`.
    pub linearity_test: HypothesisTest,
    /// 2×2 covariance of `(α, β)`.
    #[serde(serialize_with = "serialize_rows")]
    pub covariance: Array2<f64>,
    pub covariance_type: CovarianceType,
    pub critical_distribution: CriticalDistribution,
    /// In-sample fitted `ln(value)`.
    #[serde(serialize_with = "serialize_vector")]
    pub fitted_values: Array1<f64>,
    /// In-sample residuals on the log scale.
    #[serde(serialize_with = "serialize_vector")]
    pub residuals: Array1<f64>,
}

impl BaselineFit {
    /// `exp(α) · usage^β`, element-wise. Inputs are assumed validated.
    pub fn predict_levels(&self, usage: ArrayView1<f64>) -> Array1<f64> {
        let scale = self.alpha.exp();
        usage.mapv(|u| scale * u.powf(self.beta))
    }

    /// `α + β ln(usage)`, element-wise. Inputs are assumed validated.
    pub fn predict_log(&self, usage: ArrayView1<f64>) -> Array1<f64> {
        usage.mapv(|u| self.alpha + self.beta * u.ln())
    }
}

/// BaselineElasticityModel — single-regime log-log regression.
///
/// Holds immutable options and, after a successful [`fit`](Self::fit), the
/// last [`BaselineFit`]. A failed fit leaves any earlier result in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BaselineElasticityModel {
    pub options: BaselineOptions,
    results: Option<BaselineFit>,
}

impl BaselineElasticityModel {
    pub fn new(options: BaselineOptions) -> Self {
        BaselineElasticityModel { options, results: None }
    }

    /// Fit the model and cache the result.
    ///
    /// Steps
    /// -----
    /// 1. Reject a constant `ln(usage)` (`NoUsageVariation`).
    /// 2. OLS of `ln(value)` on `[1, ln(usage)]` via Cholesky.
    /// 3. Coefficient covariance per `options.covariance_type`.
    /// 4. Critical value with `n − 2` degrees of freedom (Student-t) or from
    ///    the standard normal; `CI = β ± c · se`.
    /// 5. p-values for β = 0 and β = 1; classical R²; classification.
    ///
    /// Errors
    /// ------
    /// - `NoUsageVariation` for a constant usage series.
    /// - `Inference(..)` for singular designs or HC2/HC3 leverage at one.
    pub fn fit(&mut self, data: &ElasticityData) -> ElasticityResult<&BaselineFit> {
        let fit = estimate_baseline(data, &self.options)?;
        debug!(
            n = fit.n,
            beta = fit.beta,
            std_error = fit.std_error,
            classification = %fit.classification,
            "baseline elasticity fit"
        );
        Ok(self.results.insert(fit))
    }

    /// Predicted value levels `exp(α) · usage^β`.
    ///
    /// Errors
    /// ------
    /// - `ModelNotFitted` before a successful fit.
    /// - `NonFiniteData` / `NonPositiveData` for invalid usage levels.
    pub fn predict(&self, usage: &[f64]) -> ElasticityResult<Array1<f64>> {
        let fit = self.results()?;
        let usage = ArrayView1::from(usage);
        validate_positive(Series::Usage, usage)?;
        Ok(fit.predict_levels(usage))
    }

    pub fn classify(&self) -> ElasticityResult<Classification> {
        Ok(self.results()?.classification)
    }

    pub fn results(&self) -> ElasticityResult<&BaselineFit> {
        self.results.as_ref().ok_or(ElasticityError::ModelNotFitted)
    }

    pub fn is_fitted(&self) -> bool {
        self.results.is_some()
    }
}

impl std::fmt::Display for BaselineElasticityModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.results {
            None => write!(f, "BaselineElasticityModel(not fitted)"),
            Some(fit) => write!(
                f,
                "BaselineElasticityModel(alpha={:.4}, beta={:.4}, r_squared={:.4})",
                fit.alpha, fit.beta, fit.r_squared
            ),
        }
    }
}

/// Estimate the baseline regression without touching any model state.
pub(crate) fn estimate_baseline(
    data: &ElasticityData, options: &BaselineOptions,
) -> ElasticityResult<BaselineFit> {
    let x = data.log_usage().view();
    let scaling = match RegressorScaling::of(x) {
        Some(scaling) if data.has_usage_variation() => scaling,
        _ => return Err(ElasticityError::NoUsageVariation),
    };
    let n = data.len();
    let y = data.log_value().view();
    let design = intercept_slope_design(scaling.apply(x).view());
    let ls = ordinary_least_squares(&design, y)?;
    let (alpha, beta) = scaling.coefficients(ls.coefficients.view());

    let standardized =
        coefficient_covariance(&design, ls.residuals.view(), &ls.xtx_inv, options.covariance_type)?;
    let covariance = scaling.covariance(&standardized);
    let alpha_std_error = covariance[[0, 0]].max(0.0).sqrt();
    let std_error = covariance[[1, 1]].max(0.0).sqrt();

    let dof = (n - 2) as f64;
    let dist = options.critical_distribution;
    let critical = dist.critical_value(options.confidence_level, dof)?;
    let confidence_interval =
        ConfidenceInterval::symmetric(beta, std_error, critical, options.confidence_level);
    let p_value = dist.two_sided_p_value(t_statistic(beta, 0.0, std_error), dof)?;
    let linearity_statistic = t_statistic(beta, UNIT_ELASTICITY, std_error);
    let linearity_test = HypothesisTest {
        null_value: UNIT_ELASTICITY,
        statistic: linearity_statistic,
        p_value: dist.two_sided_p_value(linearity_statistic, dof)?,
    };

    Ok(BaselineFit {
        alpha,
        beta,
        r_squared: r_squared(y, ls.residuals.view()),
        std_error,
        alpha_std_error,
        p_value,
        confidence_interval,
        n,
        classification: confidence_interval.classify(),
        linearity_test,
        covariance,
        covariance_type: options.covariance_type,
        critical_distribution: dist,
        fitted_values: ls.fitted,
        residuals: ls.residuals,
    })
}

/// Classical coefficient of determination, clamped to `[0, 1]`; `1` when
/// the response has no variation.
pub(crate) fn r_squared(y: ArrayView1<f64>, residuals: ArrayView1<f64>) -> f64 {
    let mean = y.mean().unwrap_or(0.0);
    let ss_tot: f64 = y.iter().map(|&v| (v - mean) * (v - mean)).sum();
    if ss_tot <= GENERAL_TOL {
        return 1.0;
    }
    let ss_res = residuals.dot(&residuals);
    (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}
