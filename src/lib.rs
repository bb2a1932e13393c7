//! network_elasticity — network-value elasticity estimation with Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that exposes
//! the elasticity estimators to Python via the `_network_elasticity` extension
//! module. When the `python-bindings` feature is enabled, this module defines
//! the Python-facing classes and the `elasticity_models` submodule used by the
//! `network_elasticity` package.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules (`elasticity`, `inference` and
//!   `numerical_stability`) as the public crate surface.
//! - Define `#[pyclass]` wrappers and the `#[pymodule]` initializer for the
//!   `_network_elasticity` Python extension.
//! - Register `network_elasticity.elasticity_models` in `sys.modules` so that
//!   dot-notation imports work as expected.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work is implemented in the inner Rust modules; this file
//!   performs only FFI glue, input conversion and error mapping.
//! - Every `ElasticityError` surfaces in Python as `ValueError` carrying the
//!   Rust `Display` message.
//!
//! Conventions
//! -----------
//! - Regime-indexed outputs are returned as Python lists ordered by regime id
//!   (`[regime 1, regime 2, ...]`); regime ids passed in are 1-based.
//! - Matrices are returned as lists of rows.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend on [`elasticity`] directly (see
//!   [`elasticity::prelude`]) and can ignore the PyO3 items.
//! - The Python packaging layer imports `_network_elasticity` and wraps its
//!   classes in user-facing Python APIs.
//!
//! Testing notes
//! -------------
//! - Core behavior is covered by unit tests in the inner modules and by
//!   `tests/integration_elasticity_pipeline.rs`.

pub mod elasticity;
pub mod inference;
pub mod numerical_stability;

#[cfg(feature = "python-bindings")]
mod utils;

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    elasticity::{
        core::{options::RegimeOptions, regime::RegimeId},
        models::{BaselineElasticityModel, RegimeSwitchingElasticityModel},
    },
    utils::{
        extract_baseline_options, extract_elasticity_data, extract_f64_vec,
        extract_regime_options,
    },
};

/// BaselineElasticity — Python-facing wrapper for the global log-log OLS.
///
/// Purpose
/// -------
/// Expose [`BaselineElasticityModel`] to Python: fit on paired usage/value
/// arrays, read the estimate and its robust inference, predict value levels.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `BaselineElasticity(confidence_level=0.95, cov_type="HC3", distribution="t")`:
/// - `confidence_level`: `Option<f64>` in `(0, 1)`.
/// - `cov_type`: one of `classical`, `HC0`, `HC1`, `HC2`, `HC3`.
/// - `distribution`: `t` (Student-t with n − 2 dof) or `normal`.
///
/// Notes
/// -----
/// - Getters raise `ValueError` before a successful `fit`.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "network_elasticity.elasticity_models")]
pub struct BaselineElasticity {
    inner: BaselineElasticityModel,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl BaselineElasticity {
    #[new]
    #[pyo3(
        signature = (confidence_level = None, cov_type = None, distribution = None),
        text_signature = "(confidence_level=0.95, cov_type='HC3', distribution='t')"
    )]
    pub fn new(
        confidence_level: Option<f64>, cov_type: Option<&str>, distribution: Option<&str>,
    ) -> PyResult<Self> {
        let options = extract_baseline_options(confidence_level, cov_type, distribution)?;
        Ok(BaselineElasticity { inner: BaselineElasticityModel::new(options) })
    }

    /// Fit `ln(value) = α + β ln(usage)` on paired positive series.
    pub fn fit<'py>(
        &mut self, py: Python<'py>, usage: &Bound<'py, PyAny>, value: &Bound<'py, PyAny>,
    ) -> PyResult<()> {
        let data = extract_elasticity_data(py, usage, value)?;
        self.inner.fit(&data)?;
        Ok(())
    }

    /// Predicted value levels `exp(α) · usage^β`.
    pub fn predict<'py>(&self, py: Python<'py>, usage: &Bound<'py, PyAny>) -> PyResult<Vec<f64>> {
        let usage = extract_f64_vec(py, usage, "usage")?;
        Ok(self.inner.predict(&usage)?.to_vec())
    }

    #[getter]
    pub fn alpha(&self) -> PyResult<f64> {
        Ok(self.inner.results()?.alpha)
    }

    #[getter]
    pub fn beta(&self) -> PyResult<f64> {
        Ok(self.inner.results()?.beta)
    }

    #[getter]
    pub fn r_squared(&self) -> PyResult<f64> {
        Ok(self.inner.results()?.r_squared)
    }

    #[getter]
    pub fn std_error(&self) -> PyResult<f64> {
        Ok(self.inner.results()?.std_error)
    }

    #[getter]
    pub fn p_value(&self) -> PyResult<f64> {
        Ok(self.inner.results()?.p_value)
    }

    /// `(lower, upper)` bounds for β.
    #[getter]
    pub fn confidence_interval(&self) -> PyResult<(f64, f64)> {
        let ci = self.inner.results()?.confidence_interval;
        Ok((ci.lower, ci.upper))
    }

    /// `(statistic, p_value)` of `H₀: β = 1`.
    #[getter]
    pub fn linearity_test(&self) -> PyResult<(f64, f64)> {
        let test = self.inner.results()?.linearity_test;
        Ok((test.statistic, test.p_value))
    }

    #[getter]
    pub fn n(&self) -> PyResult<usize> {
        Ok(self.inner.results()?.n)
    }

    #[getter]
    pub fn classification(&self) -> PyResult<&'static str> {
        Ok(self.inner.classify()?.as_str())
    }

    #[getter]
    pub fn is_fitted(&self) -> bool {
        self.inner.is_fitted()
    }

    fn __repr__(&self) -> String {
        self.inner.to_string()
    }
}

/// RegimeSwitchingElasticity — Python-facing wrapper for the Markov-switching
/// elasticity regression.
///
/// Purpose
/// -------
/// Expose [`RegimeSwitchingElasticityModel`] to Python with regime-indexed
/// outputs returned as lists ordered by regime id.
///
/// Parameters
/// ----------
/// Constructed from Python via `RegimeSwitchingElasticity(k_regimes=2, ...)`:
/// - `k_regimes`: number of regimes, at least 2.
/// - `switching_variance` / `switching_intercept`: per-regime σ² and α.
/// - `tol`, `max_iter`, `time_budget_secs`: EM stopping rules.
/// - `ordering`: `ascending` (default) or `descending` by β.
/// - `min_regime_mass`: smoothed mass below which a regime is degenerate.
///
/// Notes
/// -----
/// - `unsendable` because the wrapper is mutated by `fit`; the inner model
///   itself is `Send + Sync`.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "network_elasticity.elasticity_models", unsendable)]
pub struct RegimeSwitchingElasticity {
    inner: RegimeSwitchingElasticityModel,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl RegimeSwitchingElasticity {
    #[new]
    #[pyo3(
        signature = (
            k_regimes = 2,
            switching_variance = RegimeOptions::DEFAULT_SWITCHING_VARIANCE,
            switching_intercept = RegimeOptions::DEFAULT_SWITCHING_INTERCEPT,
            tol = None,
            max_iter = None,
            time_budget_secs = None,
            ordering = None,
            min_regime_mass = None,
        ),
        text_signature = "(k_regimes=2, switching_variance=False, switching_intercept=True, \
                          tol=None, max_iter=None, time_budget_secs=None, ordering=None, \
                          min_regime_mass=None)"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        k_regimes: usize, switching_variance: bool, switching_intercept: bool, tol: Option<f64>,
        max_iter: Option<usize>, time_budget_secs: Option<f64>, ordering: Option<&str>,
        min_regime_mass: Option<f64>,
    ) -> PyResult<Self> {
        let options = extract_regime_options(
            k_regimes,
            switching_variance,
            switching_intercept,
            tol,
            max_iter,
            time_budget_secs,
            ordering,
            min_regime_mass,
        )?;
        Ok(RegimeSwitchingElasticity { inner: RegimeSwitchingElasticityModel::new(options) })
    }

    /// Fit by EM on paired positive series.
    pub fn fit<'py>(
        &mut self, py: Python<'py>, usage: &Bound<'py, PyAny>, value: &Bound<'py, PyAny>,
    ) -> PyResult<()> {
        let data = extract_elasticity_data(py, usage, value)?;
        self.inner.fit(&data)?;
        Ok(())
    }

    /// Predicted value levels under `regime` (1-based), or the current regime.
    #[pyo3(signature = (usage, regime = None))]
    pub fn predict<'py>(
        &self, py: Python<'py>, usage: &Bound<'py, PyAny>, regime: Option<usize>,
    ) -> PyResult<Vec<f64>> {
        let usage = extract_f64_vec(py, usage, "usage")?;
        let regime = match regime {
            Some(id) => Some(RegimeId::new(id, self.inner.options.k_regimes)?),
            None => None,
        };
        Ok(self.inner.predict(&usage, regime)?.to_vec())
    }

    #[getter]
    pub fn alphas(&self) -> PyResult<Vec<f64>> {
        Ok(self.inner.results()?.alphas().values().to_vec())
    }

    #[getter]
    pub fn betas(&self) -> PyResult<Vec<f64>> {
        Ok(self.inner.results()?.betas().values().to_vec())
    }

    #[getter]
    pub fn variances(&self) -> PyResult<Vec<f64>> {
        Ok(self.inner.results()?.variances().values().to_vec())
    }

    #[getter]
    pub fn transition_matrix(&self) -> PyResult<Vec<Vec<f64>>> {
        let fit = self.inner.results()?;
        Ok(fit.transition.as_array().rows().into_iter().map(|r| r.to_vec()).collect())
    }

    #[getter]
    pub fn expected_durations(&self) -> PyResult<Vec<f64>> {
        Ok(self.inner.results()?.expected_durations().values().to_vec())
    }

    /// `n × k` smoothed regime probabilities as a list of rows.
    #[getter]
    pub fn smoothed_probabilities(&self) -> PyResult<Vec<Vec<f64>>> {
        let fit = self.inner.results()?;
        Ok(fit.smoothed.rows().into_iter().map(|r| r.to_vec()).collect())
    }

    #[getter]
    pub fn regime_probabilities(&self) -> PyResult<Vec<f64>> {
        Ok(self.inner.regime_probabilities()?.values().to_vec())
    }

    #[getter]
    pub fn current_regime(&self) -> PyResult<usize> {
        Ok(self.inner.get_current_regime()?.get())
    }

    #[getter]
    pub fn converged(&self) -> PyResult<bool> {
        Ok(self.inner.results()?.converged)
    }

    #[getter]
    pub fn iterations(&self) -> PyResult<usize> {
        Ok(self.inner.results()?.iterations)
    }

    #[getter]
    pub fn log_likelihood(&self) -> PyResult<f64> {
        Ok(self.inner.results()?.log_likelihood)
    }

    #[getter]
    pub fn aic(&self) -> PyResult<f64> {
        Ok(self.inner.results()?.aic)
    }

    #[getter]
    pub fn bic(&self) -> PyResult<f64> {
        Ok(self.inner.results()?.bic)
    }

    #[getter]
    pub fn is_fitted(&self) -> bool {
        self.inner.is_fitted()
    }

    fn __repr__(&self) -> String {
        self.inner.to_string()
    }
}

/// Python module initializer for `_network_elasticity`.
///
/// Creates the `elasticity_models` submodule, registers both classes and
/// inserts `network_elasticity.elasticity_models` into `sys.modules`.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _network_elasticity<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let elasticity_models_mod = PyModule::new(_py, "elasticity_models")?;
    elasticity_models(_py, m, &elasticity_models_mod)?;

    // Manually add the submodule into sys.modules to allow for dot notation.
    _py.import("sys")?
        .getattr("modules")?
        .set_item("network_elasticity.elasticity_models", elasticity_models_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn elasticity_models<'py>(
    _py: Python, network_elasticity: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<BaselineElasticity>()?;
    m.add_class::<RegimeSwitchingElasticity>()?;
    network_elasticity.add_submodule(m)?;
    Ok(())
}
