//! PyO3 conversion helpers shared by the Python-facing classes in `lib.rs`.
use std::time::Duration;

use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

use crate::{
    elasticity::core::{
        data::ElasticityData,
        options::{BaselineOptions, EmTolerances, RegimeOptions, RegimeOrdering},
    },
    inference::{CovarianceType, CriticalDistribution},
};

use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
};

#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64",
        )
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Copy a 1-D array-like into an owned vector.
pub fn extract_f64_vec<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>, name: &str,
) -> PyResult<Vec<f64>> {
    let arr = extract_f64_array(py, raw_data)?;
    let slice = arr.as_slice().map_err(|_| {
        PyValueError::new_err(format!("{name} must be a 1-D contiguous float64 array or sequence"))
    })?;
    Ok(slice.to_vec())
}

/// Build validated [`ElasticityData`] from paired usage/value array-likes.
pub fn extract_elasticity_data<'py>(
    py: Python<'py>, usage: &Bound<'py, PyAny>, value: &Bound<'py, PyAny>,
) -> PyResult<ElasticityData> {
    let usage = extract_f64_vec(py, usage, "usage")?;
    let value = extract_f64_vec(py, value, "value")?;
    Ok(ElasticityData::from_slices(&usage, &value)?)
}

pub fn extract_baseline_options(
    confidence_level: Option<f64>, cov_type: Option<&str>, distribution: Option<&str>,
) -> PyResult<BaselineOptions> {
    let defaults = BaselineOptions::default();
    let covariance_type = match cov_type {
        Some(name) => parse_covariance_type(name)?,
        None => defaults.covariance_type,
    };
    let critical_distribution = match distribution {
        Some(name) => parse_distribution(name)?,
        None => defaults.critical_distribution,
    };
    let level = confidence_level.unwrap_or(defaults.confidence_level);
    Ok(BaselineOptions::new(level, covariance_type, critical_distribution)?)
}

#[allow(clippy::too_many_arguments)]
pub fn extract_regime_options(
    k_regimes: usize, switching_variance: bool, switching_intercept: bool, tol: Option<f64>,
    max_iter: Option<usize>, time_budget_secs: Option<f64>, ordering: Option<&str>,
    min_regime_mass: Option<f64>,
) -> PyResult<RegimeOptions> {
    let mut tolerances = EmTolerances::new(tol, max_iter)?;
    if let Some(secs) = time_budget_secs {
        let budget = Duration::try_from_secs_f64(secs).map_err(|_| {
            PyValueError::new_err(format!("time_budget_secs must be finite and >= 0, got {secs}"))
        })?;
        tolerances = tolerances.with_time_budget(budget);
    }

    let mut options = RegimeOptions::new(k_regimes, switching_variance)?
        .with_switching_intercept(switching_intercept)
        .with_tolerances(tolerances);
    if let Some(name) = ordering {
        options = options.with_ordering(parse_ordering(name)?);
    }
    if let Some(mass) = min_regime_mass {
        options = options.with_min_regime_mass(mass)?;
    }
    Ok(options)
}

fn parse_covariance_type(name: &str) -> PyResult<CovarianceType> {
    match name.to_lowercase().as_str() {
        "classical" | "nonrobust" | "ols" => Ok(CovarianceType::Classical),
        "hc0" => Ok(CovarianceType::HC0),
        "hc1" => Ok(CovarianceType::HC1),
        "hc2" => Ok(CovarianceType::HC2),
        "hc3" => Ok(CovarianceType::HC3),
        other => Err(PyValueError::new_err(format!(
            "invalid cov_type {:?} (expected 'classical', 'HC0', 'HC1', 'HC2', or 'HC3')",
            other
        ))),
    }
}

fn parse_distribution(name: &str) -> PyResult<CriticalDistribution> {
    match name.to_lowercase().as_str() {
        "t" | "student_t" | "studentt" => Ok(CriticalDistribution::StudentT),
        "normal" | "z" | "gaussian" => Ok(CriticalDistribution::Normal),
        other => Err(PyValueError::new_err(format!(
            "invalid distribution {:?} (expected 't' or 'normal')",
            other
        ))),
    }
}

fn parse_ordering(name: &str) -> PyResult<RegimeOrdering> {
    match name.to_lowercase().as_str() {
        "ascending" | "ascending_beta" => Ok(RegimeOrdering::AscendingBeta),
        "descending" | "descending_beta" => Ok(RegimeOrdering::DescendingBeta),
        other => Err(PyValueError::new_err(format!(
            "invalid ordering {:?} (expected 'ascending' or 'descending')",
            other
        ))),
    }
}
