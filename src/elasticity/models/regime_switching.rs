//! Markov-switching network-elasticity model.
//!
//! Purpose
//! -------
//! Let the elasticity β (and the intercept, and optionally the residual
//! variance) change over time with a latent k-state Markov chain. Estimation
//! is EM (see [`em`](super::em)); this module validates inputs, relabels the
//! regimes canonically, assembles the immutable [`RegimeFit`] record and
//! exposes the model-level API (`fit`, `predict`, `get_current_regime`).
//!
//! Key behaviors
//! -------------
//! - Regimes are exchangeable up to relabeling; after EM they are sorted by
//!   β according to [`RegimeOrdering`], and parameters, transition rows and
//!   columns, smoothed/filtered columns and initial probabilities are
//!   permuted together.
//! - Information criteria use `p = k(k−1) + #intercepts + k + #variances`.
//! - A fit that stops on the iteration cap or time budget is returned with
//!   `converged = false`; it is never an error.
//!
//! Invariants & assumptions
//! ------------------------
//! - `n ≥ 10·k` (`UnderIdentifiedModel` otherwise) and `ln(usage)` varies.
//! - Smoothed and filtered rows sum to one; `P` is row-stochastic.
use crate::elasticity::{
    core::{
        data::{ElasticityData, validate_positive},
        options::{RegimeOptions, RegimeOrdering},
        regime::{RegimeId, RegimeMap, RegimeParams, TransitionMatrix, serialize_rows},
    },
    errors::{ElasticityError, ElasticityResult, Series},
    models::em::{EmOutcome, run_em},
};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Serialize, Serializer, ser::SerializeStruct};
use tracing::info;

/// Immutable record of a regime-switching fit, labeled canonically.
#[derive(Debug, Clone, PartialEq)]
pub struct RegimeFit {
    /// Per-regime `(α, β, σ²)`.
    pub params: RegimeMap<RegimeParams>,
    /// `P[i][j] = Pr(s_t = j | s_{t−1} = i)`.
    pub transition: TransitionMatrix,
    /// `n×k` smoothed probabilities; column `i` belongs to regime `i + 1`.
    pub smoothed: Array2<f64>,
    /// `n×k` filtered probabilities.
    pub filtered: Array2<f64>,
    pub initial_probabilities: RegimeMap<f64>,
    pub converged: bool,
    pub iterations: usize,
    pub log_likelihood: f64,
    /// Log-likelihood at the start values and after every EM iteration.
    pub log_likelihood_history: Vec<f64>,
    pub aic: f64,
    pub bic: f64,
    pub n: usize,
    pub n_parameters: usize,
    pub switching_variance: bool,
    pub switching_intercept: bool,
}

impl RegimeFit {
    pub fn k_regimes(&self) -> usize {
        self.params.len()
    }

    pub fn alphas(&self) -> RegimeMap<f64> {
        self.params.map(|p| p.alpha)
    }

    pub fn betas(&self) -> RegimeMap<f64> {
        self.params.map(|p| p.beta)
    }

    pub fn variances(&self) -> RegimeMap<f64> {
        self.params.map(|p| p.variance)
    }

    /// One map of smoothed probabilities per observation.
    pub fn smoothed_probabilities(&self) -> Vec<RegimeMap<f64>> {
        self.smoothed.rows().into_iter().map(|row| RegimeMap::from_vec(row.to_vec())).collect()
    }

    /// Smoothed probabilities of the last observation.
    pub fn regime_probabilities(&self) -> RegimeMap<f64> {
        RegimeMap::from_vec(self.smoothed.row(self.n - 1).to_vec())
    }

    /// `1 / (1 − P[i][i])` for every regime.
    pub fn expected_durations(&self) -> RegimeMap<f64> {
        RegimeMap::from_vec(
            (0..self.k_regimes())
                .map(|i| self.transition.expected_duration(RegimeId::from_index(i)))
                .collect(),
        )
    }

    /// Argmax of the last smoothed row; ties resolve to the lowest id.
    pub fn current_regime(&self) -> RegimeId {
        let last = self.smoothed.row(self.n - 1);
        let best = last
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |acc, (i, &p)| if p > acc.1 { (i, p) } else { acc });
        RegimeId::from_index(best.0)
    }
}

impl Serialize for RegimeFit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Rows<'a>(&'a Array2<f64>);
        impl Serialize for Rows<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serialize_rows(self.0, serializer)
            }
        }

        let mut state = serializer.serialize_struct("RegimeFit", 17)?;
        state.serialize_field("params", &self.params)?;
        state.serialize_field("alphas", &self.alphas())?;
        state.serialize_field("betas", &self.betas())?;
        state.serialize_field("variances", &self.variances())?;
        state.serialize_field("transition", &self.transition)?;
        state.serialize_field("expected_durations", &self.expected_durations())?;
        state.serialize_field("smoothed", &Rows(&self.smoothed))?;
        state.serialize_field("initial_probabilities", &self.initial_probabilities)?;
        state.serialize_field("current_regime", &self.current_regime())?;
        state.serialize_field("converged", &self.converged)?;
        state.serialize_field("iterations", &self.iterations)?;
        state.serialize_field("log_likelihood", &self.log_likelihood)?;
        state.serialize_field("aic", &self.aic)?;
        state.serialize_field("bic", &self.bic)?;
        state.serialize_field("n", &self.n)?;
        state.serialize_field("switching_variance", &self.switching_variance)?;
        state.serialize_field("switching_intercept", &self.switching_intercept)?;
        state.end()
    }
}

/// RegimeSwitchingElasticityModel — k-regime Markov-switching log-log
/// regression.
///
/// Holds immutable options and, after a successful [`fit`](Self::fit), the
/// last [`RegimeFit`]. A failed fit leaves any earlier result in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegimeSwitchingElasticityModel {
    pub options: RegimeOptions,
    results: Option<RegimeFit>,
}

impl RegimeSwitchingElasticityModel {
    pub fn new(options: RegimeOptions) -> Self {
        RegimeSwitchingElasticityModel { options, results: None }
    }

    /// Fit by EM and cache the canonically labeled result.
    ///
    /// Errors
    /// ------
    /// - `UnderIdentifiedModel` when `n < 10·k` (checked before any work).
    /// - `NoUsageVariation` for a constant usage series.
    /// - `DegenerateRegime` when a regime collapses during EM.
    pub fn fit(&mut self, data: &ElasticityData) -> ElasticityResult<&RegimeFit> {
        let required = self.options.min_observations();
        if data.len() < required {
            return Err(ElasticityError::UnderIdentifiedModel {
                n: data.len(),
                k: self.options.k_regimes,
                required,
            });
        }
        if !data.has_usage_variation() {
            return Err(ElasticityError::NoUsageVariation);
        }

        let outcome = run_em(data, &self.options)?;
        let fit = assemble_fit(outcome, &self.options, data.len());
        info!(
            k_regimes = fit.k_regimes(),
            converged = fit.converged,
            iterations = fit.iterations,
            log_likelihood = fit.log_likelihood,
            "regime-switching elasticity fit"
        );
        Ok(self.results.insert(fit))
    }

    /// Predicted value levels `exp(α_r) · usage^β_r` under regime `r`
    /// (the current regime when `None`).
    ///
    /// Errors
    /// ------
    /// - `ModelNotFitted` before a successful fit.
    /// - `InvalidRegime` for ids outside `1..=k`.
    /// - `NonFiniteData` / `NonPositiveData` for invalid usage levels.
    pub fn predict(
        &self, usage: &[f64], regime: Option<RegimeId>,
    ) -> ElasticityResult<Array1<f64>> {
        let fit = self.results()?;
        let id = match regime {
            Some(id) => RegimeId::new(id.get(), fit.k_regimes())?,
            None => fit.current_regime(),
        };
        let usage = ArrayView1::from(usage);
        validate_positive(Series::Usage, usage)?;
        let p = fit.params[id];
        let scale = p.alpha.exp();
        Ok(usage.mapv(|u| scale * u.powf(p.beta)))
    }

    pub fn get_current_regime(&self) -> ElasticityResult<RegimeId> {
        Ok(self.results()?.current_regime())
    }

    pub fn regime_probabilities(&self) -> ElasticityResult<RegimeMap<f64>> {
        Ok(self.results()?.regime_probabilities())
    }

    pub fn results(&self) -> ElasticityResult<&RegimeFit> {
        self.results.as_ref().ok_or(ElasticityError::ModelNotFitted)
    }

    pub fn is_fitted(&self) -> bool {
        self.results.is_some()
    }
}

impl std::fmt::Display for RegimeSwitchingElasticityModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let k = self.options.k_regimes;
        match &self.results {
            None => write!(f, "RegimeSwitchingElasticityModel(k_regimes={k}, not fitted)"),
            Some(fit) => {
                write!(f, "RegimeSwitchingElasticityModel(k_regimes={k}")?;
                for (id, p) in fit.params.iter() {
                    write!(f, ", beta_{id}={:.4}", p.beta)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Column order that sorts regimes by β.
fn canonical_order(params: &[RegimeParams], ordering: RegimeOrdering) -> Vec<usize> {
    let mut order: Vec<usize> = (0..params.len()).collect();
    order.sort_by(|&a, &b| {
        let cmp = params[a].beta.total_cmp(&params[b].beta);
        match ordering {
            RegimeOrdering::AscendingBeta => cmp,
            RegimeOrdering::DescendingBeta => cmp.reverse(),
        }
    });
    order
}

fn assemble_fit(outcome: EmOutcome, options: &RegimeOptions, n: usize) -> RegimeFit {
    let EmOutcome { state, estep, converged, iterations, log_likelihood_history } = outcome;
    let order = canonical_order(&state.params, options.ordering);

    let params = RegimeMap::from_vec(order.iter().map(|&i| state.params[i]).collect());
    let initial = RegimeMap::from_vec(order.iter().map(|&i| state.initial[i]).collect());
    let n_parameters = options.n_parameters();
    let log_likelihood = estep.log_likelihood;
    let p = n_parameters as f64;

    RegimeFit {
        params,
        transition: state.transition.permuted(&order),
        smoothed: estep.smoothed.select(Axis(1), &order),
        filtered: estep.filtered.select(Axis(1), &order),
        initial_probabilities: initial,
        converged,
        iterations,
        log_likelihood,
        log_likelihood_history,
        aic: 2.0 * p - 2.0 * log_likelihood,
        bic: p * (n as f64).ln() - 2.0 * log_likelihood,
        n,
        n_parameters,
        switching_variance: options.switching_variance,
        switching_intercept: options.switching_intercept,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elasticity::core::options::EmTolerances;
    use approx::assert_relative_eq;
    use ndarray::array;
    use std::time::Duration;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Canonical ordering and its effect on every regime-indexed output.
    // - Lifecycle errors, regime validation and `Display`.
    // - Iteration cap and time budget yielding non-converged fits.
    // - Information criteria bookkeeping.
    //
    // Recovery of simulated regimes on a long series is exercised in the
    // integration tests.
    // -------------------------------------------------------------------------

    fn two_regime_data(n_each: usize) -> ElasticityData {
        let mut usage = Vec::new();
        let mut value = Vec::new();
        for t in 0..2 * n_each {
            let x = 8.0 + 3.0 * ((t as f64) * 0.37).sin().abs() + 0.01 * t as f64;
            let (alpha, beta) = if t < n_each { (3.0, 0.4) } else { (-1.0, 1.6) };
            let noise = 0.03 * ((t as f64) * 1.3).cos();
            usage.push(x.exp());
            value.push((alpha + beta * x + noise).exp());
        }
        ElasticityData::from_slices(&usage, &value).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Betas come out sorted per the requested ordering, with matching
    // transition rows and probability columns.
    //
    // Given
    // -----
    // - The same data fitted with ascending and descending ordering.
    //
    // Expect
    // ------
    // - Ascending: β₁ < β₂; descending: β₁ > β₂.
    // - Descending results are the ascending ones with labels swapped.
    fn regimes_are_relabeled_by_beta() {
        // Arrange
        let data = two_regime_data(50);
        let mut asc = RegimeSwitchingElasticityModel::default();
        let mut desc = RegimeSwitchingElasticityModel::new(
            RegimeOptions::default().with_ordering(RegimeOrdering::DescendingBeta),
        );

        // Act
        let a = asc.fit(&data).unwrap().clone();
        let d = desc.fit(&data).unwrap().clone();

        // Assert
        let r1 = RegimeId::new(1, 2).unwrap();
        let r2 = RegimeId::new(2, 2).unwrap();
        assert!(a.params[r1].beta < a.params[r2].beta);
        assert!(d.params[r1].beta > d.params[r2].beta);
        assert_relative_eq!(a.params[r1].beta, d.params[r2].beta, epsilon = 1e-12);
        assert_relative_eq!(a.transition.get(r1, r2), d.transition.get(r2, r1), epsilon = 1e-12);
        assert_relative_eq!(a.smoothed[[0, 0]], d.smoothed[[0, 1]], epsilon = 1e-12);
        assert_relative_eq!(a.filtered[[10, 1]], d.filtered[[10, 0]], epsilon = 1e-12);
        assert_eq!(a.current_regime().get() + d.current_regime().get(), 3);
    }

    #[test]
    // Purpose
    // -------
    // Reads before a fit fail and too-short series are under-identified.
    //
    // Expect
    // ------
    // - `ModelNotFitted` from predict/get_current_regime/results.
    // - 19 points for k = 2: `UnderIdentifiedModel { required: 20 }`.
    // - Display before fit names k and "not fitted".
    fn lifecycle_and_identification_errors() {
        // Arrange
        let mut model = RegimeSwitchingElasticityModel::default();
        let usage: Vec<f64> = (1..=19).map(f64::from).collect();
        let short = ElasticityData::from_slices(&usage, &usage).unwrap();

        // Act / Assert
        assert_eq!(model.predict(&[1.0], None), Err(ElasticityError::ModelNotFitted));
        assert_eq!(model.get_current_regime(), Err(ElasticityError::ModelNotFitted));
        assert_eq!(model.to_string(), "RegimeSwitchingElasticityModel(k_regimes=2, not fitted)");
        assert_eq!(
            model.fit(&short).unwrap_err(),
            ElasticityError::UnderIdentifiedModel { n: 19, k: 2, required: 20 }
        );
        assert!(!model.is_fitted());
    }

    #[test]
    // Purpose
    // -------
    // Predictions use the requested (or current) regime and validate ids.
    //
    // Expect
    // ------
    // - Regime 3 (valid for k = 3) on a 2-regime fit:
    //   `InvalidRegime { regime: 3, k: 2 }`.
    // - `None` equals passing the current regime explicitly.
    fn predict_validates_regime_ids() {
        // Arrange
        let mut model = RegimeSwitchingElasticityModel::default();
        model.fit(&two_regime_data(40)).unwrap();
        let current = model.get_current_regime().unwrap();
        let foreign = RegimeId::new(3, 3).unwrap();

        // Act
        let bad = model.predict(&[1000.0], Some(foreign)).unwrap_err();
        let implicit = model.predict(&[1000.0], None).unwrap();
        let explicit = model.predict(&[1000.0], Some(current)).unwrap();

        // Assert
        assert_eq!(bad, ElasticityError::InvalidRegime { regime: 3, k: 2 });
        assert_eq!(implicit, explicit);
        assert!(model.to_string().contains("beta_1="));
    }

    #[test]
    // Purpose
    // -------
    // Capped or time-limited runs are flagged, not failed, and keep P valid.
    //
    // Given
    // -----
    // - max_iter = 1; and a zero time budget.
    //
    // Expect
    // ------
    // - converged = false, iterations = 1, rows of P sum to 1.
    fn capped_runs_are_flagged_not_failed() {
        // Arrange
        let data = two_regime_data(40);
        let capped = RegimeOptions::default()
            .with_tolerances(EmTolerances::new(None, Some(1)).unwrap());
        let budget = RegimeOptions::default()
            .with_tolerances(EmTolerances::default().with_time_budget(Duration::ZERO));

        // Act
        let a = RegimeSwitchingElasticityModel::new(capped).fit(&data).unwrap().clone();
        let b = RegimeSwitchingElasticityModel::new(budget).fit(&data).unwrap().clone();

        // Assert
        for fit in [&a, &b] {
            assert!(!fit.converged);
            assert_eq!(fit.iterations, 1);
            for row in fit.transition.as_array().rows() {
                assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Information criteria follow the parameter count.
    //
    // Expect
    // ------
    // - p = 7 for the default two-regime model;
    //   aic = 14 − 2 logL and bic = 7 ln n − 2 logL.
    fn information_criteria_use_parameter_count() {
        // Arrange
        let data = two_regime_data(30);
        let mut model = RegimeSwitchingElasticityModel::default();

        // Act
        let fit = model.fit(&data).unwrap();

        // Assert
        assert_eq!(fit.n_parameters, 7);
        assert_relative_eq!(fit.aic, 14.0 - 2.0 * fit.log_likelihood, epsilon = 1e-9);
        assert_relative_eq!(
            fit.bic,
            7.0 * (60.0_f64).ln() - 2.0 * fit.log_likelihood,
            epsilon = 1e-9
        );
        assert_eq!(fit.log_likelihood_history.len(), fit.iterations + 1);
    }

    #[test]
    // Purpose
    // -------
    // Ties in the last smoothed row resolve to the lowest id.
    //
    // Given
    // -----
    // - A hand-built fit whose last smoothed row is [0.5, 0.5].
    //
    // Expect
    // ------
    // - current_regime = 1; expected durations 1/(1 − p_ii).
    fn current_regime_breaks_ties_toward_lowest_id() {
        // Arrange
        let params = RegimeParams { alpha: 0.0, beta: 1.0, variance: 1.0 };
        let fit = RegimeFit {
            params: RegimeMap::from_vec(vec![params, params]),
            transition: TransitionMatrix::from_counts(array![[0.8, 0.2], [0.5, 0.5]]),
            smoothed: array![[0.9, 0.1], [0.5, 0.5]],
            filtered: array![[0.9, 0.1], [0.5, 0.5]],
            initial_probabilities: RegimeMap::from_vec(vec![0.5, 0.5]),
            converged: true,
            iterations: 1,
            log_likelihood: 0.0,
            log_likelihood_history: vec![0.0, 0.0],
            aic: 0.0,
            bic: 0.0,
            n: 2,
            n_parameters: 7,
            switching_variance: false,
            switching_intercept: true,
        };

        // Act
        let current = fit.current_regime();
        let durations = fit.expected_durations();

        // Assert
        assert_eq!(current.get(), 1);
        assert_relative_eq!(durations.values()[0], 5.0, epsilon = 1e-9);
        assert_relative_eq!(durations.values()[1], 2.0, epsilon = 1e-9);
        assert_eq!(fit.smoothed_probabilities().len(), 2);
    }
}
