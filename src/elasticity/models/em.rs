//! em — initialization, M-step and the EM driver for Markov-switching fits.
//!
//! Purpose
//! -------
//! Estimate the parameters of
//! `ln(value_t) = α_{s_t} + β_{s_t} ln(usage_t) + ε_t`, `ε_t ~ N(0, σ²_{s_t})`,
//! with a first-order Markov chain `s_t`, by expectation–maximization. The
//! E-step lives in [`hamilton`](super::hamilton); this module provides the
//! starting values, the M-step and the iteration loop.
//!
//! Key behaviors
//! -------------
//! - Split-sample start: the series is cut into `k` contiguous blocks and an
//!   OLS fit per block seeds `(α_i, β_i)`. A block without usage variation
//!   (or with a singular design) falls back to the global OLS with evenly
//!   spaced β offsets. σ² starts at the global OLS residual variance, `P` at
//!   0.9 on the diagonal, initial probabilities uniform.
//! - M-step with switching intercepts: one weighted least-squares fit per
//!   regime with weights `ξ_{t,i}`.
//! - M-step with a shared intercept: one stacked system in
//!   `(α, β_1, …, β_k)` with weights `ξ_{t,i}/σ²_i`.
//! - Variances: weighted residual variance per regime (or pooled), floored
//!   at `VARIANCE_FLOOR`. Transitions: summed smoothed joint probabilities
//!   with flooring and row normalization. Initial probabilities: first
//!   smoothed row.
//! - Stop when `|ΔlogL| < tolerance` (converged), after `max_iter`
//!   iterations or once the time budget is spent (not converged).
//!
//! Invariants & assumptions
//! ------------------------
//! - Data are validated and long enough (`n ≥ 10·k`); the caller checks.
//! - A regime with smoothed mass below `min_regime_mass`, or whose weighted
//!   normal equations are not positive definite, fails the fit with
//!   `DegenerateRegime` instead of being inverted.
use crate::{
    elasticity::{
        core::{
            data::ElasticityData,
            least_squares::{
                intercept_slope_design, ordinary_least_squares, solve_spd, weighted_least_squares,
            },
            options::RegimeOptions,
            regime::{RegimeParams, TransitionMatrix},
        },
        errors::{ElasticityError, ElasticityResult},
        models::hamilton::{EStep, filter_and_smooth, regime_log_densities},
    },
    numerical_stability::transformations::{GENERAL_TOL, VARIANCE_FLOOR, floor_and_normalize},
};
use ndarray::{Array1, Array2, ArrayView1, s};
use std::time::Instant;
use tracing::{debug, warn};

/// Diagonal of the starting transition matrix.
const INITIAL_STAY_PROBABILITY: f64 = 0.9;

/// Spacing of fallback starting slopes around the global OLS slope.
const FALLBACK_BETA_SPACING: f64 = 0.1;

/// Current parameter estimate of the EM iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct EmState {
    pub params: Vec<RegimeParams>,
    pub transition: TransitionMatrix,
    pub initial: Array1<f64>,
}

/// Result of the EM loop, before relabeling.
#[derive(Debug, Clone, PartialEq)]
pub struct EmOutcome {
    pub state: EmState,
    pub estep: EStep,
    pub converged: bool,
    pub iterations: usize,
    /// Log-likelihood at the start values followed by one entry per iteration.
    pub log_likelihood_history: Vec<f64>,
}

/// Run EM from split-sample starting values.
///
/// Errors
/// ------
/// - `Inference(SingularDesign)` if even the global OLS start is singular.
/// - `DegenerateRegime` from any M-step.
pub fn run_em(data: &ElasticityData, options: &RegimeOptions) -> ElasticityResult<EmOutcome> {
    let tolerances = options.tolerances;
    let started = Instant::now();

    let mut state = split_sample_start(data, options)?;
    let mut estep = expectation_step(data, &state);
    let mut history = vec![estep.log_likelihood];
    let mut converged = false;
    let mut iterations = 0;

    for iteration in 1..=tolerances.max_iter {
        let previous = estep.log_likelihood;
        state = maximization_step(data, options, &state, &estep)?;
        estep = expectation_step(data, &state);
        let delta = estep.log_likelihood - previous;
        history.push(estep.log_likelihood);
        iterations = iteration;
        debug!(iteration, log_likelihood = estep.log_likelihood, delta, "EM iteration");

        if delta.abs() < tolerances.tolerance {
            converged = true;
            break;
        }
        if let Some(budget) = tolerances.time_budget {
            if started.elapsed() >= budget {
                warn!(iteration, ?budget, "EM time budget exhausted");
                break;
            }
        }
    }

    if !converged {
        warn!(
            iterations,
            log_likelihood = estep.log_likelihood,
            "EM stopped before the log-likelihood converged"
        );
    }
    Ok(EmOutcome { state, estep, converged, iterations, log_likelihood_history: history })
}

/// Filter and smooth under the current parameters.
pub fn expectation_step(data: &ElasticityData, state: &EmState) -> EStep {
    let log_densities = regime_log_densities(data, &state.params);
    filter_and_smooth(&log_densities, state.transition.as_array(), state.initial.view())
}

/// Split-sample starting values.
pub fn split_sample_start(
    data: &ElasticityData, options: &RegimeOptions,
) -> ElasticityResult<EmState> {
    let k = options.k_regimes;
    let n = data.len();
    let x = data.log_usage().view();
    let y = data.log_value().view();

    let global = ordinary_least_squares(&intercept_slope_design(x), y)?;
    let (global_alpha, global_beta) = (global.coefficients[0], global.coefficients[1]);
    let variance = (global.residuals.dot(&global.residuals) / (n - 2) as f64).max(VARIANCE_FLOOR);

    let block = n / k;
    let mut starts = Vec::with_capacity(k);
    for i in 0..k {
        let end = if i + 1 == k { n } else { (i + 1) * block };
        match block_fit(x.slice(s![i * block..end]), y.slice(s![i * block..end])) {
            Some(coef) => starts.push(coef),
            None => {
                debug!(block = i, "split-sample block degenerate; using global OLS start");
                starts = (0..k)
                    .map(|j| {
                        let offset = (j as f64 - 0.5 * (k - 1) as f64) * FALLBACK_BETA_SPACING;
                        (global_alpha, global_beta + offset)
                    })
                    .collect();
                break;
            }
        }
    }

    let shared_alpha = starts.iter().map(|&(a, _)| a).sum::<f64>() / k as f64;
    let params = starts
        .into_iter()
        .map(|(alpha, beta)| RegimeParams {
            alpha: if options.switching_intercept { alpha } else { shared_alpha },
            beta,
            variance,
        })
        .collect();

    Ok(EmState {
        params,
        transition: TransitionMatrix::persistent(k, INITIAL_STAY_PROBABILITY),
        initial: Array1::from_elem(k, 1.0 / k as f64),
    })
}

fn block_fit(x: ArrayView1<f64>, y: ArrayView1<f64>) -> Option<(f64, f64)> {
    let mean = x.mean()?;
    let sxx: f64 = x.iter().map(|&v| (v - mean) * (v - mean)).sum();
    if x.len() < 3 || sxx <= GENERAL_TOL {
        return None;
    }
    let fit = ordinary_least_squares(&intercept_slope_design(x), y).ok()?;
    Some((fit.coefficients[0], fit.coefficients[1]))
}

/// One M-step given the smoothed probabilities of the previous E-step.
pub fn maximization_step(
    data: &ElasticityData, options: &RegimeOptions, state: &EmState, estep: &EStep,
) -> ElasticityResult<EmState> {
    let k = options.k_regimes;
    let smoothed = &estep.smoothed;
    let masses: Vec<f64> = (0..k).map(|i| smoothed.column(i).sum()).collect();
    for (i, &mass) in masses.iter().enumerate() {
        if mass < options.min_regime_mass {
            return Err(ElasticityError::DegenerateRegime { regime: i + 1, mass });
        }
    }

    let coefficients = if options.switching_intercept {
        switching_intercept_coefficients(data, smoothed, &masses)?
    } else {
        shared_intercept_coefficients(data, smoothed, &state.params, &masses)?
    };
    let variances = regime_variances(data, smoothed, &coefficients, &masses, options);

    let params = coefficients
        .iter()
        .zip(variances)
        .map(|(&(alpha, beta), variance)| RegimeParams { alpha, beta, variance })
        .collect();

    let mut initial = smoothed.row(0).to_vec();
    floor_and_normalize(&mut initial);

    Ok(EmState {
        params,
        transition: TransitionMatrix::from_counts(estep.joint_transitions.clone()),
        initial: Array1::from(initial),
    })
}

fn switching_intercept_coefficients(
    data: &ElasticityData, smoothed: &Array2<f64>, masses: &[f64],
) -> ElasticityResult<Vec<(f64, f64)>> {
    let design = intercept_slope_design(data.log_usage().view());
    let y = data.log_value().view();
    (0..masses.len())
        .map(|i| {
            weighted_least_squares(&design, y, smoothed.column(i))
                .map(|b| (b[0], b[1]))
                .ok_or(ElasticityError::DegenerateRegime { regime: i + 1, mass: masses[i] })
        })
        .collect()
}

/// Stacked weighted normal equations in `(α, β_1, …, β_k)`.
fn shared_intercept_coefficients(
    data: &ElasticityData, smoothed: &Array2<f64>, previous: &[RegimeParams], masses: &[f64],
) -> ElasticityResult<Vec<(f64, f64)>> {
    let k = masses.len();
    let x = data.log_usage();
    let y = data.log_value();
    let mut xtwx = Array2::<f64>::zeros((k + 1, k + 1));
    let mut xtwy = Array1::<f64>::zeros(k + 1);

    for i in 0..k {
        let inv_var = 1.0 / previous[i].variance;
        for t in 0..data.len() {
            let w = smoothed[[t, i]] * inv_var;
            xtwx[[0, 0]] += w;
            xtwx[[0, i + 1]] += w * x[t];
            xtwx[[i + 1, i + 1]] += w * x[t] * x[t];
            xtwy[0] += w * y[t];
            xtwy[i + 1] += w * x[t] * y[t];
        }
        xtwx[[i + 1, 0]] = xtwx[[0, i + 1]];
    }

    let b = solve_spd(&xtwx, xtwy.view()).ok_or_else(|| {
        let (regime, &mass) = masses
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .unwrap_or((0, &0.0));
        ElasticityError::DegenerateRegime { regime: regime + 1, mass }
    })?;
    Ok((0..k).map(|i| (b[0], b[i + 1])).collect())
}

fn regime_variances(
    data: &ElasticityData, smoothed: &Array2<f64>, coefficients: &[(f64, f64)], masses: &[f64],
    options: &RegimeOptions,
) -> Vec<f64> {
    let x = data.log_usage();
    let y = data.log_value();
    let weighted_ssr: Vec<f64> = coefficients
        .iter()
        .enumerate()
        .map(|(i, &(alpha, beta))| {
            (0..data.len())
                .map(|t| {
                    let e = y[t] - alpha - beta * x[t];
                    smoothed[[t, i]] * e * e
                })
                .sum()
        })
        .collect();

    if options.switching_variance {
        weighted_ssr
            .iter()
            .zip(masses)
            .map(|(&ssr, &mass)| (ssr / mass).max(VARIANCE_FLOOR))
            .collect()
    } else {
        let pooled = (weighted_ssr.iter().sum::<f64>() / data.len() as f64).max(VARIANCE_FLOOR);
        vec![pooled; coefficients.len()]
    }
}
