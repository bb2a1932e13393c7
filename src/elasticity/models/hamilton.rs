//! hamilton — log-space Hamilton filter and Kim smoother (EM E-step).
//!
//! Purpose
//! -------
//! Compute, for a k-regime Markov-switching regression with Gaussian errors,
//! the filtered probabilities `Pr(s_t | y_≤t)`, the smoothed probabilities
//! `Pr(s_t | y_1..n)`, the summed smoothed joint transition probabilities
//! `Σ_t Pr(s_t = i, s_{t+1} = j | y_1..n)` and the log-likelihood.
//!
//! Key behaviors
//! -------------
//! - Forward pass (Hamilton): `log ξ_{t|t−1} + log N(e_t; 0, σ²_i)`,
//!   normalized with log-sum-exp; the normalizers sum to the log-likelihood.
//! - Backward pass (Kim):
//!   `log ξ_{t|n}(i) = log ξ_{t|t}(i) + LSE_j(ln P_ij + log ξ_{t+1|n}(j) − log ξ_{t+1|t}(j))`,
//!   with the joint term
//!   `log ξ_{t,t+1|n}(i, j) = log ξ_{t|t}(i) + ln P_ij + log ξ_{t+1|n}(j) − log ξ_{t+1|t}(j)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Transition entries and initial probabilities are floored upstream, so
//!   their logarithms are finite.
//! - Every recursion stays in log space; probabilities are exponentiated only
//!   when the outputs are assembled, and output rows are renormalized.
//!
//! Performance
//! -----------
//! - O(n·k²) time and O(n·k) memory for both passes.
use crate::{
    elasticity::core::{data::ElasticityData, regime::RegimeParams},
    numerical_stability::transformations::{log_normal_density, log_sum_exp},
};
use ndarray::{Array2, ArrayView1, Axis};

/// Output of one E-step.
#[derive(Debug, Clone, PartialEq)]
pub struct EStep {
    /// `n×k` filtered probabilities `Pr(s_t = i | y_≤t)`.
    pub filtered: Array2<f64>,
    /// `n×k` smoothed probabilities `Pr(s_t = i | y_1..n)`.
    pub smoothed: Array2<f64>,
    /// `k×k` summed smoothed joint probabilities of consecutive regimes.
    pub joint_transitions: Array2<f64>,
    pub log_likelihood: f64,
}

/// `n×k` matrix of `log N(y_t − α_i − β_i x_t; 0, σ²_i)`.
pub fn regime_log_densities(data: &ElasticityData, params: &[RegimeParams]) -> Array2<f64> {
    let x = data.log_usage();
    let y = data.log_value();
    Array2::from_shape_fn((data.len(), params.len()), |(t, i)| {
        let p = &params[i];
        log_normal_density(y[t] - p.log_mean(x[t]), p.variance)
    })
}

/// Run the Hamilton filter and Kim smoother on precomputed log densities.
///
/// Parameters
/// ----------
/// - `log_densities`: `n×k` per-regime observation log densities.
/// - `transition`: `k×k` row-stochastic matrix, `P[i][j] = Pr(j | i)`.
/// - `initial`: length-`k` distribution of `s_0` (before observing `y_0`).
///
/// Returns
/// -------
/// [`EStep`] with filtered/smoothed marginals, summed joint transitions and
/// the log-likelihood `Σ_t log p(y_t | y_<t)`.
pub fn filter_and_smooth(
    log_densities: &Array2<f64>, transition: &Array2<f64>, initial: ArrayView1<f64>,
) -> EStep {
    let (n, k) = log_densities.dim();
    let log_p = transition.mapv(f64::ln);

    // ---- Forward pass ----
    let mut predicted = Array2::<f64>::zeros((n, k));
    let mut filtered = Array2::<f64>::zeros((n, k));
    let mut log_likelihood = 0.0;
    let mut scratch = vec![0.0; k];

    for i in 0..k {
        predicted[[0, i]] = initial[i].ln();
    }
    for t in 0..n {
        for i in 0..k {
            scratch[i] = predicted[[t, i]] + log_densities[[t, i]];
        }
        let norm = log_sum_exp(&scratch);
        log_likelihood += norm;
        for i in 0..k {
            filtered[[t, i]] = scratch[i] - norm;
        }
        if t + 1 < n {
            for j in 0..k {
                for i in 0..k {
                    scratch[i] = filtered[[t, i]] + log_p[[i, j]];
                }
                predicted[[t + 1, j]] = log_sum_exp(&scratch);
            }
        }
    }

    // ---- Backward pass ----
    let mut smoothed = Array2::<f64>::zeros((n, k));
    let mut joint_transitions = Array2::<f64>::zeros((k, k));
    smoothed.row_mut(n - 1).assign(&filtered.row(n - 1));
    let mut ratio = vec![0.0; k];

    for t in (0..n - 1).rev() {
        for j in 0..k {
            ratio[j] = smoothed[[t + 1, j]] - predicted[[t + 1, j]];
        }
        for i in 0..k {
            for j in 0..k {
                scratch[j] = filtered[[t, i]] + log_p[[i, j]] + ratio[j];
            }
            smoothed[[t, i]] = log_sum_exp(&scratch);
            for j in 0..k {
                joint_transitions[[i, j]] += scratch[j].exp();
            }
        }
    }

    EStep {
        filtered: normalized_rows(filtered),
        smoothed: normalized_rows(smoothed),
        joint_transitions,
        log_likelihood,
    }
}

/// Exponentiate log-probability rows and renormalize them to sum to one.
fn normalized_rows(mut log_rows: Array2<f64>) -> Array2<f64> {
    for mut row in log_rows.axis_iter_mut(Axis(0)) {
        let norm = log_sum_exp(&row.to_vec());
        row.mapv_inplace(|v| (v - norm).exp());
    }
    log_rows
}
