//! Regime labels, regime-indexed maps and Markov transition matrices.
//!
//! Purpose
//! -------
//! Give the regime-switching model a small, typed vocabulary:
//! - [`RegimeId`]: a validated 1-based regime label (`1..=k`),
//! - [`RegimeMap<T>`]: one `T` per regime, addressable only by [`RegimeId`],
//! - [`RegimeParams`]: the `(α, β, σ²)` record of a single regime,
//! - [`TransitionMatrix`]: a row-stochastic `k×k` matrix with
//!   `P[i][j] = Pr(s_t = j | s_{t−1} = i)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `RegimeId` values are always in `1..=k` for the `k` they were validated
//!   against, and never exceed [`RegimeId::MAX`].
//! - Every `TransitionMatrix` row is non-negative, at least
//!   `PROBABILITY_FLOOR` entry-wise and sums to 1; constructors normalize.
//! - Serialization keys regime maps by their numeric id and writes matrices
//!   as nested row arrays.
use crate::{
    elasticity::errors::{ElasticityError, ElasticityResult},
    numerical_stability::transformations::floor_and_normalize,
};
use ndarray::{Array1, Array2};
use serde::{Serialize, Serializer, ser::SerializeMap};

/// 1-based regime label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RegimeId(u8);

impl RegimeId {
    /// Largest supported number of regimes.
    pub const MAX: usize = u8::MAX as usize;

    /// Validate `id` against a model with `k` regimes.
    ///
    /// # Errors
    /// - `InvalidRegime` unless `1 <= id <= k` (and `k <= MAX`).
    pub fn new(id: usize, k: usize) -> ElasticityResult<Self> {
        if id == 0 || id > k || id > Self::MAX {
            return Err(ElasticityError::InvalidRegime { regime: id, k });
        }
        Ok(RegimeId(id as u8))
    }

    /// Label for a 0-based column index. Callers guarantee `index < k <= MAX`.
    pub(crate) fn from_index(index: usize) -> Self {
        RegimeId((index + 1) as u8)
    }

    /// The 1-based id.
    pub fn get(self) -> usize {
        usize::from(self.0)
    }

    /// The 0-based column index.
    pub fn index(self) -> usize {
        usize::from(self.0) - 1
    }
}

impl std::fmt::Display for RegimeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One value per regime, addressed by [`RegimeId`].
#[derive(Debug, Clone, PartialEq)]
pub struct RegimeMap<T> {
    values: Vec<T>,
}

impl<T> RegimeMap<T> {
    /// Wrap one value per regime, ordered by 0-based column index.
    pub(crate) fn from_vec(values: Vec<T>) -> Self {
        RegimeMap { values }
    }

    /// Number of regimes.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, id: RegimeId) -> Option<&T> {
        self.values.get(id.index())
    }

    /// `(id, value)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (RegimeId, &T)> {
        self.values.iter().enumerate().map(|(i, v)| (RegimeId::from_index(i), v))
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> RegimeMap<U> {
        RegimeMap { values: self.values.iter().map(f).collect() }
    }
}

impl<T> std::ops::Index<RegimeId> for RegimeMap<T> {
    type Output = T;

    fn index(&self, id: RegimeId) -> &T {
        &self.values[id.index()]
    }
}

impl<T: Serialize> Serialize for RegimeMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (id, value) in self.iter() {
            map.serialize_entry(&id, value)?;
        }
        map.end()
    }
}

/// Parameters of a single regime: `ln(value) = α + β ln(usage) + ε`,
/// `ε ~ N(0, σ²)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegimeParams {
    pub alpha: f64,
    pub beta: f64,
    pub variance: f64,
}

impl RegimeParams {
    /// Conditional mean of `ln(value)` given `ln(usage)`.
    #[inline]
    pub fn log_mean(&self, log_usage: f64) -> f64 {
        self.alpha + self.beta * log_usage
    }
}

/// Row-stochastic Markov transition matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix {
    matrix: Array2<f64>,
}

impl TransitionMatrix {
    /// `stay` on the diagonal with the remainder spread evenly over the other
    /// regimes.
    pub(crate) fn persistent(k: usize, stay: f64) -> Self {
        let off = (1.0 - stay) / (k - 1) as f64;
        let matrix = Array2::from_shape_fn((k, k), |(i, j)| if i == j { stay } else { off });
        Self::from_counts(matrix)
    }

    /// Floor and normalize every row of a non-negative weight matrix.
    pub(crate) fn from_counts(mut matrix: Array2<f64>) -> Self {
        for mut row in matrix.rows_mut() {
            if let Some(slice) = row.as_slice_mut() {
                floor_and_normalize(slice);
            } else {
                let mut buf = row.to_vec();
                floor_and_normalize(&mut buf);
                row.iter_mut().zip(buf).for_each(|(dst, src)| *dst = src);
            }
        }
        TransitionMatrix { matrix }
    }

    /// Relabel regimes: new regime `r` is old regime `order[r]`.
    pub(crate) fn permuted(&self, order: &[usize]) -> Self {
        let k = order.len();
        let matrix = Array2::from_shape_fn((k, k), |(i, j)| self.matrix[[order[i], order[j]]]);
        Self::from_counts(matrix)
    }

    /// Number of regimes.
    pub fn k(&self) -> usize {
        self.matrix.nrows()
    }

    /// `Pr(s_t = to | s_{t−1} = from)`.
    pub fn get(&self, from: RegimeId, to: RegimeId) -> f64 {
        self.matrix[[from.index(), to.index()]]
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// Expected number of consecutive periods spent in `id`: `1/(1 − P[i][i])`.
    pub fn expected_duration(&self, id: RegimeId) -> f64 {
        1.0 / (1.0 - self.get(id, id))
    }
}

impl Serialize for TransitionMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_rows(&self.matrix, serializer)
    }
}

/// Write a matrix as nested row arrays.
pub(crate) fn serialize_rows<S: Serializer>(
    matrix: &Array2<f64>, serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(matrix.rows().into_iter().map(|row| row.to_vec()))
}

/// Write a vector as a plain sequence.
pub(crate) fn serialize_vector<S: Serializer>(
    vector: &Array1<f64>, serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(vector.iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - `RegimeId` validation and index conversions.
    // - `RegimeMap` access and map-shaped serialization.
    // - `TransitionMatrix` normalization, relabeling and durations.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Regime ids are 1-based and validated against k.
    //
    // Expect
    // ------
    // - 0 and k+1 fail with `InvalidRegime`; 1..=k succeed with index id−1.
    fn regime_id_is_validated_against_k() {
        // Act / Assert
        assert_eq!(RegimeId::new(0, 2), Err(ElasticityError::InvalidRegime { regime: 0, k: 2 }));
        assert_eq!(RegimeId::new(3, 2), Err(ElasticityError::InvalidRegime { regime: 3, k: 2 }));
        let id = RegimeId::new(2, 2).unwrap();
        assert_eq!(id.get(), 2);
        assert_eq!(id.index(), 1);
        assert_eq!(id.to_string(), "2");
    }

    #[test]
    // Purpose
    // -------
    // Regime maps serialize keyed by numeric id.
    //
    // Given
    // -----
    // - betas [0.5, 1.5].
    //
    // Expect
    // ------
    // - JSON `{"1":0.5,"2":1.5}` and indexed access by id.
    fn regime_map_serializes_as_id_keyed_map() {
        // Arrange
        let betas = RegimeMap::from_vec(vec![0.5, 1.5]);

        // Act
        let json = serde_json::to_string(&betas).unwrap();

        // Assert
        assert_eq!(json, r#"{"1":0.5,"2":1.5}"#);
        assert_eq!(betas[RegimeId::new(2, 2).unwrap()], 1.5);
        assert_eq!(betas.iter().map(|(id, _)| id.get()).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    // Purpose
    // -------
    // Construction normalizes rows and relabeling permutes rows and columns.
    //
    // Given
    // -----
    // - Raw counts [[9, 1], [2, 2]].
    //
    // Expect
    // ------
    // - Rows [[0.9, 0.1], [0.5, 0.5]]; swapped labels give
    //   [[0.5, 0.5], [0.1, 0.9]]; expected duration of regime 1 is 10.
    fn transition_matrix_normalizes_and_permutes() {
        // Arrange
        let p = TransitionMatrix::from_counts(array![[9.0, 1.0], [2.0, 2.0]]);

        // Act
        let swapped = p.permuted(&[1, 0]);

        // Assert
        let r1 = RegimeId::new(1, 2).unwrap();
        let r2 = RegimeId::new(2, 2).unwrap();
        assert_relative_eq!(p.get(r1, r1), 0.9, epsilon = 1e-12);
        assert_relative_eq!(p.get(r2, r1), 0.5, epsilon = 1e-12);
        assert_relative_eq!(swapped.get(r1, r1), 0.5, epsilon = 1e-12);
        assert_relative_eq!(swapped.get(r2, r2), 0.9, epsilon = 1e-12);
        assert_relative_eq!(swapped.get(r2, r1), 0.1, epsilon = 1e-12);
        assert_relative_eq!(p.expected_duration(r1), 10.0, epsilon = 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // The persistent initializer spreads off-diagonal mass evenly.
    //
    // Given
    // -----
    // - k = 3, stay = 0.9.
    //
    // Expect
    // ------
    // - Off-diagonals 0.05; every row sums to 1.
    fn persistent_matrix_spreads_remaining_mass() {
        // Act
        let p = TransitionMatrix::persistent(3, 0.9);

        // Assert
        assert_eq!(p.k(), 3);
        for row in p.as_array().rows() {
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-12);
        }
        assert_relative_eq!(p.as_array()[[0, 2]], 0.05, epsilon = 1e-12);
    }
}
