//! Distances in the encoded feature space.

use nalgebra::{DMatrix, DVector};

/// Squared Euclidean distance between row `row` of `m` and `query`.
///
/// Squared distances preserve neighbour ordering, so the square root is only
/// taken when a caller needs the actual distance.
pub fn squared_euclidean_to_row(m: &DMatrix<f64>, row: usize, query: &DVector<f64>) -> f64 {
    m.row(row)
        .iter()
        .zip(query.iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum()
}
