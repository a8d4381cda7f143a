//! Distance metrics shared by every index

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::vector::{dot, norm};

/// Distance metrics for measuring vector dissimilarity (smaller is closer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Squared Euclidean (L2) distance
    #[default]
    SquaredEuclidean,
    /// Cosine distance: 1 - cosine similarity
    Cosine,
}

impl DistanceMetric {
    /// Compute the distance between two vectors of equal length.
    ///
    /// Callers validate dimensions at the index boundary; mismatched slices
    /// are compared over their common prefix.
    #[inline]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::SquaredEuclidean => squared_euclidean(a, b),
            DistanceMetric::Cosine => cosine_distance(a, b),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::SquaredEuclidean => "squared_euclidean",
            DistanceMetric::Cosine => "cosine",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Squared Euclidean distance between two vectors
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Cosine distance (1 - cosine similarity).
///
/// A zero vector has no direction; it is treated as orthogonal to everything,
/// giving distance 1.0.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = norm(a);
    let norm_b = norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    // Clamp to [-1, 1] to absorb floating point error
    let similarity = (dot(a, b) / (norm_a * norm_b)).clamp(-1.0, 1.0);
    1.0 - similarity
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_squared_euclidean() {
        let dist = squared_euclidean(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]);
        assert_relative_eq!(dist, 27.0, epsilon = 1e-5);
    }

    #[test]
    fn test_squared_euclidean_same_vector() {
        let v = [1.0, 2.0, 3.0];
        assert_eq!(squared_euclidean(&v, &v), 0.0);
    }

    #[test]
    fn test_cosine_identical() {
        let dist = cosine_distance(&[1.0, 0.0, 0.0], &[2.0, 0.0, 0.0]);
        assert_relative_eq!(dist, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let dist = cosine_distance(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert_relative_eq!(dist, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let dist = cosine_distance(&[1.0, 0.0, 0.0], &[-1.0, 0.0, 0.0]);
        assert_relative_eq!(dist, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 1.0]), 1.0);
    }

    #[test]
    fn test_metric_dispatch() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        assert_relative_eq!(
            DistanceMetric::SquaredEuclidean.distance(&a, &b),
            27.0,
            epsilon = 1e-5
        );
        assert_relative_eq!(
            DistanceMetric::Cosine.distance(&a, &b),
            cosine_distance(&a, &b),
            epsilon = 1e-7
        );
    }
}
