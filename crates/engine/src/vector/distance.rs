//! Distance functions for vector similarity computation.
//!
//! Every function returns a distance: lower = more similar.
//! Functions are single-threaded for determinism.
//! No implicit normalization of vectors; they are used as-is.
//!
//! The graph and searcher only see the `DistanceFunction` capability, so a
//! custom metric can be injected without touching graph code.

use std::sync::Arc;

use strata_ann_core::DistanceMetric;

/// Pluggable distance metric
pub trait DistanceFunction: Send + Sync {
    /// Distance between two vectors of equal length (lower = more similar)
    fn distance(&self, a: &[f32], b: &[f32]) -> f32;

    /// Human-readable name, used in logs and stats
    fn name(&self) -> &'static str;
}

/// Euclidean (L2) distance. Reference metric.
#[derive(Debug, Clone, Copy, Default)]
pub struct Euclidean;

/// Squared Euclidean distance (same ordering as L2, no sqrt)
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredEuclidean;

/// Cosine distance: 1 - cos(a, b)
#[derive(Debug, Clone, Copy, Default)]
pub struct Cosine;

/// Negated inner product: -dot(a, b)
#[derive(Debug, Clone, Copy, Default)]
pub struct DotProduct;

impl DistanceFunction for Euclidean {
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        squared_l2(a, b).sqrt()
    }

    fn name(&self) -> &'static str {
        "euclidean"
    }
}

impl DistanceFunction for SquaredEuclidean {
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        squared_l2(a, b)
    }

    fn name(&self) -> &'static str {
        "squared_euclidean"
    }
}

impl DistanceFunction for Cosine {
    /// Returns 1.0 if either vector has zero norm (treated as orthogonal)
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        let norm_a = l2_norm(a);
        let norm_b = l2_norm(b);
        if norm_a == 0.0 || norm_b == 0.0 {
            1.0
        } else {
            1.0 - dot_product(a, b) / (norm_a * norm_b)
        }
    }

    fn name(&self) -> &'static str {
        "cosine"
    }
}

impl DistanceFunction for DotProduct {
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        -dot_product(a, b)
    }

    fn name(&self) -> &'static str {
        "dot_product"
    }
}

impl DistanceFunction for DistanceMetric {
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "Dimension mismatch in distance computation");
        match self {
            DistanceMetric::Euclidean => Euclidean.distance(a, b),
            DistanceMetric::SquaredEuclidean => SquaredEuclidean.distance(a, b),
            DistanceMetric::Cosine => Cosine.distance(a, b),
            DistanceMetric::DotProduct => DotProduct.distance(a, b),
        }
    }

    fn name(&self) -> &'static str {
        DistanceMetric::name(self)
    }
}

/// Shared distance function for a configured metric
pub fn for_metric(metric: DistanceMetric) -> Arc<dyn DistanceFunction> {
    match metric {
        DistanceMetric::Euclidean => Arc::new(Euclidean),
        DistanceMetric::SquaredEuclidean => Arc::new(SquaredEuclidean),
        DistanceMetric::Cosine => Arc::new(Cosine),
        DistanceMetric::DotProduct => Arc::new(DotProduct),
    }
}

/// Dot product (inner product)
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// L2 norm (Euclidean length)
fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert_eq!(Euclidean.distance(&v, &v), 0.0);
    }

    #[test]
    fn test_euclidean_345() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert!((Euclidean.distance(&a, &b) - 5.0).abs() < 1e-6);
        assert!((SquaredEuclidean.distance(&a, &b) - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_identical_and_opposite() {
        let v1 = vec![1.0, 0.0];
        let v2 = vec![-1.0, 0.0];
        assert!(Cosine.distance(&v1, &v1).abs() < 1e-6);
        assert!((Cosine.distance(&v1, &v2) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        let v1 = vec![1.0, 0.0];
        let v2 = vec![0.0, 1.0];
        assert!((Cosine.distance(&v1, &v2) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_handling() {
        let zero = vec![0.0, 0.0, 0.0];
        let nonzero = vec![1.0, 2.0, 3.0];
        assert_eq!(Cosine.distance(&zero, &nonzero), 1.0);
        assert_eq!(Cosine.distance(&zero, &zero), 1.0);
        assert!(Euclidean.distance(&zero, &nonzero) > 0.0);
    }

    #[test]
    fn test_dot_product_is_negated() {
        let a = vec![1.0, 2.0];
        let b = vec![3.0, 4.0];
        assert_eq!(dot_product(&a, &b), 11.0);
        assert_eq!(DotProduct.distance(&a, &b), -11.0);
    }

    #[test]
    fn test_metric_dispatches_correctly() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];

        for metric in [
            DistanceMetric::Euclidean,
            DistanceMetric::SquaredEuclidean,
            DistanceMetric::Cosine,
            DistanceMetric::DotProduct,
        ] {
            let shared = for_metric(metric);
            assert_eq!(shared.distance(&a, &b), metric.distance(&a, &b));
            assert_eq!(shared.name(), metric.name());
        }
    }

    #[test]
    fn test_nearer_is_smaller_for_every_metric() {
        let query = vec![1.0, 0.1];
        let near = vec![0.9, 0.1];
        let far = vec![-1.0, 0.5];
        for metric in [
            DistanceMetric::Euclidean,
            DistanceMetric::SquaredEuclidean,
            DistanceMetric::Cosine,
        ] {
            assert!(metric.distance(&query, &near) < metric.distance(&query, &far));
        }
    }
}
