//! Pluggable similarity functions between sparse vectors.
//!
//! The graph is similarity-based throughout: higher scores mean closer
//! neighbors. Any symmetric function can be supplied through
//! [`Similarity::custom`].

pub mod scalar;

pub use scalar::{cosine_similarity, jaccard_similarity};

use crate::vector::SparseVector;
use std::fmt;
use std::sync::Arc;

/// Signature of a user-supplied similarity function.
pub type SimilarityFn = dyn Fn(&SparseVector, &SparseVector) -> f64 + Send + Sync;

/// Supported similarity measures.
#[derive(Clone, Default)]
pub enum Similarity {
    /// Cosine similarity, range [-1, 1].
    #[default]
    Cosine,
    /// Weighted Jaccard similarity, range [0, 1].
    Jaccard,
    /// A caller-provided function. Must be symmetric.
    Custom(Arc<SimilarityFn>),
}

impl Similarity {
    /// Wrap a closure as a custom similarity.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&SparseVector, &SparseVector) -> f64 + Send + Sync + 'static,
    {
        Similarity::Custom(Arc::new(f))
    }

    /// Compute the similarity between two vectors using this measure.
    #[inline]
    pub fn compute(&self, a: &SparseVector, b: &SparseVector) -> f64 {
        match self {
            Similarity::Cosine => cosine_similarity(a, b),
            Similarity::Jaccard => jaccard_similarity(a, b),
            Similarity::Custom(f) => f(a, b),
        }
    }

    /// Short name used in log output.
    pub fn name(&self) -> &'static str {
        match self {
            Similarity::Cosine => "cosine",
            Similarity::Jaccard => "jaccard",
            Similarity::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for Similarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Similarity::{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_cosine() {
        let a = SparseVector::from_pairs(vec![(0, 1.0), (1, 1.0)]);
        let b = SparseVector::from_pairs(vec![(0, 1.0)]);
        let sim = Similarity::default().compute(&a, &b);
        assert!((sim - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn test_custom_similarity() {
        let overlap = Similarity::custom(|a, b| a.dot(b));
        let a = SparseVector::from_pairs(vec![(0, 2.0), (3, 1.0)]);
        let b = SparseVector::from_pairs(vec![(0, 3.0)]);
        assert_eq!(overlap.compute(&a, &b), 6.0);
        assert_eq!(overlap.name(), "custom");
        assert_eq!(format!("{:?}", overlap), "Similarity::custom");
    }

    #[test]
    fn test_jaccard_dispatch() {
        let a = SparseVector::from_pairs(vec![(0, 1.0)]);
        assert_eq!(Similarity::Jaccard.compute(&a, &a), 1.0);
    }
}
