use crate::error::{KnnGraphError, Result};
use crate::types::NodeId;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A sparse vector: strictly increasing dimension indices with their weights.
/// Dimensions that are not stored are implicitly zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    indices: Vec<u32>,
    values: Vec<f64>,
}

impl SparseVector {
    /// Create a sparse vector from `(index, weight)` pairs.
    ///
    /// Pairs may arrive in any order. Weights of repeated indices are summed.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u32, f64)>,
    {
        let mut pairs: Vec<(u32, f64)> = pairs.into_iter().collect();
        pairs.sort_by_key(|&(index, _)| index);

        let mut indices = Vec::with_capacity(pairs.len());
        let mut values: Vec<f64> = Vec::with_capacity(pairs.len());
        for (index, value) in pairs {
            if indices.last() == Some(&index) {
                if let Some(last) = values.last_mut() {
                    *last += value;
                }
            } else {
                indices.push(index);
                values.push(value);
            }
        }

        Self { indices, values }
    }

    /// Create a sparse vector from a dense slice, keeping non-zero entries.
    pub fn from_dense(data: &[f64]) -> Self {
        Self::from_pairs(
            data.iter()
                .enumerate()
                .filter(|(_, &v)| v != 0.0)
                .map(|(i, &v)| (i as u32, v)),
        )
    }

    /// Create a random sparse vector with `nnz` non-zero entries drawn from
    /// `[0, dim)` and weights uniform in `[1.0, 5.0)`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, dim: usize, nnz: usize) -> Self {
        let nnz = nnz.min(dim);
        let picked = rand::seq::index::sample(rng, dim, nnz);
        let pairs: Vec<(u32, f64)> = picked
            .into_iter()
            .map(|i| (i as u32, rng.gen_range(1.0..5.0)))
            .collect();
        Self::from_pairs(pairs)
    }

    /// Number of stored (non-zero) entries.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Return true if no dimension is stored.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Largest stored dimension index, if any.
    pub fn max_index(&self) -> Option<usize> {
        self.indices.last().map(|&i| i as usize)
    }

    /// Stored dimension indices, strictly increasing.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Stored weights, aligned with [`indices`](Self::indices).
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterate over `(index, weight)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Check that every index lies in `[0, dim)`.
    pub fn validate(&self, dim: usize) -> Result<()> {
        match self.max_index() {
            Some(index) if index >= dim => Err(KnnGraphError::invalid_dimension(index, dim)),
            _ => Ok(()),
        }
    }

    /// Sparse-sparse dot product (merge join over the sorted indices).
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    /// Dot product against a dense vector. Indices past `dense.len()` are ignored.
    pub fn dot_dense(&self, dense: &[f64]) -> f64 {
        self.iter()
            .filter_map(|(i, v)| dense.get(i as usize).map(|d| d * v))
            .sum()
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

/// A graph node: a stable id plus an immutable sparse vector payload.
/// The payload is stored in an Arc for cheap cloning into buckets.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub vector: Arc<SparseVector>,
}

impl Node {
    /// Create a new node with the given id and vector.
    pub fn new(id: impl Into<NodeId>, vector: SparseVector) -> Self {
        Self {
            id: id.into(),
            vector: Arc::new(vector),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_from_pairs_sorts_and_sums() {
        let v = SparseVector::from_pairs(vec![(5, 1.0), (2, 3.0), (5, 2.0)]);
        assert_eq!(v.indices(), &[2, 5]);
        assert_eq!(v.values(), &[3.0, 3.0]);
        assert_eq!(v.max_index(), Some(5));
    }

    #[test]
    fn test_dot_and_norm() {
        let a = SparseVector::from_pairs(vec![(0, 1.0), (3, 2.0), (7, 4.0)]);
        let b = SparseVector::from_pairs(vec![(3, 5.0), (7, 0.5), (9, 1.0)]);
        assert!((a.dot(&b) - 12.0).abs() < 1e-12);
        assert!((a.norm() - 21.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_dot_dense() {
        let a = SparseVector::from_pairs(vec![(0, 1.0), (2, 2.0)]);
        assert!((a.dot_dense(&[3.0, 100.0, 0.5]) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_validate() {
        let v = SparseVector::from_pairs(vec![(0, 1.0), (9, 1.0)]);
        assert!(v.validate(10).is_ok());
        assert!(matches!(
            v.validate(9),
            Err(KnnGraphError::InvalidDimension { index: 9, dim: 9 })
        ));
        assert!(SparseVector::default().validate(1).is_ok());
    }

    #[test]
    fn test_random_is_reproducible() {
        let a = SparseVector::random(&mut StdRng::seed_from_u64(7), 100, 10);
        let b = SparseVector::random(&mut StdRng::seed_from_u64(7), 100, 10);
        assert_eq!(a, b);
        assert_eq!(a.nnz(), 10);
        assert!(a.validate(100).is_ok());
    }

    #[test]
    fn test_from_dense_drops_zeros() {
        let v = SparseVector::from_dense(&[1.0, 0.0, 2.0]);
        assert_eq!(v.indices(), &[0, 2]);
    }
}
