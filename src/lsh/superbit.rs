//! SuperBit locality-sensitive hashing for cosine similarity.
//!
//! Random-hyperplane LSH maps a vector to the sign pattern of its projections
//! onto random Gaussian directions; two vectors at angle `theta` agree on each
//! bit with probability `1 - theta / pi`. SuperBit improves the estimator by
//! orthogonalizing the hyperplanes in batches ("super-bits") with
//! Gram-Schmidt, which lowers the variance of the collision probability.
//!
//! # Layout
//!
//! Each stage owns `hyperplanes_per_stage` hyperplanes. They are drawn in
//! batches of `depth` vectors, where `depth` is the largest divisor of
//! `hyperplanes_per_stage` not exceeding `dim` (a batch of more than `dim`
//! vectors cannot be orthogonal). The stage signature is the packed sign
//! pattern; the bucket id is that pattern modulo `buckets`.
//!
//! # References
//!
//! - Ji et al. (2012): "Super-Bit Locality-Sensitive Hashing"
//! - Charikar (2002): "Similarity estimation techniques from rounding algorithms"

use crate::constants::lsh::MAX_HYPERPLANES_PER_STAGE;
use crate::error::{KnnGraphError, Result};
use crate::vector::SparseVector;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

/// Deterministic-given-seed SuperBit hasher producing one bucket id per stage.
#[derive(Debug, Clone)]
pub struct SuperBitHasher {
    /// `stages` families of `hyperplanes_per_stage` dense hyperplanes each.
    families: Vec<Vec<Vec<f64>>>,
    buckets: usize,
    dim: usize,
    depth: usize,
}

impl SuperBitHasher {
    /// Build the hyperplane families.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `stages`, `buckets` or `dim` is zero, or if
    /// `hyperplanes_per_stage` is outside `1..=64`.
    pub fn new(
        stages: usize,
        hyperplanes_per_stage: usize,
        buckets: usize,
        dim: usize,
        seed: u64,
    ) -> Result<Self> {
        if stages < 1 {
            return Err(KnnGraphError::invalid_config("stages must be at least 1"));
        }
        if hyperplanes_per_stage < 1 || hyperplanes_per_stage > MAX_HYPERPLANES_PER_STAGE {
            return Err(KnnGraphError::invalid_config(format!(
                "hyperplanes per stage must be in 1..={}, got {}",
                MAX_HYPERPLANES_PER_STAGE, hyperplanes_per_stage
            )));
        }
        if buckets < 1 {
            return Err(KnnGraphError::invalid_config("buckets must be at least 1"));
        }
        if dim < 1 {
            return Err(KnnGraphError::invalid_config("dim must be at least 1"));
        }

        let depth = superbit_depth(hyperplanes_per_stage, dim);
        let mut rng = StdRng::seed_from_u64(seed);

        let families = (0..stages)
            .map(|_| {
                let mut family = Vec::with_capacity(hyperplanes_per_stage);
                for _ in 0..hyperplanes_per_stage / depth {
                    let batch: Vec<Vec<f64>> = (0..depth)
                        .map(|_| (0..dim).map(|_| StandardNormal.sample(&mut rng)).collect())
                        .collect();
                    family.extend(orthonormalize(batch));
                }
                family
            })
            .collect();

        Ok(Self {
            families,
            buckets,
            dim,
            depth,
        })
    }

    /// Number of stages.
    pub fn stages(&self) -> usize {
        self.families.len()
    }

    /// Number of bucket ids per stage.
    pub fn buckets(&self) -> usize {
        self.buckets
    }

    /// Declared dimensionality.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Size of each orthogonalized hyperplane batch.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Hyperplanes of one stage.
    pub fn hyperplanes(&self, stage: usize) -> &[Vec<f64>] {
        &self.families[stage]
    }

    /// Packed sign pattern of `vector` for one stage: bit `j` is set when the
    /// projection onto hyperplane `j` is non-negative.
    ///
    /// # Panics
    /// Panics if `stage >= self.stages()`.
    pub fn signature_bits(&self, stage: usize, vector: &SparseVector) -> Result<u64> {
        vector.validate(self.dim)?;
        Ok(self.pack_signs(stage, vector))
    }

    /// Hash a vector into one bucket id per stage.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDimension` if the vector has an index `>= dim`.
    pub fn hash(&self, vector: &SparseVector) -> Result<Vec<u32>> {
        vector.validate(self.dim)?;
        Ok((0..self.stages())
            .map(|stage| (self.pack_signs(stage, vector) % self.buckets as u64) as u32)
            .collect())
    }

    fn pack_signs(&self, stage: usize, vector: &SparseVector) -> u64 {
        self.families[stage]
            .iter()
            .enumerate()
            .fold(0u64, |bits, (j, plane)| {
                if vector.dot_dense(plane) >= 0.0 {
                    bits | (1u64 << j)
                } else {
                    bits
                }
            })
    }
}

/// Largest divisor of `hyperplanes` that is at most `dim`.
fn superbit_depth(hyperplanes: usize, dim: usize) -> usize {
    (1..=hyperplanes.min(dim))
        .rev()
        .find(|d| hyperplanes % d == 0)
        .unwrap_or(1)
}

/// Classical Gram-Schmidt over a batch of at most `dim` vectors.
fn orthonormalize(mut batch: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    for i in 0..batch.len() {
        let (done, rest) = batch.split_at_mut(i);
        let current = &mut rest[0];

        for basis in done.iter() {
            let proj: f64 = current.iter().zip(basis.iter()).map(|(a, b)| a * b).sum();
            for (c, b) in current.iter_mut().zip(basis.iter()) {
                *c -= proj * b;
            }
        }

        let norm = current.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            for c in current.iter_mut() {
                *c /= norm;
            }
        }
    }
    batch
}
