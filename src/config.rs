//! Configuration for graph construction.
//!
//! # Example
//!
//! ```
//! use lsh_knn_graph::{GraphConfig, Similarity};
//!
//! let config = GraphConfig::new(1000)
//!     .with_k(10)
//!     .with_stages(2)
//!     .with_buckets(10)
//!     .with_rho(0.5)
//!     .with_delta(0.01)
//!     .with_similarity(Similarity::Cosine);
//!
//! assert!(config.validate().is_ok());
//! ```

use crate::constants::graph::{DEFAULT_K, DEFAULT_SEED};
use crate::constants::lsh::{DEFAULT_BUCKETS, DEFAULT_STAGES, MAX_HYPERPLANES_PER_STAGE};
use crate::constants::nndescent::{DEFAULT_DELTA, DEFAULT_MAX_ITERATIONS, DEFAULT_RHO};
use crate::error::{KnnGraphError, Result};
use crate::graph::NNDescentParams;
use crate::similarity::Similarity;

/// What to do with a vector whose indices exceed `dim`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DimensionPolicy {
    /// Fail the whole run with `InvalidDimension`.
    #[default]
    Reject,
    /// Drop the vector; no node is created for it.
    Drop,
}

/// Which serial builder runs inside each bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InnerBuilder {
    /// Approximate, iterative refinement.
    #[default]
    NNDescent,
    /// Exact all-pairs comparison. Only sensible for small buckets.
    BruteForce,
}

/// Full configuration of a graph build.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Number of independent LSH stages.
    pub stages: usize,
    /// Number of bucket ids per stage.
    pub buckets: usize,
    /// Hyperplanes per stage; `None` derives it from `buckets`.
    pub hyperplanes_per_stage: Option<usize>,
    /// Dataset dimensionality (max index + 1).
    pub dim: usize,
    /// Neighbors kept per node.
    pub k: usize,
    /// NNDescent sample rate in (0, 1].
    pub rho: f64,
    /// NNDescent convergence threshold in [0, 1].
    pub delta: f64,
    /// NNDescent iteration cap.
    pub max_iterations: usize,
    /// Seed for hyperplanes and neighbor sampling.
    pub seed: u64,
    /// Similarity measure.
    pub similarity: Similarity,
    /// Builder used inside buckets.
    pub inner_builder: InnerBuilder,
    /// Handling of out-of-range vectors.
    pub dimension_policy: DimensionPolicy,
}

impl GraphConfig {
    /// Create a configuration with default parameters for data of
    /// dimensionality `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            stages: DEFAULT_STAGES,
            buckets: DEFAULT_BUCKETS,
            hyperplanes_per_stage: None,
            dim,
            k: DEFAULT_K,
            rho: DEFAULT_RHO,
            delta: DEFAULT_DELTA,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: DEFAULT_SEED,
            similarity: Similarity::default(),
            inner_builder: InnerBuilder::default(),
            dimension_policy: DimensionPolicy::default(),
        }
    }

    /// Set the number of neighbors per node.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set the number of LSH stages.
    pub fn with_stages(mut self, stages: usize) -> Self {
        self.stages = stages;
        self
    }

    /// Set the number of buckets per stage.
    pub fn with_buckets(mut self, buckets: usize) -> Self {
        self.buckets = buckets;
        self
    }

    /// Set the number of hyperplanes per stage explicitly.
    pub fn with_hyperplanes_per_stage(mut self, hyperplanes: usize) -> Self {
        self.hyperplanes_per_stage = Some(hyperplanes);
        self
    }

    /// Set the NNDescent sample rate.
    pub fn with_rho(mut self, rho: f64) -> Self {
        self.rho = rho;
        self
    }

    /// Set the NNDescent convergence threshold.
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    /// Set the NNDescent iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the similarity measure.
    pub fn with_similarity(mut self, similarity: Similarity) -> Self {
        self.similarity = similarity;
        self
    }

    /// Set the builder used inside buckets.
    pub fn with_inner_builder(mut self, inner: InnerBuilder) -> Self {
        self.inner_builder = inner;
        self
    }

    /// Set the out-of-range vector policy.
    pub fn with_dimension_policy(mut self, policy: DimensionPolicy) -> Self {
        self.dimension_policy = policy;
        self
    }

    /// Hyperplanes per stage actually used.
    ///
    /// When not set explicitly: `buckets / 2`, raised to `ceil(log2(buckets))`
    /// so every bucket id is reachable, capped at 64.
    pub fn hyperplanes_per_stage(&self) -> usize {
        self.hyperplanes_per_stage.unwrap_or_else(|| {
            let reach = (usize::BITS - self.buckets.saturating_sub(1).leading_zeros()) as usize;
            (self.buckets / 2).max(reach).clamp(1, MAX_HYPERPLANES_PER_STAGE)
        })
    }

    /// NNDescent parameters carried by this configuration.
    pub fn nndescent_params(&self) -> NNDescentParams {
        NNDescentParams {
            k: self.k,
            rho: self.rho,
            delta: self.delta,
            max_iterations: self.max_iterations,
        }
    }

    /// Check every parameter against its domain.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first parameter out of range.
    pub fn validate(&self) -> Result<()> {
        if self.stages < 1 {
            return Err(KnnGraphError::invalid_config("stages must be at least 1"));
        }
        if self.buckets < 1 {
            return Err(KnnGraphError::invalid_config("buckets must be at least 1"));
        }
        let hyperplanes = self.hyperplanes_per_stage();
        if hyperplanes < 1 || hyperplanes > MAX_HYPERPLANES_PER_STAGE {
            return Err(KnnGraphError::invalid_config(format!(
                "hyperplanes per stage must be in 1..={}, got {}",
                MAX_HYPERPLANES_PER_STAGE, hyperplanes
            )));
        }
        if self.dim < 1 {
            return Err(KnnGraphError::invalid_config("dim must be at least 1"));
        }
        self.nndescent_params().validate()
    }
}
