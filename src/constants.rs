//! Named constants for configuration values.
//!
//! This module centralizes default values used throughout the codebase,
//! making them easier to find, document, and tune.

/// Defaults for the graph as a whole.
pub mod graph {
    /// Default number of neighbors kept per node.
    pub const DEFAULT_K: usize = 10;

    /// Default random seed for hyperplanes and neighbor seeding.
    pub const DEFAULT_SEED: u64 = 42;
}

/// Constants for SuperBit LSH.
pub mod lsh {
    /// Default number of independent hash stages.
    pub const DEFAULT_STAGES: usize = 2;

    /// Default number of buckets per stage.
    pub const DEFAULT_BUCKETS: usize = 10;

    /// A stage signature is packed into one u64.
    pub const MAX_HYPERPLANES_PER_STAGE: usize = 64;
}

/// Constants for NNDescent.
pub mod nndescent {
    /// Default sample rate.
    pub const DEFAULT_RHO: f64 = 0.5;

    /// Default convergence threshold (fraction of updated slots).
    pub const DEFAULT_DELTA: f64 = 0.01;

    /// Default iteration cap.
    pub const DEFAULT_MAX_ITERATIONS: usize = 10;

    /// Smallest join width used when estimating the cost of one round.
    /// With tiny `k` a round joins almost nothing, so small buckets are
    /// solved exactly instead.
    pub const MIN_JOIN_WIDTH: usize = 8;
}

/// Constants for parallel execution.
pub mod parallel {
    /// Buckets smaller than this run NNDescent iterations sequentially.
    /// Rayon overhead dominates for tiny buckets.
    pub const PARALLEL_BUCKET_THRESHOLD: usize = 256;
}
