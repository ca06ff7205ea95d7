//! Common trait for the graph builders that run inside one bucket.
//!
//! The LSH pipeline does not care how a bucket is solved, only that the
//! builder returns one bounded neighbor list per member.

use crate::graph::NeighborList;
use crate::similarity::Similarity;
use crate::types::NodeId;
use crate::vector::Node;

/// Neighbor lists computed for the members of one bucket.
#[derive(Debug, Clone, Default)]
pub struct LocalGraph {
    /// One entry per input node, in input order.
    pub lists: Vec<(NodeId, NeighborList)>,
    /// Refinement iterations performed (0 for exact builders).
    pub iterations: usize,
    /// Number of similarity evaluations.
    pub similarity_evaluations: u64,
}

/// A serial k-NN graph builder over a small, self-contained node set.
///
/// # Thread Safety
///
/// Builders are shared across the rayon pool, one call per bucket, so they
/// must be `Send + Sync` and must not keep per-call state.
pub trait GraphBuilder: Send + Sync {
    /// Number of neighbors kept per node.
    fn k(&self) -> usize;

    /// Build neighbor lists restricted to `nodes`.
    ///
    /// `nodes` should be sorted by id so that equal scores are broken by id.
    /// Randomized builders draw every random choice from `seed`.
    fn build(&self, nodes: &[Node], similarity: &Similarity, seed: u64) -> LocalGraph;
}
