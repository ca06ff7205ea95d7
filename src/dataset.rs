//! Dataset utilities for generating sparse data and evaluating graphs.

use crate::graph::Graph;
use crate::types::NodeId;
use crate::vector::{Node, SparseVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

/// A synthetic sparse dataset.
pub struct SparseDataset {
    pub nodes: Vec<Node>,
    pub dim: usize,
}

impl SparseDataset {
    /// Generate `n` clustered sparse vectors of dimensionality `dim`.
    ///
    /// Each of `clusters` centers is a random support of `nnz` dimensions;
    /// every vector keeps most of its center's support (reweighted) and
    /// swaps a few dimensions for random ones, so vectors of the same
    /// cluster are similar under cosine and Jaccard.
    pub fn generate(n: usize, dim: usize, nnz: usize, clusters: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let centers: Vec<SparseVector> = (0..clusters.max(1))
            .map(|_| SparseVector::random(&mut rng, dim, nnz))
            .collect();

        let nodes = (0..n)
            .map(|i| {
                let center = &centers[rng.gen_range(0..centers.len())];
                let mut pairs: Vec<(u32, f64)> = Vec::with_capacity(nnz + nnz / 5 + 1);
                for (index, weight) in center.iter() {
                    if rng.gen_bool(0.8) {
                        pairs.push((index, weight * rng.gen_range(0.5..1.5)));
                    }
                }
                let noise = (nnz / 5).max(1);
                for _ in 0..noise {
                    pairs.push((rng.gen_range(0..dim) as u32, rng.gen_range(1.0..2.0)));
                }
                Node::new(i as u64, SparseVector::from_pairs(pairs))
            })
            .collect();

        Self { nodes, dim }
    }

    /// Number of vectors.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Return true if the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Vectors as `(id, vector)` pairs, the input shape of `build_graph`.
    pub fn pairs(&self) -> Vec<(NodeId, SparseVector)> {
        self.nodes
            .iter()
            .map(|node| (node.id, (*node.vector).clone()))
            .collect()
    }
}

/// Compute recall@k between predicted and ground truth neighbor ids.
///
/// Recall is the fraction of true neighbors that were found.
/// Returns a value between 0.0 and 1.0.
pub fn recall_at_k(predicted: &[NodeId], ground_truth: &[NodeId], k: usize) -> f32 {
    let truth_set: HashSet<NodeId> = ground_truth.iter().take(k).copied().collect();
    if truth_set.is_empty() {
        return 1.0;
    }
    let pred_set: HashSet<NodeId> = predicted.iter().take(k).copied().collect();
    pred_set.intersection(&truth_set).count() as f32 / truth_set.len() as f32
}

/// Mean recall of `approx` against the exact graph `exact`, over the nodes
/// of `exact`. Nodes missing from `approx` count as zero recall.
pub fn graph_recall(approx: &Graph, exact: &Graph) -> f32 {
    if exact.is_empty() {
        return 1.0;
    }
    let k = exact.k();
    let total: f32 = exact
        .iter()
        .map(|(id, truth)| match approx.get(*id) {
            Some(found) => recall_at_k(&found.ids(), &truth.ids(), k),
            None => 0.0,
        })
        .sum();
    total / exact.len() as f32
}
