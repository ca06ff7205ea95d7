//! Exact k-NN graph construction.
//!
//! Computes the similarity of every pair of nodes. This serves as the ground
//! truth for recall measurements and as an exact inner builder for buckets
//! that are small enough to afford it.

use crate::graph::{Graph, GraphBuilder, LocalGraph, Neighbor, NeighborList};
use crate::similarity::Similarity;
use crate::vector::Node;
use rayon::prelude::*;

/// Exact builder: O(n^2) similarity evaluations per call.
#[derive(Debug, Clone, Copy)]
pub struct BruteForce {
    k: usize,
}

impl BruteForce {
    /// Create a new brute force builder keeping `k` neighbors per node.
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl GraphBuilder for BruteForce {
    fn k(&self) -> usize {
        self.k
    }

    fn build(&self, nodes: &[Node], similarity: &Similarity, _seed: u64) -> LocalGraph {
        let lists: Vec<_> = nodes
            .par_iter()
            .enumerate()
            .map(|(i, node)| {
                let mut list = NeighborList::new(self.k);
                for (j, other) in nodes.iter().enumerate() {
                    if i != j && other.id != node.id {
                        let score = similarity.compute(&node.vector, &other.vector);
                        list.add(Neighbor::new(other.id, score));
                    }
                }
                (node.id, list)
            })
            .collect();

        let n = nodes.len() as u64;
        LocalGraph {
            lists,
            iterations: 0,
            similarity_evaluations: n * n.saturating_sub(1),
        }
    }
}

/// Build the exact k-NN graph of `nodes`.
pub fn brute_force_graph(nodes: &[Node], k: usize, similarity: &Similarity) -> Graph {
    let mut graph = Graph::new(k);
    for (id, list) in BruteForce::new(k).build(nodes, similarity, 0).lists {
        graph.insert(id, list);
    }
    graph
}
