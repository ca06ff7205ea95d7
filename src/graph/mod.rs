//! k-NN graph types and the local graph builders that run inside buckets.

pub mod brute_force;
pub mod neighbor;
pub mod nndescent;
pub mod traits;

pub use brute_force::{brute_force_graph, BruteForce};
pub use neighbor::{Neighbor, NeighborList};
pub use nndescent::{NNDescent, NNDescentParams};
pub use traits::{GraphBuilder, LocalGraph};

use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An approximate k-NN graph: every node mapped to its neighbor list.
///
/// Nodes are kept in id order so iteration and serialization are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    k: usize,
    neighbors: BTreeMap<NodeId, NeighborList>,
}

impl Graph {
    /// Create an empty graph whose lists hold at most `k` neighbors.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            neighbors: BTreeMap::new(),
        }
    }

    /// Neighbors kept per node.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Return true if the graph has no node.
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Neighbor list of `id`, if the node is in the graph.
    pub fn get(&self, id: impl Into<NodeId>) -> Option<&NeighborList> {
        self.neighbors.get(&id.into())
    }

    /// Iterate `(node, neighbors)` in node id order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &NeighborList)> {
        self.neighbors.iter()
    }

    /// Total number of neighbor entries over all lists.
    pub fn num_edges(&self) -> usize {
        self.neighbors.values().map(NeighborList::len).sum()
    }

    /// Node ids in ascending order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.neighbors.keys().copied().collect()
    }

    /// Set the neighbor list of a node, replacing any previous one.
    pub fn insert(&mut self, id: NodeId, list: NeighborList) {
        self.neighbors.insert(id, list);
    }

    /// Flatten to `(node id, [(neighbor id, score)])` rows in node order.
    pub fn into_rows(self) -> Vec<(u64, Vec<(u64, f64)>)> {
        self.neighbors
            .into_iter()
            .map(|(id, list)| {
                let row = list.into_vec().into_iter().map(Neighbor::to_tuple).collect();
                (id.0, row)
            })
            .collect()
    }

    /// Rebuild a graph from rows produced by [`into_rows`](Self::into_rows).
    pub fn from_rows(k: usize, rows: Vec<(u64, Vec<(u64, f64)>)>) -> Self {
        let neighbors = rows
            .into_iter()
            .map(|(id, row)| {
                let list = NeighborList::from_candidates(k, row.into_iter().map(Neighbor::from));
                (NodeId(id), list)
            })
            .collect();
        Self { k, neighbors }
    }
}

/// Derive an independent seed from a base seed and a path of counters
/// (stage, bucket, round, node...). SplitMix64 finalizer per step.
pub(crate) fn derive_seed(base: u64, parts: &[u64]) -> u64 {
    parts.iter().fold(base, |acc, &part| {
        let mut z = acc ^ part.wrapping_add(0x9E37_79B9_7F4A_7C15).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    })
}
