//! Bucket partitioning: the group-by-key step of the pipeline.
//!
//! Every node is hashed once (one bucket id per stage), then nodes sharing a
//! `(stage, bucket)` key are gathered together. This is the only step that
//! needs to see all nodes at once. Stages are independent of each other.
//!
//! Buckets of size 0 or 1 are legal; they simply contribute no neighbors.
//! Bucket sizes are not balanced; skewed data gives large buckets.

use crate::error::Result;
use crate::lsh::SuperBitHasher;
use crate::types::BucketKey;
use crate::vector::Node;
use rayon::prelude::*;
use std::collections::HashMap;

/// The members of one bucket, sorted by node id.
#[derive(Debug, Clone)]
pub struct Bucket {
    /// Stage and bucket id shared by every member.
    pub key: BucketKey,
    /// Members in ascending id order.
    pub nodes: Vec<Node>,
}

impl Bucket {
    /// Number of members.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Return true if the bucket has no member.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Return true if the bucket cannot produce any neighbor (size <= 1).
    pub fn is_degenerate(&self) -> bool {
        self.nodes.len() <= 1
    }
}

/// A node paired with its bucket id in every stage.
#[derive(Debug, Clone)]
pub struct SignedNode {
    /// The hashed node.
    pub node: Node,
    /// Bucket id per stage, indexed by stage.
    pub signature: Vec<u32>,
}

/// Hash every node in parallel.
///
/// # Errors
///
/// Returns `InvalidDimension` if any node has an index outside the hasher's
/// dimension.
pub fn assign_signatures(nodes: &[Node], hasher: &SuperBitHasher) -> Result<Vec<SignedNode>> {
    nodes
        .par_iter()
        .map(|node| {
            hasher.hash(&node.vector).map(|signature| SignedNode {
                node: node.clone(),
                signature,
            })
        })
        .collect()
}

/// Group signed nodes by `(stage, bucket)`.
///
/// Each worker folds its share into a local map, the maps are then reduced
/// pairwise. Output buckets are ordered by key and their members by id, so
/// the result does not depend on scheduling.
pub fn group_buckets(signed: &[SignedNode]) -> Vec<Bucket> {
    let grouped = signed
        .par_iter()
        .fold(HashMap::<BucketKey, Vec<Node>>::new, |mut acc, item| {
            for (stage, &bucket) in item.signature.iter().enumerate() {
                acc.entry(BucketKey::new(stage, bucket))
                    .or_default()
                    .push(item.node.clone());
            }
            acc
        })
        .reduce(HashMap::new, |mut a, b| {
            for (key, mut members) in b {
                a.entry(key).or_default().append(&mut members);
            }
            a
        });

    let mut buckets: Vec<Bucket> = grouped
        .into_iter()
        .map(|(key, mut nodes)| {
            nodes.sort_by_key(|node| node.id);
            Bucket { key, nodes }
        })
        .collect();
    buckets.sort_by_key(|bucket| bucket.key);
    buckets
}

/// Hash and group in one call.
pub fn partition(nodes: &[Node], hasher: &SuperBitHasher) -> Result<Vec<Bucket>> {
    let signed = assign_signatures(nodes, hasher)?;
    Ok(group_buckets(&signed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeId;
    use crate::vector::SparseVector;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn nodes(n: usize, dim: usize) -> Vec<Node> {
        let mut rng = StdRng::seed_from_u64(17);
        (0..n)
            .map(|i| Node::new(i as u64, SparseVector::random(&mut rng, dim, 5)))
            .collect()
    }

    #[test]
    fn test_every_node_once_per_stage() {
        let nodes = nodes(200, 50);
        let hasher = SuperBitHasher::new(3, 4, 8, 50, 1).unwrap();
        let buckets = partition(&nodes, &hasher).unwrap();

        for stage in 0..3 {
            let mut ids: Vec<NodeId> = buckets
                .iter()
                .filter(|b| b.key.stage == stage)
                .flat_map(|b| b.nodes.iter().map(|n| n.id))
                .collect();
            ids.sort();
            assert_eq!(ids, (0..200u64).map(NodeId).collect::<Vec<_>>());
        }
        assert!(buckets.iter().all(|b| b.key.stage < 3));
    }

    #[test]
    fn test_buckets_sorted_and_deterministic() {
        let nodes = nodes(100, 30);
        let hasher = SuperBitHasher::new(2, 3, 6, 30, 5).unwrap();
        let a = partition(&nodes, &hasher).unwrap();
        let b = partition(&nodes, &hasher).unwrap();

        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.key, y.key);
            let xs: Vec<NodeId> = x.nodes.iter().map(|n| n.id).collect();
            let ys: Vec<NodeId> = y.nodes.iter().map(|n| n.id).collect();
            assert_eq!(xs, ys);
            assert!(xs.windows(2).all(|w| w[0] < w[1]));
        }
        assert!(a.windows(2).all(|w| w[0].key < w[1].key));
    }

    #[test]
    fn test_single_bucket_holds_everything() {
        let nodes = nodes(10, 20);
        let hasher = SuperBitHasher::new(1, 1, 1, 20, 0).unwrap();
        let buckets = partition(&nodes, &hasher).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].len(), 10);
        assert!(!buckets[0].is_degenerate());
    }

    #[test]
    fn test_dimension_error_propagates() {
        let mut nodes = nodes(5, 20);
        nodes.push(Node::new(99u64, SparseVector::from_pairs(vec![(25, 1.0)])));
        let hasher = SuperBitHasher::new(1, 2, 4, 20, 0).unwrap();
        assert!(partition(&nodes, &hasher).is_err());
    }
}
