//! Merging per-bucket neighbor lists into the final graph.
//!
//! For each node, all candidates found in any stage are unioned, duplicate
//! neighbors keep their highest score, and the list is cut to the top `k`
//! under the (score desc, id asc) order. Because that order is total and the
//! kept set is the top `k` of the union, merging is associative and
//! commutative: stage results may arrive in any order.

use crate::graph::{Graph, LocalGraph, NeighborList};
use crate::types::NodeId;
use rayon::prelude::*;
use std::collections::HashMap;

/// Merge candidate lists for one node, dropping the node itself.
pub fn merge_lists<'a, I>(k: usize, owner: NodeId, lists: I) -> NeighborList
where
    I: IntoIterator<Item = &'a NeighborList>,
{
    let mut merged = NeighborList::new(k);
    for list in lists {
        for &candidate in list {
            if candidate.id != owner {
                merged.absorb(candidate);
            }
        }
    }
    merged
}

/// Merge local graphs from every bucket of every stage into one graph.
///
/// Lists are first grouped by owner, then each owner's lists go through
/// [`merge_lists`]. Every id in `nodes` gets an entry, even when no bucket
/// produced a neighbor for it; owners not in `nodes` are ignored.
pub fn merge_local_graphs(k: usize, nodes: &[NodeId], parts: &[LocalGraph]) -> Graph {
    let by_owner = parts
        .par_iter()
        .fold(HashMap::<NodeId, Vec<&NeighborList>>::new, |mut acc, part| {
            for (owner, list) in &part.lists {
                acc.entry(*owner).or_default().push(list);
            }
            acc
        })
        .reduce(HashMap::new, |mut a, b| {
            for (owner, mut lists) in b {
                a.entry(owner).or_default().append(&mut lists);
            }
            a
        });

    let merged: Vec<(NodeId, NeighborList)> = nodes
        .par_iter()
        .map(|&id| {
            let lists = by_owner.get(&id).map(Vec::as_slice).unwrap_or_default();
            (id, merge_lists(k, id, lists.iter().copied()))
        })
        .collect();

    let mut graph = Graph::new(k);
    for (id, list) in merged {
        graph.insert(id, list);
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Neighbor;

    fn list(k: usize, entries: &[(u64, f64)]) -> NeighborList {
        NeighborList::from_candidates(k, entries.iter().map(|&e| Neighbor::from(e)))
    }

    #[test]
    fn test_merge_lists_union_dedupe_truncate() {
        let a = list(3, &[(1, 0.9), (2, 0.5), (3, 0.4)]);
        let b = list(3, &[(2, 0.7), (4, 0.6), (0, 1.0)]);
        let merged = merge_lists(3, NodeId(0), [&a, &b]);

        assert_eq!(merged.ids(), vec![NodeId(1), NodeId(2), NodeId(4)]);
        assert_eq!(merged.as_slice()[1].score, 0.7);
    }

    #[test]
    fn test_merge_order_independent() {
        let parts: Vec<LocalGraph> = vec![
            LocalGraph {
                lists: vec![
                    (NodeId(0), list(2, &[(1, 0.3), (2, 0.2)])),
                    (NodeId(1), list(2, &[(0, 0.3)])),
                ],
                ..Default::default()
            },
            LocalGraph {
                lists: vec![
                    (NodeId(0), list(2, &[(3, 0.8)])),
                    (NodeId(3), list(2, &[(0, 0.8)])),
                ],
                ..Default::default()
            },
        ];
        let ids = [NodeId(0), NodeId(1), NodeId(2), NodeId(3)];

        let forward = merge_local_graphs(2, &ids, &parts);
        let reversed: Vec<LocalGraph> = parts.iter().rev().cloned().collect();
        let backward = merge_local_graphs(2, &ids, &reversed);

        assert_eq!(forward, backward);
        assert_eq!(forward.get(0u64).unwrap().ids(), vec![NodeId(3), NodeId(1)]);
        assert!(forward.get(2u64).unwrap().is_empty());
        assert_eq!(forward.len(), 4);
    }
}
