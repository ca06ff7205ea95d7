//! Property tests for neighbor lists, merging and the build pipeline.

use lsh_knn_graph::merge::{merge_lists, merge_local_graphs};
use lsh_knn_graph::{
    build_graph, GraphConfig, LocalGraph, Neighbor, NeighborList, NodeId, SparseVector,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

fn candidates() -> impl Strategy<Value = Vec<(u64, f64)>> {
    prop::collection::vec((0u64..40, -1.0f64..1.0), 0..60)
}

fn to_list(k: usize, raw: &[(u64, f64)]) -> NeighborList {
    NeighborList::from_candidates(k, raw.iter().copied().map(Neighbor::from))
}

/// Owner -> raw candidates, one map per bucket.
fn bucket_parts() -> impl Strategy<Value = Vec<BTreeMap<u64, Vec<(u64, f64)>>>> {
    prop::collection::vec(
        prop::collection::btree_map(
            0u64..20,
            prop::collection::vec((0u64..40, -1.0f64..1.0), 0..12),
            0..10,
        ),
        0..8,
    )
}

fn to_local_graphs(k: usize, parts: &[BTreeMap<u64, Vec<(u64, f64)>>]) -> Vec<LocalGraph> {
    parts
        .iter()
        .map(|part| LocalGraph {
            lists: part
                .iter()
                .map(|(&owner, raw)| (NodeId(owner), to_list(k, raw)))
                .collect(),
            ..Default::default()
        })
        .collect()
}

fn sparse_vector(dim: u32) -> impl Strategy<Value = SparseVector> {
    prop::collection::vec((0..dim, 0.1f64..5.0), 1..8).prop_map(SparseVector::from_pairs)
}

proptest! {
    #[test]
    fn neighbor_list_is_ranked_and_bounded(k in 1usize..10, raw in candidates()) {
        let list = to_list(k, &raw);

        prop_assert!(list.len() <= k);
        let ids: HashSet<NodeId> = list.iter().map(|n| n.id).collect();
        prop_assert_eq!(ids.len(), list.len());
        for w in list.as_slice().windows(2) {
            prop_assert_eq!(w[0].rank_cmp(&w[1]), Ordering::Less);
        }
    }

    #[test]
    fn neighbor_list_keeps_best_score_per_id(k in 1usize..10, raw in candidates()) {
        let list = to_list(k, &raw);

        for neighbor in &list {
            let best = raw
                .iter()
                .filter(|(id, _)| *id == neighbor.id.as_u64())
                .map(|(_, score)| *score)
                .fold(f64::NEG_INFINITY, f64::max);
            prop_assert_eq!(neighbor.score, best);
        }
    }

    #[test]
    fn merge_is_order_independent(
        k in 1usize..8,
        a in candidates(),
        b in candidates(),
        c in candidates(),
    ) {
        let owner = NodeId(0);
        let (la, lb, lc) = (to_list(k, &a), to_list(k, &b), to_list(k, &c));

        let abc = merge_lists(k, owner, [&la, &lb, &lc]);
        let cab = merge_lists(k, owner, [&lc, &la, &lb]);
        let bca = merge_lists(k, owner, [&lb, &lc, &la]);

        prop_assert_eq!(&abc, &cab);
        prop_assert_eq!(&abc, &bca);
        prop_assert!(!abc.contains(owner));
    }

    #[test]
    fn merge_is_associative(k in 1usize..8, a in candidates(), b in candidates(), c in candidates()) {
        let owner = NodeId(0);
        let (la, lb, lc) = (to_list(k, &a), to_list(k, &b), to_list(k, &c));

        let left = merge_lists(k, owner, [&merge_lists(k, owner, [&la, &lb]), &lc]);
        let right = merge_lists(k, owner, [&la, &merge_lists(k, owner, [&lb, &lc])]);

        prop_assert_eq!(left, right);
    }

    #[test]
    fn merge_local_graphs_ignores_part_order(
        k in 1usize..6,
        raw_parts in bucket_parts(),
        shuffle_seed in any::<u64>(),
    ) {
        let ids: Vec<NodeId> = (0..20).map(NodeId).collect();
        let parts = to_local_graphs(k, &raw_parts);
        let mut shuffled = parts.clone();
        shuffled.shuffle(&mut StdRng::seed_from_u64(shuffle_seed));

        let graph = merge_local_graphs(k, &ids, &parts);
        let reordered = merge_local_graphs(k, &ids, &shuffled);

        prop_assert_eq!(&graph, &reordered);
        prop_assert_eq!(graph.len(), ids.len());
        for &id in &ids {
            let owned: Vec<&NeighborList> = parts
                .iter()
                .flat_map(|part| part.lists.iter())
                .filter(|(owner, _)| *owner == id)
                .map(|(_, list)| list)
                .collect();
            let expected = merge_lists(k, id, owned);
            prop_assert_eq!(graph.get(id).unwrap(), &expected);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn built_graph_satisfies_invariants(
        vectors in prop::collection::vec(sparse_vector(32), 1..60),
        k in 1usize..6,
        stages in 1usize..4,
        buckets in 1usize..6,
        seed in any::<u64>(),
    ) {
        let n = vectors.len();
        let config = GraphConfig::new(32)
            .with_k(k)
            .with_stages(stages)
            .with_buckets(buckets)
            .with_seed(seed);
        let nodes = vectors.into_iter().enumerate().map(|(i, v)| (i as u64, v));

        let graph = build_graph(nodes, &config).unwrap();

        prop_assert_eq!(graph.len(), n);
        for (id, list) in graph.iter() {
            prop_assert!(list.len() <= k);
            prop_assert!(list.len() < n.max(1));
            prop_assert!(!list.contains(*id));
            for w in list.as_slice().windows(2) {
                prop_assert_eq!(w[0].rank_cmp(&w[1]), Ordering::Less);
            }
        }
    }
}
