//! NNDescent: iterative refinement of an approximate k-NN graph.
//!
//! Implements the local-join scheme of Dong, Charikar & Li (2011), "Efficient
//! k-nearest neighbor graph construction for generic similarity measures":
//! a neighbor of a neighbor is likely also a neighbor.
//!
//! # Algorithm Overview
//!
//! - Every node starts with `k` random neighbors, all flagged "new"
//! - Each round, every node splits its list into new and old entries, samples
//!   `ceil(rho * k)` of the new ones and flags them old
//! - Reverse lists ("who points to me") are built and sampled down to no
//!   fewer than `max(k, 4)` entries
//! - For every node, all new/new and new/old pairs of its (forward + reverse)
//!   neighbors are compared and proposed to each other; a node also considers
//!   the nodes that point to it
//! - Proposals are computed against the round's snapshot and applied
//!   afterwards, each list owned by exactly one task
//! - The run stops when the fraction of updated slots drops below `delta`,
//!   when a round changes nothing, or after `max_iterations` rounds
//!
//! Lists only ever accept candidates ranking above their worst entry, so the
//! minimum kept score of every node is non-decreasing across rounds.
//!
//! A bucket whose all-pairs cost does not exceed one round's join cost is
//! solved exactly by [`BruteForce`] instead; see
//! [`NNDescentParams::solves_exactly`].

use crate::constants::nndescent::{
    DEFAULT_DELTA, DEFAULT_MAX_ITERATIONS, DEFAULT_RHO, MIN_JOIN_WIDTH,
};
use crate::constants::parallel::PARALLEL_BUCKET_THRESHOLD;
use crate::error::{KnnGraphError, Result};
use crate::graph::{derive_seed, BruteForce, GraphBuilder, LocalGraph, Neighbor, NeighborList};
use crate::similarity::Similarity;
use crate::vector::Node;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use smallvec::SmallVec;
use std::cmp::Ordering;
use tracing::debug;

/// Local node index inside one bucket.
type LocalId = u32;

/// Small inline list of local ids; most neighbor samples fit inline.
type IdList = SmallVec<[LocalId; 16]>;

/// NNDescent parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NNDescentParams {
    /// Neighbors kept per node.
    pub k: usize,
    /// Sample rate in (0, 1]. At 1.0 nothing is sampled away.
    pub rho: f64,
    /// Stop when fewer than `delta * n * k` slots change in a round.
    pub delta: f64,
    /// Hard cap on refinement rounds.
    pub max_iterations: usize,
}

impl Default for NNDescentParams {
    fn default() -> Self {
        Self {
            k: crate::constants::graph::DEFAULT_K,
            rho: DEFAULT_RHO,
            delta: DEFAULT_DELTA,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl NNDescentParams {
    /// Check every parameter against its domain.
    pub fn validate(&self) -> Result<()> {
        if self.k < 1 {
            return Err(KnnGraphError::invalid_config("k must be at least 1"));
        }
        if !(self.rho > 0.0 && self.rho <= 1.0) {
            return Err(KnnGraphError::invalid_config(format!(
                "rho must be in (0, 1], got {}",
                self.rho
            )));
        }
        if !(0.0..=1.0).contains(&self.delta) {
            return Err(KnnGraphError::invalid_config(format!(
                "delta must be in [0, 1], got {}",
                self.delta
            )));
        }
        Ok(())
    }

    /// Number of entries sampled from a new or reverse list, or `None` when
    /// the whole list is used.
    fn sample_size(&self) -> Option<usize> {
        if self.rho >= 1.0 {
            None
        } else {
            Some(((self.rho * self.k as f64).ceil() as usize).max(1))
        }
    }

    /// Sample size for reverse lists: never below `k` nor half the minimum
    /// join width, so a node pointed at by a few others joins all of them
    /// even when `k` is tiny.
    fn reverse_sample_size(&self) -> Option<usize> {
        self.sample_size()
            .map(|size| size.max(self.k).max(MIN_JOIN_WIDTH / 2))
    }

    /// Return true when an all-pairs pass over `n` nodes costs no more than
    /// one local-join round. Such buckets are solved exactly.
    pub fn solves_exactly(&self, n: usize) -> bool {
        let width = (2 * self.sample_size().unwrap_or(self.k)).max(MIN_JOIN_WIDTH);
        n.saturating_sub(1) <= width * (width - 1)
    }
}

/// Neighbor slot used during refinement.
#[derive(Clone, Copy, Debug)]
struct Candidate {
    idx: LocalId,
    score: f64,
    is_new: bool,
}

/// Rank order inside a bucket: higher score first, then lower local index.
#[inline]
fn rank(a_score: f64, a_idx: LocalId, b_score: f64, b_idx: LocalId) -> Ordering {
    b_score.total_cmp(&a_score).then(a_idx.cmp(&b_idx))
}

/// Working neighbor list of one node, with new/old flags.
#[derive(Clone, Debug)]
struct LocalList {
    k: usize,
    items: SmallVec<[Candidate; 16]>,
}

impl LocalList {
    fn new(k: usize) -> Self {
        Self {
            k,
            items: SmallVec::new(),
        }
    }

    fn contains(&self, idx: LocalId) -> bool {
        self.items.iter().any(|c| c.idx == idx)
    }

    /// Insert under the capacity rule; new entries are flagged new.
    fn insert(&mut self, idx: LocalId, score: f64) -> bool {
        if self.contains(idx) {
            return false;
        }
        if self.items.len() >= self.k {
            match self.items.last() {
                Some(worst) if rank(score, idx, worst.score, worst.idx) == Ordering::Less => {}
                _ => return false,
            }
        }
        let pos = self
            .items
            .partition_point(|c| rank(c.score, c.idx, score, idx) == Ordering::Less);
        self.items.insert(
            pos,
            Candidate {
                idx,
                score,
                is_new: true,
            },
        );
        self.items.truncate(self.k);
        true
    }

    fn min_score(&self) -> Option<f64> {
        self.items.last().map(|c| c.score)
    }
}

/// Per-node view of one round, computed from the snapshot.
struct RoundSample {
    /// Sampled new forward neighbors (flagged old afterwards).
    new: IdList,
    /// All old forward neighbors.
    old: IdList,
}

/// NNDescent graph builder.
#[derive(Debug, Clone)]
pub struct NNDescent {
    params: NNDescentParams,
}

impl NNDescent {
    /// Create a builder after validating `params`.
    pub fn new(params: NNDescentParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// The builder's parameters.
    pub fn params(&self) -> &NNDescentParams {
        &self.params
    }

    /// Run refinement and also return the minimum kept score of every node
    /// after initialization and after each round. The trace is empty for
    /// buckets that are solved exactly.
    pub fn build_traced(
        &self,
        nodes: &[Node],
        similarity: &Similarity,
        seed: u64,
    ) -> (LocalGraph, Vec<Vec<Option<f64>>>) {
        let mut trace: Vec<Vec<Option<f64>>> = Vec::new();
        let graph = self.run(nodes, similarity, seed, |lists| {
            trace.push(lists.iter().map(LocalList::min_score).collect());
        });
        (graph, trace)
    }

    fn run<F>(&self, nodes: &[Node], similarity: &Similarity, seed: u64, mut observe: F) -> LocalGraph
    where
        F: FnMut(&[LocalList]),
    {
        let n = nodes.len();
        let k = self.params.k;

        if n <= 1 {
            return LocalGraph {
                lists: nodes.iter().map(|node| (node.id, NeighborList::new(k))).collect(),
                iterations: 0,
                similarity_evaluations: 0,
            };
        }

        if self.params.solves_exactly(n) {
            debug!(nodes = n, k, "bucket solved exactly");
            return BruteForce::new(k).build(nodes, similarity, seed);
        }

        let sim = |a: LocalId, b: LocalId| {
            similarity.compute(&nodes[a as usize].vector, &nodes[b as usize].vector)
        };

        let (mut lists, mut evaluations) = self.initialize(n, &sim, seed);
        observe(lists.as_slice());

        let mut iterations = 0;
        let total_slots = (n * k) as f64;

        for round in 0..self.params.max_iterations {
            let round_key = round as u64 + 1;

            // 1. Split each list into sampled-new and old entries.
            let samples: Vec<RoundSample> = lists
                .par_iter()
                .with_min_len(PARALLEL_BUCKET_THRESHOLD)
                .enumerate()
                .map(|(i, list)| self.sample_forward(list, seed, round_key, i))
                .collect();

            // 2. Reverse lists, built in node order.
            let mut new_rev: Vec<IdList> = vec![IdList::new(); n];
            let mut old_rev: Vec<IdList> = vec![IdList::new(); n];
            for (i, sample) in samples.iter().enumerate() {
                for &j in &sample.new {
                    new_rev[j as usize].push(i as LocalId);
                }
                for &j in &sample.old {
                    old_rev[j as usize].push(i as LocalId);
                }
            }

            // 3. Sampled entries have now been scheduled for a join.
            lists
                .par_iter_mut()
                .with_min_len(PARALLEL_BUCKET_THRESHOLD)
                .zip(samples.par_iter())
                .for_each(|(list, sample)| {
                    for c in list.items.iter_mut() {
                        if sample.new.contains(&c.idx) {
                            c.is_new = false;
                        }
                    }
                });

            // 4. Local join against the snapshot.
            let snapshot = &lists;
            let proposals: Vec<(Vec<(LocalId, LocalId, f64)>, u64)> = (0..n)
                .into_par_iter()
                .with_min_len(PARALLEL_BUCKET_THRESHOLD)
                .map(|v| {
                    self.local_join(
                        v,
                        snapshot,
                        &samples[v],
                        &new_rev[v],
                        &old_rev[v],
                        &sim,
                        seed,
                        round_key,
                    )
                })
                .collect();

            // 5. Route proposals to their targets in deterministic order.
            let mut incoming: Vec<Vec<(LocalId, f64)>> = vec![Vec::new(); n];
            for (batch, evals) in proposals {
                evaluations += evals;
                for (target, candidate, score) in batch {
                    incoming[target as usize].push((candidate, score));
                }
            }

            // 6. Apply; each list is updated by one task only.
            let updates: usize = lists
                .par_iter_mut()
                .with_min_len(PARALLEL_BUCKET_THRESHOLD)
                .zip(incoming.par_iter())
                .map(|(list, inbox)| {
                    inbox
                        .iter()
                        .filter(|&&(candidate, score)| list.insert(candidate, score))
                        .count()
                })
                .sum();

            iterations += 1;
            observe(lists.as_slice());

            let fraction = updates as f64 / total_slots;
            debug!(
                round = iterations,
                nodes = n,
                updates,
                fraction,
                "nndescent round"
            );

            if updates == 0 || fraction < self.params.delta {
                break;
            }
        }

        let lists = lists
            .into_iter()
            .zip(nodes.iter())
            .map(|(list, node)| {
                let mut out = NeighborList::new(k);
                for c in &list.items {
                    out.add(Neighbor::new(nodes[c.idx as usize].id, c.score));
                }
                (node.id, out)
            })
            .collect();

        LocalGraph {
            lists,
            iterations,
            similarity_evaluations: evaluations,
        }
    }

    /// Seed every list with up to `k` distinct random other nodes.
    fn initialize<S>(&self, n: usize, sim: &S, seed: u64) -> (Vec<LocalList>, u64)
    where
        S: Fn(LocalId, LocalId) -> f64 + Sync,
    {
        let k = self.params.k;
        let per_node = k.min(n - 1);

        let lists = (0..n)
            .into_par_iter()
            .with_min_len(PARALLEL_BUCKET_THRESHOLD)
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(derive_seed(seed, &[0, i as u64]));
                let mut list = LocalList::new(k);
                for j in rand::seq::index::sample(&mut rng, n - 1, per_node).into_iter() {
                    let j = if j >= i { j + 1 } else { j };
                    list.insert(j as LocalId, sim(i as LocalId, j as LocalId));
                }
                list
            })
            .collect();

        (lists, (n * per_node) as u64)
    }

    fn sample_forward(&self, list: &LocalList, seed: u64, round: u64, node: usize) -> RoundSample {
        let mut new: IdList = list.items.iter().filter(|c| c.is_new).map(|c| c.idx).collect();
        let old: IdList = list.items.iter().filter(|c| !c.is_new).map(|c| c.idx).collect();

        if let Some(size) = self.params.sample_size() {
            if new.len() > size {
                let mut rng = StdRng::seed_from_u64(derive_seed(seed, &[round, 1, node as u64]));
                new = new.choose_multiple(&mut rng, size).copied().collect();
            }
        }

        RoundSample { new, old }
    }

    #[allow(clippy::too_many_arguments)]
    fn local_join<S>(
        &self,
        v: usize,
        snapshot: &[LocalList],
        sample: &RoundSample,
        new_rev: &[LocalId],
        old_rev: &[LocalId],
        sim: &S,
        seed: u64,
        round: u64,
    ) -> (Vec<(LocalId, LocalId, f64)>, u64)
    where
        S: Fn(LocalId, LocalId) -> f64 + Sync,
    {
        let mut rng = StdRng::seed_from_u64(derive_seed(seed, &[round, 2, v as u64]));
        let limit = self.params.reverse_sample_size();
        let mut pick = |ids: &[LocalId]| -> IdList {
            match limit {
                Some(size) if ids.len() > size => ids.choose_multiple(&mut rng, size).copied().collect(),
                _ => ids.iter().copied().collect(),
            }
        };
        let rev_new = pick(new_rev);
        let rev_old = pick(old_rev);

        let mut new_set: IdList = sample.new.iter().chain(rev_new.iter()).copied().collect();
        new_set.sort_unstable();
        new_set.dedup();

        let mut old_set: IdList = sample.old.iter().chain(rev_old.iter()).copied().collect();
        old_set.sort_unstable();
        old_set.dedup();
        old_set.retain(|id| new_set.binary_search(id).is_err());

        let mut out = Vec::new();
        let mut evaluations = 0u64;
        let mut propose = |a: LocalId, b: LocalId| {
            if a == b
                || (snapshot[a as usize].contains(b) && snapshot[b as usize].contains(a))
            {
                return;
            }
            let score = sim(a, b);
            evaluations += 1;
            out.push((a, b, score));
            out.push((b, a, score));
        };

        for (x, &a) in new_set.iter().enumerate() {
            for &b in &new_set[x + 1..] {
                propose(a, b);
            }
            for &b in &old_set {
                propose(a, b);
            }
        }

        // Nodes pointing at v are candidates for v itself.
        let me = v as LocalId;
        for &u in &rev_new {
            propose(me, u);
        }

        (out, evaluations)
    }
}

impl GraphBuilder for NNDescent {
    fn k(&self) -> usize {
        self.params.k
    }

    fn build(&self, nodes: &[Node], similarity: &Similarity, seed: u64) -> LocalGraph {
        self.run(nodes, similarity, seed, |_| {})
    }
}
