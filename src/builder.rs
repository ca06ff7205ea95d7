//! The distributed LSH SuperBit + local-builder pipeline.
//!
//! ```text
//! nodes --hash (par map)--> signatures --group by (stage, bucket)--> buckets
//!       --local builder (par map)--> per-bucket lists --merge (par reduce)--> Graph
//! ```
//!
//! Validation (config, duplicate ids, dimensions) happens before any parallel
//! work. Every random choice is derived from the configured seed and the
//! `(stage, bucket)` key, so the output does not depend on scheduling.
//!
//! # Example
//!
//! ```
//! use lsh_knn_graph::{build_graph, GraphConfig, SparseVector};
//!
//! let nodes = vec![
//!     (0u64, SparseVector::from_dense(&[1.0, 1.0, 0.0])),
//!     (1u64, SparseVector::from_dense(&[1.0, 0.0, 0.0])),
//!     (2u64, SparseVector::from_dense(&[0.0, 0.0, 1.0])),
//! ];
//! let config = GraphConfig::new(3).with_k(1).with_stages(1).with_buckets(1).with_rho(1.0);
//! let graph = build_graph(nodes, &config).unwrap();
//!
//! assert_eq!(graph.get(0u64).unwrap().as_slice()[0].id.as_u64(), 1);
//! ```

use crate::config::{DimensionPolicy, GraphConfig, InnerBuilder};
use crate::error::{KnnGraphError, Result};
use crate::graph::{derive_seed, BruteForce, Graph, GraphBuilder, LocalGraph, NNDescent};
use crate::lsh::SuperBitHasher;
use crate::merge::merge_local_graphs;
use crate::metrics::BuildStatistics;
use crate::partition::partition;
use crate::types::NodeId;
use crate::vector::{Node, SparseVector};
use rayon::prelude::*;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Graph builder combining SuperBit bucketing with a local builder per
/// bucket.
#[derive(Debug, Clone)]
pub struct LshSuperBitGraphBuilder {
    config: GraphConfig,
}

impl LshSuperBitGraphBuilder {
    /// Create a builder after validating `config`.
    pub fn new(config: GraphConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The builder's configuration.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Build the graph.
    pub fn build(&self, nodes: Vec<Node>) -> Result<Graph> {
        self.build_with_stats(nodes).map(|(graph, _)| graph)
    }

    /// Build the graph and report bucket and local-builder statistics.
    ///
    /// # Errors
    ///
    /// - `DuplicateNode` if two nodes share an id
    /// - `InvalidDimension` if a vector has an index `>= dim` and the policy
    ///   is [`DimensionPolicy::Reject`]
    pub fn build_with_stats(&self, nodes: Vec<Node>) -> Result<(Graph, BuildStatistics)> {
        let start = Instant::now();
        let config = &self.config;

        check_unique_ids(&nodes)?;
        let (nodes, num_dropped) = self.apply_dimension_policy(nodes)?;

        info!(
            nodes = nodes.len(),
            dropped = num_dropped,
            stages = config.stages,
            buckets = config.buckets,
            k = config.k,
            similarity = config.similarity.name(),
            "building k-nn graph"
        );

        let hasher = SuperBitHasher::new(
            config.stages,
            config.hyperplanes_per_stage(),
            config.buckets,
            config.dim,
            config.seed,
        )?;
        let buckets = partition(&nodes, &hasher)?;

        for stage in 0..config.stages {
            let in_stage: Vec<usize> = buckets
                .iter()
                .filter(|b| b.key.stage == stage)
                .map(|b| b.len())
                .collect();
            debug!(
                stage,
                buckets = in_stage.len(),
                largest = in_stage.iter().copied().max().unwrap_or(0),
                "stage partitioned"
            );
        }

        let inner = self.inner_builder()?;
        let similarity = &config.similarity;
        let seed = config.seed;
        let locals: Vec<LocalGraph> = buckets
            .par_iter()
            .map(|bucket| {
                let bucket_seed =
                    derive_seed(seed, &[bucket.key.stage as u64, bucket.key.bucket as u64]);
                inner.build(&bucket.nodes, similarity, bucket_seed)
            })
            .collect();

        let ids: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();
        let graph = merge_local_graphs(inner.k(), &ids, &locals);

        let mut stats = BuildStatistics {
            num_nodes: graph.len(),
            num_dropped,
            num_stages: config.stages,
            total_iterations: locals.iter().map(|l| l.iterations).sum(),
            similarity_evaluations: locals.iter().map(|l| l.similarity_evaluations).sum(),
            ..Default::default()
        };
        stats.record_buckets(&buckets);
        stats.elapsed = start.elapsed();

        info!(
            nodes = stats.num_nodes,
            buckets = stats.num_buckets,
            degenerate = stats.num_degenerate_buckets,
            evaluations = stats.similarity_evaluations,
            elapsed_ms = stats.elapsed_ms(),
            "k-nn graph built"
        );

        Ok((graph, stats))
    }

    fn inner_builder(&self) -> Result<Box<dyn GraphBuilder>> {
        Ok(match self.config.inner_builder {
            InnerBuilder::NNDescent => Box::new(NNDescent::new(self.config.nndescent_params())?),
            InnerBuilder::BruteForce => Box::new(BruteForce::new(self.config.k)),
        })
    }

    fn apply_dimension_policy(&self, nodes: Vec<Node>) -> Result<(Vec<Node>, usize)> {
        let dim = self.config.dim;
        match self.config.dimension_policy {
            DimensionPolicy::Reject => {
                if let Some(bad) = nodes.par_iter().find_first(|n| n.vector.validate(dim).is_err()) {
                    bad.vector.validate(dim)?;
                }
                Ok((nodes, 0))
            }
            DimensionPolicy::Drop => {
                let before = nodes.len();
                let kept: Vec<Node> = nodes
                    .into_par_iter()
                    .filter(|n| match n.vector.validate(dim) {
                        Ok(()) => true,
                        Err(err) => {
                            warn!(node = n.id.as_u64(), %err, "dropping vector");
                            false
                        }
                    })
                    .collect();
                let dropped = before - kept.len();
                Ok((kept, dropped))
            }
        }
    }
}

fn check_unique_ids(nodes: &[Node]) -> Result<()> {
    let mut seen = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if !seen.insert(node.id) {
            return Err(KnnGraphError::DuplicateNode(node.id.as_u64()));
        }
    }
    Ok(())
}

/// Build an approximate k-NN graph from `(id, vector)` pairs.
pub fn build_graph<I, T>(nodes: I, config: &GraphConfig) -> Result<Graph>
where
    I: IntoIterator<Item = (T, SparseVector)>,
    T: Into<NodeId>,
{
    build_graph_with_stats(nodes, config).map(|(graph, _)| graph)
}

/// Like [`build_graph`], also returning build statistics.
pub fn build_graph_with_stats<I, T>(nodes: I, config: &GraphConfig) -> Result<(Graph, BuildStatistics)>
where
    I: IntoIterator<Item = (T, SparseVector)>,
    T: Into<NodeId>,
{
    let builder = LshSuperBitGraphBuilder::new(config.clone())?;
    let nodes = nodes
        .into_iter()
        .map(|(id, vector)| Node::new(id, vector))
        .collect();
    builder.build_with_stats(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_detected_before_work() {
        let nodes = vec![(0u64, SparseVector::from_dense(&[1.0]))];
        let err = build_graph(nodes, &GraphConfig::new(1).with_k(0)).unwrap_err();
        assert!(matches!(err, KnnGraphError::InvalidConfig(_)));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let nodes = vec![
            (4u64, SparseVector::from_dense(&[1.0])),
            (4u64, SparseVector::from_dense(&[2.0])),
        ];
        let err = build_graph(nodes, &GraphConfig::new(1)).unwrap_err();
        assert!(matches!(err, KnnGraphError::DuplicateNode(4)));
    }

    #[test]
    fn test_drop_policy_removes_bad_vectors() {
        let nodes = vec![
            (0u64, SparseVector::from_pairs(vec![(0, 1.0)])),
            (1u64, SparseVector::from_pairs(vec![(1, 1.0), (0, 1.0)])),
            (2u64, SparseVector::from_pairs(vec![(5, 1.0)])),
        ];
        let config = GraphConfig::new(2)
            .with_buckets(1)
            .with_stages(1)
            .with_dimension_policy(DimensionPolicy::Drop);
        let (graph, stats) = build_graph_with_stats(nodes, &config).unwrap();

        assert_eq!(graph.len(), 2);
        assert!(graph.get(2u64).is_none());
        assert_eq!(stats.num_dropped, 1);
    }

    #[test]
    fn test_brute_force_inner_builder() {
        let nodes = vec![
            (0u64, SparseVector::from_dense(&[1.0, 1.0, 0.0])),
            (1u64, SparseVector::from_dense(&[1.0, 0.0, 0.0])),
            (2u64, SparseVector::from_dense(&[0.0, 0.0, 1.0])),
        ];
        let config = GraphConfig::new(3)
            .with_k(2)
            .with_stages(1)
            .with_buckets(1)
            .with_inner_builder(InnerBuilder::BruteForce);
        let (graph, stats) = build_graph_with_stats(nodes, &config).unwrap();

        assert_eq!(graph.get(0u64).unwrap().ids(), vec![NodeId(1), NodeId(2)]);
        assert_eq!(stats.total_iterations, 0);
        assert_eq!(stats.similarity_evaluations, 6);
    }
}
