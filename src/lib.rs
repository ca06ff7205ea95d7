//! lsh-knn-graph: approximate k-nearest-neighbor graphs for sparse vectors.
//!
//! The graph is built in two levels: SuperBit locality-sensitive hashing
//! splits the nodes into buckets over several independent stages, a local
//! builder (NNDescent or brute force) runs inside every bucket, and the
//! per-bucket neighbor lists are merged into one top-k list per node.
//!
//! # Features
//!
//! - **SuperBit LSH**: Orthogonalized random hyperplanes, one signature per stage
//! - **NNDescent**: Sampled local-join refinement with early termination
//! - **Pluggable Similarity**: Cosine, weighted Jaccard or any symmetric function
//! - **Parallel Build**: Hashing, bucket builds and merging run on Rayon
//! - **Deterministic**: The same seed produces the same graph on any thread count
//! - **Persistence**: Checksummed binary files for built graphs
//!
//! # Example
//!
//! ```
//! use lsh_knn_graph::{build_graph, GraphConfig, Similarity, SparseVector};
//!
//! let nodes = (0..100u64).map(|i| {
//!     let v = SparseVector::from_pairs(vec![((i % 10) as u32, 1.0), (10 + (i % 7) as u32, 0.5)]);
//!     (i, v)
//! });
//! let config = GraphConfig::new(32)
//!     .with_k(5)
//!     .with_similarity(Similarity::Cosine)
//!     .with_seed(7);
//!
//! let graph = build_graph(nodes, &config).unwrap();
//! assert_eq!(graph.len(), 100);
//! for (id, list) in graph.iter() {
//!     assert!(list.len() <= 5);
//!     assert!(!list.contains(*id));
//! }
//! ```

pub mod builder;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod error;
pub mod graph;
pub mod lsh;
pub mod merge;
pub mod metrics;
pub mod partition;
pub mod persistence;
pub mod similarity;
pub mod types;
pub mod vector;

// Re-export commonly used types at crate root
pub use builder::{build_graph, build_graph_with_stats, LshSuperBitGraphBuilder};
pub use config::{DimensionPolicy, GraphConfig, InnerBuilder};
pub use dataset::{graph_recall, recall_at_k, SparseDataset};
pub use error::{KnnGraphError, Result};
pub use graph::{
    brute_force_graph, BruteForce, Graph, GraphBuilder, LocalGraph, NNDescent, NNDescentParams,
    Neighbor, NeighborList,
};
pub use lsh::SuperBitHasher;
pub use metrics::BuildStatistics;
pub use persistence::Persistable;
pub use similarity::Similarity;
pub use types::{BucketKey, NodeId};
pub use vector::{Node, SparseVector};
