//! Core newtypes used across the graph pipeline.
//!
//! These keep node ids, stage numbers and bucket ids from being mixed up
//! with the plain local indices used inside a bucket.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a graph node, assigned at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Create a new NodeId.
    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl From<u64> for NodeId {
    #[inline]
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<NodeId> for u64 {
    #[inline]
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// Identifies one bucket: the LSH stage it belongs to and its bucket id
/// within that stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    /// Stage index in `[0, stages)`.
    pub stage: usize,
    /// Bucket id in `[0, buckets)`.
    pub bucket: u32,
}

impl BucketKey {
    /// Create a new BucketKey.
    #[inline]
    pub const fn new(stage: usize, bucket: u32) -> Self {
        Self { stage, bucket }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} / bucket {}", self.stage, self.bucket)
    }
}
