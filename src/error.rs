//! Error types for k-NN graph construction.
//!
//! Configuration and dimension problems are detected before any parallel
//! work starts, so a failed run never produces a partial graph.

use std::io;
use thiserror::Error;

/// Result type alias using [`KnnGraphError`].
pub type Result<T> = std::result::Result<T, KnnGraphError>;

/// Errors that can occur while building, saving or loading a graph.
#[derive(Error, Debug)]
pub enum KnnGraphError {
    /// A configuration parameter is outside its documented domain.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A vector references a feature index outside `[0, dim)`.
    #[error("invalid dimension: index {index} is out of range for dim {dim}")]
    InvalidDimension {
        /// Offending feature index.
        index: usize,
        /// Declared dataset dimensionality.
        dim: usize,
    },

    /// Two input nodes share the same id.
    #[error("duplicate node id: {0}")]
    DuplicateNode(u64),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during serialization or deserialization.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Checksum verification failed during file loading.
    #[error("checksum mismatch: file may be corrupted")]
    ChecksumMismatch,

    /// Graph file has an invalid or unrecognized format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),
}

impl KnnGraphError {
    /// Creates a new `InvalidConfig` error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Creates a new `InvalidDimension` error.
    pub fn invalid_dimension(index: usize, dim: usize) -> Self {
        Self::InvalidDimension { index, dim }
    }

    /// Creates a new `SerializationError`.
    pub fn serialization_error(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Creates a new `InvalidFormat` error.
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }
}

impl From<bincode::Error> for KnnGraphError {
    fn from(err: bincode::Error) -> Self {
        Self::serialization_error(err.to_string())
    }
}
