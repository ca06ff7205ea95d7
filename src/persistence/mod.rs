//! Persistence layer for saving and loading k-NN graphs.
//!
//! # File Format
//!
//! ```text
//! [MAGIC 8B "KNNGRAPH"][VERSION u32][K u32][NODES u64][EDGES u64][CHECKSUM u32]
//! [PAYLOAD bincode: rows of (node id, [(neighbor id, score)])]
//! ```
//!
//! The checksum covers the payload only. `k` and the node and edge counts
//! live in the header and must agree with the decoded rows.
//!
//! # Example
//!
//! ```ignore
//! use lsh_knn_graph::persistence::Persistable;
//!
//! graph.save("graph.knn")?;
//! let loaded = Graph::load("graph.knn")?;
//! ```

mod format;

pub use format::{GraphHeader, Row, FORMAT_VERSION, MAGIC};

use crate::error::{KnnGraphError, Result};
use crate::graph::Graph;
use std::path::Path;

/// Trait for types that can be persisted to disk.
pub trait Persistable: Sized {
    /// Save to a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written or serialization fails.
    fn save(&self, path: impl AsRef<Path>) -> Result<()>;

    /// Load from a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is corrupted, or has an
    /// incompatible format.
    fn load(path: impl AsRef<Path>) -> Result<Self>;
}

impl Persistable for Graph {
    fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let rows: Vec<Row> = self.clone().into_rows();
        let data = bincode::serialize(&rows)?;
        let header = GraphHeader::describe(self, crc32fast::hash(&data))?;
        write_file(path, &header, &data)
    }

    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let (header, data) = split_header(&bytes)?;
        let rows: Vec<Row> = bincode::deserialize(data)?;
        header.check_rows(&rows)?;
        Ok(Graph::from_rows(header.k as usize, rows))
    }
}

/// Parse the header and verify the payload checksum.
fn split_header(bytes: &[u8]) -> Result<(GraphHeader, &[u8])> {
    if bytes.len() < GraphHeader::SIZE {
        return Err(KnnGraphError::invalid_format("file too small for header"));
    }

    let (head, payload) = bytes.split_at(GraphHeader::SIZE);
    let header = GraphHeader::from_bytes(head)?;
    if crc32fast::hash(payload) != header.checksum {
        return Err(KnnGraphError::ChecksumMismatch);
    }

    Ok((header, payload))
}

fn write_file(path: impl AsRef<Path>, header: &GraphHeader, data: &[u8]) -> Result<()> {
    use std::io::Write;

    let mut file = std::fs::File::create(path)?;
    file.write_all(&header.to_bytes())?;
    file.write_all(data)?;
    file.sync_all()?;

    Ok(())
}
