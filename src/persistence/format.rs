//! On-disk layout of a saved graph.

use crate::error::{KnnGraphError, Result};
use crate::graph::Graph;

/// Magic bytes identifying a graph file: "KNNGRAPH"
pub const MAGIC: [u8; 8] = *b"KNNGRAPH";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// One serialized node: `(node id, [(neighbor id, score)])`.
pub type Row = (u64, Vec<(u64, f64)>);

/// Header written in front of the bincode rows.
///
/// Total size: 36 bytes
/// ```text
/// [MAGIC 8B][VERSION u32][K u32][NODES u64][EDGES u64][CHECKSUM u32]
/// ```
///
/// The shape fields are checked against the decoded rows on load, so a
/// header that disagrees with its payload is rejected even when the
/// checksum matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphHeader {
    /// Format version
    pub version: u32,
    /// Capacity of every neighbor list
    pub k: u32,
    /// Number of rows in the payload
    pub num_nodes: u64,
    /// Total neighbor entries over all rows
    pub num_edges: u64,
    /// CRC32 of the payload (everything after the header)
    pub checksum: u32,
}

impl GraphHeader {
    /// Header size in bytes.
    pub const SIZE: usize = 36;

    /// Describe `graph` for a payload with the given checksum.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` if `k` does not fit in 32 bits.
    pub fn describe(graph: &Graph, checksum: u32) -> Result<Self> {
        let k = u32::try_from(graph.k())
            .map_err(|_| KnnGraphError::invalid_format(format!("k {} too large", graph.k())))?;
        Ok(Self {
            version: FORMAT_VERSION,
            k,
            num_nodes: graph.len() as u64,
            num_edges: graph.num_edges() as u64,
            checksum,
        })
    }

    /// Serialize header to bytes.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..8].copy_from_slice(&MAGIC);
        bytes[8..12].copy_from_slice(&self.version.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.k.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.num_nodes.to_le_bytes());
        bytes[24..32].copy_from_slice(&self.num_edges.to_le_bytes());
        bytes[32..36].copy_from_slice(&self.checksum.to_le_bytes());
        bytes
    }

    /// Parse and validate a header.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` on a short buffer, wrong magic or a version
    /// newer than [`FORMAT_VERSION`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(KnnGraphError::invalid_format("header too small"));
        }
        if bytes[0..8] != MAGIC {
            return Err(KnnGraphError::invalid_format("invalid magic bytes"));
        }

        let header = Self {
            version: le_u32(&bytes[8..12]),
            k: le_u32(&bytes[12..16]),
            num_nodes: le_u64(&bytes[16..24]),
            num_edges: le_u64(&bytes[24..32]),
            checksum: le_u32(&bytes[32..36]),
        };
        if header.version > FORMAT_VERSION {
            return Err(KnnGraphError::invalid_format(format!(
                "unsupported version {} (max supported: {})",
                header.version, FORMAT_VERSION
            )));
        }
        Ok(header)
    }

    /// Check decoded rows against the shape recorded in the header.
    ///
    /// Rows must be in strictly increasing node order, hold at most `k`
    /// entries each, and add up to `num_nodes` rows and `num_edges` entries.
    pub fn check_rows(&self, rows: &[Row]) -> Result<()> {
        if rows.len() as u64 != self.num_nodes {
            return Err(KnnGraphError::invalid_format(format!(
                "header lists {} nodes, payload has {}",
                self.num_nodes,
                rows.len()
            )));
        }
        if let Some((id, row)) = rows.iter().find(|(_, row)| row.len() > self.k as usize) {
            return Err(KnnGraphError::invalid_format(format!(
                "node {} has {} neighbors, header k is {}",
                id,
                row.len(),
                self.k
            )));
        }
        if rows.windows(2).any(|w| w[0].0 >= w[1].0) {
            return Err(KnnGraphError::invalid_format("rows out of node order"));
        }
        let edges: u64 = rows.iter().map(|(_, row)| row.len() as u64).sum();
        if edges != self.num_edges {
            return Err(KnnGraphError::invalid_format(format!(
                "header lists {} edges, payload has {}",
                self.num_edges, edges
            )));
        }
        Ok(())
    }
}

fn le_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

fn le_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}
