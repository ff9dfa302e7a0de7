//! Error taxonomy shared by the engine, the hub and the control surface.
//!
//! Every variant is local to the single request that produced it. None of
//! them stops the timing loop or touches other subscribers.

use crate::wire::PacketError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CanonError {
    /// Chunk index or Fano point out of range.
    #[error("{what} {index} not found")]
    NotFound { what: &'static str, index: u64 },

    /// Packet failed magic/version/range/checksum/seed validation.
    #[error("invalid packet: {0}")]
    InvalidPacket(#[from] PacketError),

    /// A transport's subscriber table is full.
    #[error("subscriber capacity of {0} reached")]
    CapacityExceeded(usize),

    /// Rejected command argument (e.g. non-positive speed).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl CanonError {
    pub fn chunk_not_found(index: u64) -> Self {
        CanonError::NotFound {
            what: "chunk",
            index,
        }
    }

    pub fn fano_point_not_found(index: u64) -> Self {
        CanonError::NotFound {
            what: "fano point",
            index,
        }
    }
}
