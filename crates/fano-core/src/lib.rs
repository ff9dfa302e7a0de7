//! fano-core: shared types, seed transform, wire packet codec and configuration.
//! All other Fano crates depend on this one.

pub mod chunk;
pub mod config;
pub mod error;
pub mod fano;
pub mod state;
pub mod wire;

pub use chunk::Chunk;
pub use error::CanonError;
pub use state::{FanoState, Matrix, Quadrant};
