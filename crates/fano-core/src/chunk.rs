//! Canon chunks and the NDJSON manifest they are loaded from.
//!
//! A manifest line looks like:
//!   {"matrix":[0,1,2,3,0,1,2],"angle":120.0,"path":"..."}
//! Unknown fields are ignored; a missing matrix or angle defaults to zero.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::state::{derive_seed, normalize_angle, FanoState, Matrix};

/// Spacing between the synthetic creation timestamps of consecutive chunks.
pub const CHUNK_SPACING_MS: u64 = 100;

/// One immutable step of the canon.
///
/// Fields are private: the seed is computed at construction and can never
/// drift from the matrix and angle it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Chunk {
    matrix: Matrix,
    angle: f32,
    seed: u32,
    timestamp: u64,
}

impl Chunk {
    pub fn new(matrix: Matrix, angle: f32, timestamp: u64) -> Self {
        let angle = normalize_angle(angle);
        Self {
            matrix,
            angle,
            seed: derive_seed(&matrix, angle),
            timestamp,
        }
    }

    pub fn matrix(&self) -> Matrix {
        self.matrix
    }

    /// Degrees, in [0, 360).
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Milliseconds since the Unix epoch.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The peer-facing state for this chunk.
    pub fn fano_state(&self) -> FanoState {
        FanoState::from_matrix_angle(self.matrix, self.angle)
    }
}

// ── Manifest ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ManifestLine {
    #[serde(default)]
    matrix: Vec<u8>,
    #[serde(default)]
    angle: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
    #[error("line {line}: matrix has {len} elements, expected at most 7")]
    MatrixTooLong { line: usize, len: usize },
    #[error("line {line}: matrix element {value} out of range 0..=3")]
    QuadrantOutOfRange { line: usize, value: u8 },
    #[error("line {line}: angle is not a finite number")]
    BadAngle { line: usize },
}

/// Parse manifest text. `loaded_at_ms` seeds the chunk timestamps.
pub fn parse_manifest(text: &str, loaded_at_ms: u64) -> Result<Vec<Chunk>, ManifestError> {
    let mut chunks = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let entry: ManifestLine =
            serde_json::from_str(raw).map_err(|source| ManifestError::Parse { line, source })?;

        if entry.matrix.len() > 7 {
            return Err(ManifestError::MatrixTooLong {
                line,
                len: entry.matrix.len(),
            });
        }
        let mut matrix = [0u8; 7];
        for (slot, &value) in matrix.iter_mut().zip(&entry.matrix) {
            if value > 3 {
                return Err(ManifestError::QuadrantOutOfRange { line, value });
            }
            *slot = value;
        }
        if !entry.angle.is_finite() {
            return Err(ManifestError::BadAngle { line });
        }

        let timestamp = loaded_at_ms + chunks.len() as u64 * CHUNK_SPACING_MS;
        chunks.push(Chunk::new(matrix, entry.angle, timestamp));
    }

    Ok(chunks)
}

/// Read and parse a manifest file, timestamping chunks from now.
pub fn load_manifest(path: &Path) -> Result<Vec<Chunk>, ManifestError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ManifestError::ReadFailed(path.to_path_buf(), e))?;
    let chunks = parse_manifest(&text, now_ms())?;
    tracing::info!(path = %path.display(), count = chunks.len(), "canon manifest loaded");
    Ok(chunks)
}

/// Wall-clock milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
